use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use url::Url;

use crate::{Error, Result};

pub fn get_hostname(url: &str) -> Result<String> {
    let parsed = Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{}: {}", url, e)))?;
    parsed
        .host_str()
        .map(|h| h.to_string())
        .ok_or_else(|| Error::InvalidUrl(format!("{}: missing host", url)))
}

/// Parses the date formats models and pages tend to produce. Empty or
/// unrecognised input yields `None`.
pub fn parse_date_string(input: &str) -> Option<DateTime<Utc>> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    for format in ["%Y-%m-%d", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return date.and_hms_opt(0, 0, 0).map(|naive| Utc.from_utc_datetime(&naive));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_hostname() {
        assert_eq!(
            get_hostname("https://www.cnn.com/2024/07/01/politics/story").unwrap(),
            "www.cnn.com"
        );
        assert!(get_hostname("not a url").is_err());
    }

    #[test]
    fn test_parse_rfc3339() {
        let date = parse_date_string("2024-01-01T00:00:00Z").unwrap();
        assert_eq!(date, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());

        let date = parse_date_string("2024-07-01T20:59:00-04:00").unwrap();
        assert_eq!(date, Utc.with_ymd_and_hms(2024, 7, 2, 0, 59, 0).unwrap());
    }

    #[test]
    fn test_parse_naive_forms() {
        assert_eq!(
            parse_date_string("2024-03-05T10:30:00").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 5, 10, 30, 0).unwrap()
        );
        assert_eq!(
            parse_date_string("2024-03-05").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_date_string("07/01/2024").unwrap(),
            Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_date_string("").is_none());
        assert!(parse_date_string("   ").is_none());
        assert!(parse_date_string("last Tuesday").is_none());
        assert!(parse_date_string("13/45/2024").is_none());
    }
}
