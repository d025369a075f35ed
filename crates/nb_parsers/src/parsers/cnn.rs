use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use lazy_static::lazy_static;
use nb_core::utils::get_hostname;
use nb_core::{ArticleData, Error, Result};
use regex::Regex;
use tracing::{debug, warn};

use super::{jsonld, ArticleParser};
use crate::normalize::{parse_selector, HtmlNormalizer};
use crate::text::clean_article_text;

const CONTENT_CONTAINER: &str = ".article__content-container";

/// Ads and source tags that would otherwise leak into the body text.
const BOILERPLATE: &[&str] = &[
    ".ad-feedback__moda",
    ".ad-slot-header__wrapper",
    ".ad-feedback-link",
    ".ad-slot__feedback",
    ".ad-feedback-link-container",
    ".source__location",
    ".source__text",
];

lazy_static! {
    // "Updated 8:59 PM EDT, Mon July 1, 2024"
    static ref TIMESTAMP: Regex = Regex::new(
        r"(?i)(\d{1,2}:\d{2}\s*[AP]M)\s+([A-Z]{2,4}),\s*[A-Za-z]+\s+([A-Za-z]+)\s+(\d{1,2}),\s*(\d{4})"
    )
    .unwrap();
}

/// US zone abbreviations CNN prints, as hours east of UTC.
fn zone_offset(abbreviation: &str) -> Option<FixedOffset> {
    let hours = match abbreviation.to_ascii_uppercase().as_str() {
        "UTC" | "GMT" => 0,
        "EDT" => -4,
        "EST" | "ET" | "CDT" => -5,
        "CST" | "MDT" => -6,
        "MST" | "PDT" => -7,
        "PST" => -8,
        _ => return None,
    };
    FixedOffset::east_opt(hours * 3600)
}

/// Parse a CNN byline timestamp. Unknown zones are read as US Eastern.
pub fn parse_cnn_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let caps = TIMESTAMP.captures(value)?;

    let time = caps[1].to_ascii_uppercase().replace(' ', "");
    let time = NaiveTime::parse_from_str(&time, "%I:%M%p").ok()?;
    let date_str = format!("{} {} {}", &caps[3], &caps[4], &caps[5]);
    let date = NaiveDate::parse_from_str(&date_str, "%B %d %Y").ok()?;

    let offset = zone_offset(&caps[2]).or_else(|| {
        debug!(zone = &caps[2], "Unknown zone, assuming US Eastern");
        FixedOffset::west_opt(5 * 3600)
    })?;

    offset
        .from_local_datetime(&NaiveDateTime::new(date, time))
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Selector-driven parser for www.cnn.com.
#[derive(Debug, Clone, Default)]
pub struct CnnParser;

impl CnnParser {
    pub fn new() -> Self {
        Self
    }

    fn title(normalizer: &HtmlNormalizer) -> Result<String> {
        let title = normalizer.container_text("title")?;
        Ok(title.split('|').next().unwrap_or_default().trim().to_string())
    }

    fn authors(normalizer: &HtmlNormalizer) -> Result<Vec<String>> {
        let document = normalizer.document();
        let mut authors: Vec<String> = Vec::new();
        let mut push = |name: String| {
            if !name.is_empty() && !authors.contains(&name) {
                authors.push(name);
            }
        };

        let names = parse_selector(".byline__name")?;
        let mut individual = document.select(&names).peekable();
        if individual.peek().is_some() {
            for el in individual {
                push(el.text().collect::<String>().trim().to_string());
            }
        } else {
            // Group bylines such as "By CNN Staff".
            let grouped = parse_selector(".byline__names")?;
            for el in document.select(&grouped) {
                let text = el.text().collect::<String>();
                push(text.trim().replacen("By ", "", 1).trim().to_string());
            }
        }

        if authors.is_empty() {
            authors = jsonld::extract_authors(document);
        }
        Ok(authors)
    }

    fn date_published(normalizer: &HtmlNormalizer) -> Result<DateTime<Utc>> {
        let raw = normalizer.container_text(".headline__byline-sub-text .timestamp")?;
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(Utc::now());
        }
        Ok(parse_cnn_timestamp(raw).unwrap_or_else(|| {
            warn!(timestamp = raw, "Could not parse CNN timestamp");
            Utc::now()
        }))
    }
}

#[async_trait]
impl ArticleParser for CnnParser {
    fn name(&self) -> &str {
        "cnn"
    }

    fn hostnames(&self) -> &[&str] {
        &["www.cnn.com", "cnn.com", "edition.cnn.com"]
    }

    async fn parse(&self, url: &str, html: &str) -> Result<ArticleData> {
        let hostname = get_hostname(url)?;
        let mut normalizer = HtmlNormalizer::new(html);

        let title = Self::title(&normalizer)?;
        let authors = Self::authors(&normalizer)?;
        let date_published = Self::date_published(&normalizer)?;

        for selector in BOILERPLATE {
            normalizer.remove(selector)?;
        }
        let text = clean_article_text(&normalizer.container_text(CONTENT_CONTAINER)?);
        if text.is_empty() {
            return Err(Error::EmptyContent(url.to_string()));
        }

        Ok(ArticleData {
            title,
            authors,
            date_published,
            date_updated: None,
            hostname,
            url: url.to_string(),
            text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html>
        <head><title>Senate passes the bill | CNN Politics</title></head>
        <body>
            <div class="byline">
                <span class="byline__name">Jane Doe</span>
                <span class="byline__name">John Roe</span>
                <span class="byline__name">Jane Doe</span>
            </div>
            <div class="headline__byline-sub-text">
                <div class="timestamp">
                    Updated
                    8:59 PM EDT, Mon July 1, 2024
                </div>
            </div>
            <div class="article__content-container">
                <div class="source__location">Washington</div>
                <p>The Senate   passed the bill on Monday.</p>
                <div class="ad-slot__feedback">Ad Feedback</div>
                <p>It now heads to the House.</p>
            </div>
        </body>
        </html>
    "#;

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(
            parse_cnn_timestamp("Updated 8:59 PM EDT, Mon July 1, 2024"),
            Some(Utc.with_ymd_and_hms(2024, 7, 2, 0, 59, 0).unwrap())
        );
        assert_eq!(
            parse_cnn_timestamp("Published 10:05 AM EST, Tue Jan 2, 2024"),
            Some(Utc.with_ymd_and_hms(2024, 1, 2, 15, 5, 0).unwrap())
        );
        assert_eq!(parse_cnn_timestamp("yesterday"), None);
    }

    #[tokio::test]
    async fn test_parse_article() {
        let article = CnnParser::new()
            .parse("https://www.cnn.com/2024/07/01/politics/bill", PAGE)
            .await
            .unwrap();

        assert_eq!(article.title, "Senate passes the bill");
        assert_eq!(article.authors, vec!["Jane Doe", "John Roe"]);
        assert_eq!(
            article.date_published,
            Utc.with_ymd_and_hms(2024, 7, 2, 0, 59, 0).unwrap()
        );
        assert_eq!(article.hostname, "www.cnn.com");
        assert!(article.text.contains("The Senate passed the bill on Monday."));
        assert!(article.text.contains("It now heads to the House."));
        assert!(!article.text.contains("Washington"));
        assert!(!article.text.contains("Ad Feedback"));
    }

    #[tokio::test]
    async fn test_grouped_byline_and_missing_date() {
        let page = r#"
            <title>Storm update</title>
            <div class="byline__names">By CNN Staff</div>
            <div class="article__content-container"><p>Rain.</p></div>
        "#;
        let before = Utc::now();
        let article = CnnParser::new()
            .parse("https://www.cnn.com/weather", page)
            .await
            .unwrap();
        assert_eq!(article.authors, vec!["CNN Staff"]);
        assert!(article.date_published >= before);
    }

    #[tokio::test]
    async fn test_missing_body() {
        let err = CnnParser::new()
            .parse("https://www.cnn.com/empty", "<title>Empty</title>")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EmptyContent(_)));
    }
}
