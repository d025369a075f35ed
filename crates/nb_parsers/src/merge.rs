use nb_core::ParseFragment;

/// Per-chunk results folded into one record, dates still as raw strings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedFragments {
    pub title: String,
    pub authors: Vec<String>,
    pub date_published: String,
    pub date_updated: String,
    pub content: String,
}

/// Folds fragments in chunk order: first non-empty title and dates win,
/// authors are unioned in first-seen order, content is concatenated with no
/// separator.
pub fn merge_fragments<I>(fragments: I) -> MergedFragments
where
    I: IntoIterator<Item = ParseFragment>,
{
    let mut merged = MergedFragments::default();

    for fragment in fragments {
        if merged.title.is_empty() {
            merged.title = fragment.title.trim().to_string();
        }

        for author in fragment.authors {
            let author = author.trim();
            if !author.is_empty() && !merged.authors.iter().any(|a| a == author) {
                merged.authors.push(author.to_string());
            }
        }

        if merged.date_published.is_empty() {
            merged.date_published = fragment.date_published.trim().to_string();
        }

        if merged.date_updated.is_empty() {
            merged.date_updated = fragment.date_updated.trim().to_string();
        }

        merged.content.push_str(&fragment.content);
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(title: &str, authors: &[&str], published: &str, content: &str) -> ParseFragment {
        ParseFragment {
            title: title.to_string(),
            authors: authors.iter().map(|a| a.to_string()).collect(),
            date_published: published.to_string(),
            date_updated: String::new(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_title_from_first_non_empty_fragment() {
        let merged = merge_fragments(vec![
            fragment("", &[], "", "a"),
            fragment("Second", &[], "", "b"),
            fragment("Third", &[], "", "c"),
        ]);
        assert_eq!(merged.title, "Second");
    }

    #[test]
    fn test_authors_union_in_first_seen_order() {
        let merged = merge_fragments(vec![
            fragment("", &["A", "B"], "", ""),
            fragment("", &["B", "C"], "", ""),
        ]);
        assert_eq!(merged.authors, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_blank_authors_are_skipped() {
        let merged = merge_fragments(vec![fragment("", &["", "  ", " A "], "", "")]);
        assert_eq!(merged.authors, vec!["A"]);
    }

    #[test]
    fn test_first_non_empty_dates() {
        let mut second = fragment("", &[], "01/02/2024", "");
        second.date_updated = "01/03/2024".to_string();
        let mut third = fragment("", &[], "05/05/2020", "");
        third.date_updated = "05/06/2020".to_string();

        let merged = merge_fragments(vec![fragment("", &[], "", ""), second, third]);
        assert_eq!(merged.date_published, "01/02/2024");
        assert_eq!(merged.date_updated, "01/03/2024");
    }

    #[test]
    fn test_content_concatenated_without_separator() {
        let merged = merge_fragments(vec![
            fragment("", &[], "", "foo"),
            fragment("", &[], "", ""),
            fragment("", &[], "", "bar"),
        ]);
        assert_eq!(merged.content, "foobar");
    }

    #[test]
    fn test_no_fragments() {
        assert_eq!(merge_fragments(Vec::new()), MergedFragments::default());
    }
}
