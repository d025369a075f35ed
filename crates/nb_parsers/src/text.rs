use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref INVISIBLE: Regex = Regex::new(r"[\u{200B}-\u{200D}\u{FEFF}]").unwrap();
    static ref HTML_COMMENT: Regex = Regex::new(r"<!--[\s\S]*?-->").unwrap();
    static ref HTML_TAG: Regex = Regex::new(r"<[^>]*>").unwrap();
    static ref BLANK_LINES: Regex = Regex::new(r"\n\s*\n").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Normalises article body text: drops zero-width characters, HTML comments
/// and leftover tags, then collapses whitespace. Idempotent.
///
/// Markup is removed before whitespace is collapsed so that the gap left by a
/// removed tag is folded into a single space on the first pass.
pub fn clean_article_text(text: &str) -> String {
    let text = INVISIBLE.replace_all(text, "");
    let text = HTML_COMMENT.replace_all(&text, "");
    let text = HTML_TAG.replace_all(&text, "");
    let text = BLANK_LINES.replace_all(&text, "\n");
    let text = WHITESPACE.replace_all(&text, " ");
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(
            clean_article_text("  First line.\n\n\n  Second   line.\t\tEnd  "),
            "First line. Second line. End"
        );
    }

    #[test]
    fn test_strips_invisible_characters() {
        assert_eq!(clean_article_text("zero\u{200B}width\u{FEFF} text"), "zerowidth text");
    }

    #[test]
    fn test_strips_comments_and_tags() {
        assert_eq!(
            clean_article_text("<p>Hello <!-- a > b --><b>world</b></p>"),
            "Hello world"
        );
        assert_eq!(clean_article_text("a <br/> b"), "a b");
    }

    #[test]
    fn test_is_idempotent() {
        let inputs = [
            "",
            "   ",
            "plain text",
            "a <b> c",
            "<<b>b>",
            "x\u{200C} <!-- c -->\n\n y <i>z</i>",
            "line one\n \n\nline two <span>  </span> end",
            "unclosed <tag and > stray",
        ];
        for input in inputs {
            let once = clean_article_text(input);
            assert_eq!(clean_article_text(&once), once, "input: {:?}", input);
        }
    }
}
