use nb_core::{Error, Result};
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Owns a parsed copy of a page and renders it in the compact form sent to
/// the model. Parsing is best effort; missing elements yield empty strings.
#[derive(Debug)]
pub struct HtmlNormalizer {
    document: Html,
}

impl HtmlNormalizer {
    pub fn new(html: &str) -> Self {
        Self {
            document: Html::parse_document(html),
        }
    }

    pub fn document(&self) -> &Html {
        &self.document
    }

    /// The whole document with every attribute and comment removed.
    pub fn stripped_html(&self) -> String {
        let mut out = String::new();
        write_element(self.document.root_element(), &mut out);
        out
    }

    /// Attribute-free inner HTML of the first element matching `selector`.
    pub fn container_html(&self, selector: &str) -> Result<String> {
        let selector = parse_selector(selector)?;
        let mut out = String::new();
        if let Some(element) = self.document.select(&selector).next() {
            write_children(element, &mut out);
        }
        Ok(out)
    }

    /// Text content of the first element matching `selector`.
    pub fn container_text(&self, selector: &str) -> Result<String> {
        let selector = parse_selector(selector)?;
        Ok(self
            .document
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>())
            .unwrap_or_default())
    }

    /// Detach every element matching `selector` from the parsed tree.
    pub fn remove(&mut self, selector: &str) -> Result<usize> {
        let selector = parse_selector(selector)?;
        let ids: Vec<_> = self.document.select(&selector).map(|el| el.id()).collect();
        for id in &ids {
            if let Some(mut node) = self.document.tree.get_mut(*id) {
                node.detach();
            }
        }
        Ok(ids.len())
    }
}

pub(crate) fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| Error::Parsing(format!("Invalid selector {}: {:?}", selector, e)))
}

fn write_element(element: ElementRef<'_>, out: &mut String) {
    let name = element.value().name();
    out.push('<');
    out.push_str(name);
    out.push('>');

    if VOID_ELEMENTS.contains(&name) {
        return;
    }

    write_children(element, out);

    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

fn write_children(element: ElementRef<'_>, out: &mut String) {
    let raw = RAW_TEXT_ELEMENTS.contains(&element.value().name());
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                if raw {
                    out.push_str(text);
                } else {
                    escape_text(text, out);
                }
            }
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    write_element(child, out);
                }
            }
            _ => {}
        }
    }
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_attributes() {
        let html = r#"<html><head><title>T</title></head><body><div class="a" id="b" data-x="1"><p style="c">Hi &amp; bye</p><img src="x.png" alt="y"></div></body></html>"#;
        let normalized = HtmlNormalizer::new(html).stripped_html();
        assert_eq!(
            normalized,
            "<html><head><title>T</title></head><body><div><p>Hi &amp; bye</p><img></div></body></html>"
        );
    }

    #[test]
    fn test_drops_comments_keeps_scripts_raw() {
        let html = "<body><!-- note --><script>if (a < b) {}</script><p>x</p></body>";
        let normalized = HtmlNormalizer::new(html).stripped_html();
        assert!(!normalized.contains("note"));
        assert!(normalized.contains("<script>if (a < b) {}</script>"));
    }

    #[test]
    fn test_tolerates_malformed_html() {
        let normalized = HtmlNormalizer::new("<div><p>unclosed <b>bold</div>").stripped_html();
        assert!(normalized.contains("unclosed"));
        assert!(normalized.contains("<b>bold</b>"));
    }

    #[test]
    fn test_container_extraction() {
        let html = r#"<body><article class="main"><p class="lead">Body text</p></article></body>"#;
        let normalizer = HtmlNormalizer::new(html);
        assert_eq!(normalizer.container_html("article").unwrap(), "<p>Body text</p>");
        assert_eq!(normalizer.container_text(".main").unwrap(), "Body text");
        assert_eq!(normalizer.container_html(".missing").unwrap(), "");
        assert_eq!(normalizer.container_text(".missing").unwrap(), "");
    }

    #[test]
    fn test_remove_elements() {
        let html = r#"<body><div class="keep">a<span class="ad">AD</span>b</div></body>"#;
        let mut normalizer = HtmlNormalizer::new(html);
        assert_eq!(normalizer.remove(".ad").unwrap(), 1);
        assert_eq!(normalizer.container_text(".keep").unwrap(), "ab");
    }

    #[test]
    fn test_invalid_selector_is_an_error() {
        let normalizer = HtmlNormalizer::new("<p>x</p>");
        assert!(normalizer.container_text("[[").is_err());
    }
}
