use scraper::Html;
use serde_json::Value;

use crate::normalize::parse_selector;

fn push_author(value: &Value, authors: &mut Vec<String>) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| push_author(item, authors)),
        Value::Object(obj) => {
            if let Some(name) = obj.get("name") {
                push_author(name, authors);
            }
        }
        Value::String(name) => {
            let name = name.trim();
            if !name.is_empty() && !authors.iter().any(|a| a == name) {
                authors.push(name.to_string());
            }
        }
        _ => {}
    }
}

fn collect(value: &Value, authors: &mut Vec<String>) {
    match value {
        Value::Array(items) => items.iter().for_each(|item| collect(item, authors)),
        Value::Object(obj) => {
            if let Some(author) = obj.get("author") {
                push_author(author, authors);
            }
            if let Some(graph) = obj.get("@graph") {
                collect(graph, authors);
            }
        }
        _ => {}
    }
}

/// Author names from the page's JSON-LD blocks, first-seen order.
/// Malformed blocks are skipped.
pub fn extract_authors(document: &Html) -> Vec<String> {
    let mut authors = Vec::new();
    let Ok(selector) = parse_selector("script[type='application/ld+json']") else {
        return authors;
    };

    for script in document.select(&selector) {
        let raw = script.text().collect::<String>();
        if let Ok(json) = serde_json::from_str::<Value>(raw.trim()) {
            collect(&json, &mut authors);
        }
    }

    authors
}
