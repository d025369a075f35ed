use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use nb_core::{Error, LanguageModel, Result, StructuredRequest};
use serde_json::Value;

#[derive(Debug, Clone)]
enum Reply {
    Json(Value),
    Text(String),
    Fail(String),
}

#[derive(Debug, Clone)]
struct Rule {
    property_name: Option<String>,
    needle: Option<String>,
    reply: Reply,
}

impl Rule {
    fn matches(&self, property_name: Option<&str>, prompt: &str) -> bool {
        let property_ok = match (&self.property_name, property_name) {
            (Some(expected), Some(actual)) => expected == actual,
            (Some(_), None) => false,
            (None, _) => true,
        };
        let needle_ok = self
            .needle
            .as_deref()
            .map_or(true, |needle| prompt.contains(needle));
        property_ok && needle_ok
    }
}

/// Offline model with scripted replies.
///
/// Rules are tried in insertion order; a rule matches on property name and,
/// optionally, on a substring of the prompt. Calls with no matching rule fail.
#[derive(Debug, Default)]
pub struct DummyModel {
    rules: Vec<Rule>,
    calls: AtomicUsize,
}

impl DummyModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_structured(mut self, property_name: &str, value: Value) -> Self {
        self.rules.push(Rule {
            property_name: Some(property_name.to_string()),
            needle: None,
            reply: Reply::Json(value),
        });
        self
    }

    pub fn with_structured_for(mut self, property_name: &str, needle: &str, value: Value) -> Self {
        self.rules.push(Rule {
            property_name: Some(property_name.to_string()),
            needle: Some(needle.to_string()),
            reply: Reply::Json(value),
        });
        self
    }

    pub fn with_failure_for(mut self, property_name: &str, needle: &str) -> Self {
        self.rules.push(Rule {
            property_name: Some(property_name.to_string()),
            needle: Some(needle.to_string()),
            reply: Reply::Fail(format!("scripted failure for {}", property_name)),
        });
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.rules.push(Rule {
            property_name: None,
            needle: None,
            reply: Reply::Text(text.to_string()),
        });
        self
    }

    /// Number of completions requested so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn reply(&self, property_name: Option<&str>, prompt: &str) -> Result<&Reply> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.rules
            .iter()
            .find(|rule| rule.matches(property_name, prompt))
            .map(|rule| &rule.reply)
            .ok_or_else(|| {
                Error::Inference(format!(
                    "no scripted reply for {}",
                    property_name.unwrap_or("text completion")
                ))
            })
    }
}

#[async_trait]
impl LanguageModel for DummyModel {
    fn name(&self) -> &str {
        "dummy"
    }

    async fn complete_structured(&self, request: StructuredRequest) -> Result<Value> {
        match self.reply(Some(request.property_name.as_str()), &request.prompt)? {
            Reply::Json(value) => Ok(value.clone()),
            Reply::Text(text) => serde_json::from_str(text)
                .map_err(|e| Error::Inference(format!("scripted reply is not JSON: {}", e))),
            Reply::Fail(reason) => Err(Error::Inference(reason.clone())),
        }
    }

    async fn complete_text(&self, prompt: &str) -> Result<String> {
        match self.reply(None, prompt)? {
            Reply::Json(value) => Ok(value.to_string()),
            Reply::Text(text) => Ok(text.clone()),
            Reply::Fail(reason) => Err(Error::Inference(reason.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(property_name: &str, prompt: &str) -> StructuredRequest {
        StructuredRequest {
            prompt: prompt.to_string(),
            schema: json!({}),
            property_name: property_name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_rules_match_in_order() {
        let model = DummyModel::new()
            .with_structured_for("html_parse", "chunk-one", json!({"n": 1}))
            .with_structured("html_parse", json!({"n": 0}));

        let first = model.complete_structured(request("html_parse", "xx chunk-one xx")).await.unwrap();
        let other = model.complete_structured(request("html_parse", "something else")).await.unwrap();
        assert_eq!(first, json!({"n": 1}));
        assert_eq!(other, json!({"n": 0}));
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn test_unscripted_call_fails() {
        let model = DummyModel::new();
        assert!(model.complete_structured(request("summary", "p")).await.is_err());
        assert!(model.complete_text("p").await.is_err());
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let model = DummyModel::new().with_failure_for("html_parse", "bad");
        let result = model.complete_structured(request("html_parse", "a bad chunk")).await;
        assert!(matches!(result, Err(Error::Inference(_))));
    }

    #[tokio::test]
    async fn test_text_reply() {
        let model = DummyModel::new().with_text("{\"name\": \"CNN\"}");
        assert_eq!(model.complete_text("p").await.unwrap(), "{\"name\": \"CNN\"}");
    }
}
