use nb_core::{Error, LanguageModel, Result, StructuredRequest};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::schema::StructuredOutput;

/// Outcome of checking a model response against the expected shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Validation<T> {
    Valid(T),
    Invalid(String),
}

impl<T: DeserializeOwned> Validation<T> {
    pub fn from_value(value: Value) -> Self {
        match serde_json::from_value(value) {
            Ok(parsed) => Validation::Valid(parsed),
            Err(e) => Validation::Invalid(e.to_string()),
        }
    }

    /// Validate JSON embedded in free text (fenced or bare).
    pub fn from_text(text: &str) -> Self {
        let Some(json) = extract_json_from_text(text) else {
            return Validation::Invalid("no JSON object found in response".to_string());
        };
        match serde_json::from_str::<Value>(&json) {
            Ok(value) => Self::from_value(value),
            Err(e) => Validation::Invalid(format!("malformed JSON: {}", e)),
        }
    }
}

impl<T> Validation<T> {
    pub fn into_result(self, context: &str) -> Result<T> {
        match self {
            Validation::Valid(value) => Ok(value),
            Validation::Invalid(reason) => Err(Error::Inference(format!(
                "{} response did not match schema: {}",
                context, reason
            ))),
        }
    }
}

/// Issue one schema-constrained call and return the typed result.
pub async fn invoke<T: StructuredOutput>(
    model: &dyn LanguageModel,
    prompt: impl Into<String>,
    property_name: &str,
) -> Result<T> {
    let request = StructuredRequest {
        prompt: prompt.into(),
        schema: T::openai_schema(),
        property_name: property_name.to_string(),
    };

    debug!(model = model.name(), property = property_name, "Structured model call");
    let value = model.complete_structured(request).await?;
    Validation::from_value(value).into_result(property_name)
}

/// Issue one free-text call and extract a typed JSON object from the reply.
pub async fn invoke_text<T: DeserializeOwned>(
    model: &dyn LanguageModel,
    prompt: &str,
    context: &str,
) -> Result<T> {
    debug!(model = model.name(), context, "Text model call");
    let text = model.complete_text(prompt).await?;
    Validation::from_text(&text).into_result(context)
}

/// Pull a JSON object out of text that may carry markdown fences or preamble.
pub fn extract_json_from_text(text: &str) -> Option<String> {
    if let Some(start) = text.find("```json") {
        let rest = &text[start + 7..];
        if let Some(end) = rest.find("```") {
            return Some(rest[..end].trim().to_string());
        }
    }

    if let Some(start) = text.find("```") {
        let rest = &text[start + 3..];
        if let Some(end) = rest.find("```") {
            return Some(rest[..end].trim().to_string());
        }
    }

    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => Some(text[start..=end].to_string()),
        _ => None,
    }
}
