use std::fmt;

use async_trait::async_trait;

use crate::Result;

/// A single schema-constrained completion.
#[derive(Debug, Clone)]
pub struct StructuredRequest {
    pub prompt: String,
    pub schema: serde_json::Value,
    pub property_name: String,
}

#[async_trait]
pub trait LanguageModel: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Run a deterministic completion whose output must match `request.schema`.
    async fn complete_structured(&self, request: StructuredRequest) -> Result<serde_json::Value>;

    /// Run a deterministic completion and return the raw message text.
    async fn complete_text(&self, prompt: &str) -> Result<String>;
}
