use std::fmt;

pub mod analysis;
pub mod bias;
pub mod gateway;
pub mod models;
pub mod prompts;
pub mod schema;

/// Model selection and credentials.
#[derive(Clone)]
pub struct Config {
    pub model: String,
    pub api_key: Option<String>,
    pub model_name: Option<String>,
    pub base_url: Option<String>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model_name", &self.model_name)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: "openai".to_string(),
            api_key: None,
            model_name: None,
            base_url: None,
        }
    }
}

pub mod prelude {
    pub use super::analysis::ArticleAnalyzer;
    pub use super::bias::BiasAggregator;
    pub use super::gateway::{invoke, invoke_text, Validation};
    pub use super::models::create_model;
    pub use super::schema::StructuredOutput;
    pub use super::Config;
    pub use nb_core::{Error, LanguageModel, Result};
}

pub use gateway::{invoke, invoke_text, Validation};
pub use models::create_model;
pub use schema::StructuredOutput;
