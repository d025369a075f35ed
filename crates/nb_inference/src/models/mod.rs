use std::sync::Arc;

use nb_core::{Error, LanguageModel, Result};

use crate::Config;

pub mod dummy;
pub mod openai;

pub use dummy::DummyModel;
pub use openai::OpenAiModel;

pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";

/// Build the model named in `config.model`.
pub fn create_model(config: &Config) -> Result<Arc<dyn LanguageModel>> {
    match config.model.as_str() {
        "openai" => {
            let mut model = OpenAiModel::new(config.api_key.clone())?;
            if let Some(name) = &config.model_name {
                model = model.with_model_name(name);
            }
            if let Some(url) = &config.base_url {
                model = model.with_base_url(url);
            }
            Ok(Arc::new(model))
        }
        "dummy" => Ok(Arc::new(DummyModel::new())),
        other => Err(Error::Inference(format!(
            "Unknown model: {}. Available models: openai, dummy",
            other
        ))),
    }
}
