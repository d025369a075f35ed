use std::fmt;

use async_trait::async_trait;
use nb_core::{Error, LanguageModel, Result, StructuredRequest};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::DEFAULT_LLM_MODEL;

const OPENAI_API_URL: &str = "https://api.openai.com/v1";

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
    json_schema: JsonSchemaFormat,
}

#[derive(Serialize)]
struct JsonSchemaFormat {
    name: String,
    strict: bool,
    schema: serde_json::Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

/// Chat-completions client for OpenAI and compatible providers. Sampling is
/// always deterministic.
pub struct OpenAiModel {
    client: Client,
    api_key: String,
    base_url: String,
    model_name: String,
}

impl OpenAiModel {
    pub fn new(api_key: Option<String>) -> Result<Self> {
        let api_key = api_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::Inference("OpenAI API key is required".to_string()))?;
        Ok(Self {
            client: Client::new(),
            api_key,
            base_url: OPENAI_API_URL.to_string(),
            model_name: DEFAULT_LLM_MODEL.to_string(),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model_name(mut self, name: impl Into<String>) -> Self {
        self.model_name = name.into();
        self
    }

    async fn chat(&self, prompt: String, response_format: Option<ResponseFormat>) -> Result<String> {
        let request = ChatRequest {
            model: self.model_name.clone(),
            messages: vec![ChatMessage {
                role: "system".to_string(),
                content: prompt,
            }],
            temperature: 0.0,
            response_format,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Inference(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Inference(format!("provider error ({}): {}", status, body)));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Inference(format!("unreadable response: {}", e)))?;

        let message = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| Error::Inference("response has no choices".to_string()))?;

        if let Some(refusal) = message.refusal {
            return Err(Error::Inference(format!("model refused: {}", refusal)));
        }

        message
            .content
            .ok_or_else(|| Error::Inference("response has no content".to_string()))
    }
}

impl fmt::Debug for OpenAiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiModel")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("model_name", &self.model_name)
            .finish()
    }
}

#[async_trait]
impl LanguageModel for OpenAiModel {
    fn name(&self) -> &str {
        &self.model_name
    }

    async fn complete_structured(&self, request: StructuredRequest) -> Result<serde_json::Value> {
        debug!(property = %request.property_name, "OpenAI structured output request");
        let format = ResponseFormat {
            format_type: "json_schema".to_string(),
            json_schema: JsonSchemaFormat {
                name: request.property_name.clone(),
                strict: true,
                schema: request.schema,
            },
        };

        let content = self.chat(request.prompt, Some(format)).await?;
        serde_json::from_str(&content).map_err(|e| {
            Error::Inference(format!(
                "{} response is not JSON: {}",
                request.property_name, e
            ))
        })
    }

    async fn complete_text(&self, prompt: &str) -> Result<String> {
        debug!("OpenAI text request");
        self.chat(prompt.to_string(), None).await
    }
}
