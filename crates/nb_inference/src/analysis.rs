use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use nb_core::utils::parse_date_string;
use nb_core::{ArticleAnalysis, LanguageModel, PublicationMetadata, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::gateway::{invoke, invoke_text};
use crate::prompts;

/// A footnote citing the article verbatim. Strict schemas cannot express
/// maps, so footnotes travel as a list and are keyed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Footnote {
    pub marker: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SummaryResponse {
    pub summary: String,
    pub footnotes: Vec<Footnote>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PoliticalBiasResponse {
    pub bias_score: f64,
    pub analysis: String,
    pub footnotes: Vec<Footnote>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ObjectivityResponse {
    pub rhetoric_score: f64,
    pub analysis: String,
    pub footnotes: Vec<Footnote>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawPublicationMetadata {
    name: Option<String>,
    date_founded: Option<String>,
}

fn footnote_map(footnotes: Vec<Footnote>) -> BTreeMap<String, String> {
    footnotes
        .into_iter()
        .map(|note| (note.marker, note.text))
        .collect()
}

fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        50.0
    } else {
        score.clamp(0.0, 100.0)
    }
}

/// Summary plus political-bias and objectivity scoring for one article.
#[derive(Clone)]
pub struct ArticleAnalyzer {
    model: Arc<dyn LanguageModel>,
}

impl fmt::Debug for ArticleAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArticleAnalyzer")
            .field("model", &self.model.name())
            .finish()
    }
}

impl ArticleAnalyzer {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    pub async fn summarize(&self, text: &str) -> Result<SummaryResponse> {
        invoke::<SummaryResponse>(
            self.model.as_ref(),
            prompts::build_summary_prompt(text),
            prompts::SUMMARY_PROPERTY,
        )
        .await
    }

    /// Runs the three calls concurrently; the first failure fails the analysis.
    pub async fn analyze(&self, text: &str) -> Result<ArticleAnalysis> {
        let model = self.model.as_ref();
        let (summary, bias, objectivity) = tokio::try_join!(
            self.summarize(text),
            invoke::<PoliticalBiasResponse>(
                model,
                prompts::build_political_bias_prompt(text),
                prompts::POLITICAL_BIAS_PROPERTY,
            ),
            invoke::<ObjectivityResponse>(
                model,
                prompts::build_objectivity_prompt(text),
                prompts::OBJECTIVITY_PROPERTY,
            ),
        )?;

        info!(
            polarization = bias.bias_score,
            objectivity = objectivity.rhetoric_score,
            "Article analyzed"
        );

        Ok(ArticleAnalysis {
            summary: summary.summary,
            summary_footnotes: footnote_map(summary.footnotes),
            polarization: clamp_score(bias.bias_score),
            polarization_analysis: bias.analysis,
            polarization_footnotes: footnote_map(bias.footnotes),
            objectivity: clamp_score(objectivity.rhetoric_score),
            objectivity_analysis: objectivity.analysis,
            objectivity_footnotes: footnote_map(objectivity.footnotes),
        })
    }
}

fn null_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("null"))
}

/// Ask the model for a publication's display name and founding date.
pub async fn fetch_publication_metadata(
    model: &dyn LanguageModel,
    hostname: &str,
) -> Result<PublicationMetadata> {
    let prompt = prompts::build_publication_metadata_prompt(hostname);
    let raw: RawPublicationMetadata = invoke_text(model, &prompt, "publication_metadata").await?;

    Ok(PublicationMetadata {
        name: null_to_none(raw.name),
        date_founded: null_to_none(raw.date_founded)
            .as_deref()
            .and_then(parse_date_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::dummy::DummyModel;
    use chrono::{TimeZone, Utc};
    use nb_core::Error;
    use serde_json::json;

    fn scripted() -> DummyModel {
        DummyModel::new()
            .with_structured(
                prompts::SUMMARY_PROPERTY,
                json!({
                    "summary": "- Council approves budget[^1]",
                    "footnotes": [{"marker": "1", "text": "The council voted 7-2."}]
                }),
            )
            .with_structured(
                prompts::POLITICAL_BIAS_PROPERTY,
                json!({"bias_score": 130.0, "analysis": "- Leans right", "footnotes": []}),
            )
            .with_structured(
                prompts::OBJECTIVITY_PROPERTY,
                json!({"rhetoric_score": 82.5, "analysis": "- Mostly factual", "footnotes": []}),
            )
    }

    #[tokio::test]
    async fn test_analyze_combines_three_calls() {
        let model = Arc::new(scripted());
        let analyzer = ArticleAnalyzer::new(model.clone());

        let analysis = analyzer.analyze("The council voted 7-2.").await.unwrap();
        assert_eq!(model.calls(), 3);
        assert_eq!(analysis.summary, "- Council approves budget[^1]");
        assert_eq!(
            analysis.summary_footnotes.get("1").map(String::as_str),
            Some("The council voted 7-2.")
        );
        assert_eq!(analysis.polarization, 100.0);
        assert_eq!(analysis.objectivity, 82.5);
        assert!(analysis.objectivity_footnotes.is_empty());
    }

    #[tokio::test]
    async fn test_analyze_fails_when_one_call_fails() {
        let model = DummyModel::new()
            .with_structured(
                prompts::SUMMARY_PROPERTY,
                json!({"summary": "s", "footnotes": []}),
            )
            .with_structured(
                prompts::POLITICAL_BIAS_PROPERTY,
                json!({"bias_score": 50.0, "analysis": "a", "footnotes": []}),
            );
        let analyzer = ArticleAnalyzer::new(Arc::new(model));

        let err = analyzer.analyze("text").await.unwrap_err();
        assert!(matches!(err, Error::Inference(_)));
    }

    #[tokio::test]
    async fn test_publication_metadata() {
        let model = DummyModel::new()
            .with_text("```json\n{\"name\": \"CNN\", \"date_founded\": \"06/01/1980\"}\n```");
        let metadata = fetch_publication_metadata(&model, "www.cnn.com")
            .await
            .unwrap();
        assert_eq!(metadata.name.as_deref(), Some("CNN"));
        assert_eq!(
            metadata.date_founded,
            Some(Utc.with_ymd_and_hms(1980, 6, 1, 0, 0, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn test_publication_metadata_null_date() {
        let model =
            DummyModel::new().with_text("{\"name\": \"example.com\", \"date_founded\": \"NULL\"}");
        let metadata = fetch_publication_metadata(&model, "www.example.com")
            .await
            .unwrap();
        assert_eq!(metadata.name.as_deref(), Some("example.com"));
        assert_eq!(metadata.date_founded, None);
    }
}
