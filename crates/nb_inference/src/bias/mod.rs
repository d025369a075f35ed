//! Journalist and publication bias aggregation.
//!
//! Per-article scores are averaged and handed to the model together with the
//! entity's most recent summaries. The stored explanation is reused for as
//! long as the entity's article count stays the same.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use nb_core::{
    AnalysisResult, ArticleScores, ArticleStorage, BiasAnalysisInput, EntityBias, EntityBiasReport,
    EntityKind, EntityRef, Error, LanguageModel, Result,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::gateway::invoke;
use crate::prompts;

/// Substituted for the mean of an empty score set.
pub const NEUTRAL_SCORE: f64 = 50.0;

/// How many recent summaries a publication analysis sees.
pub const PUBLICATION_SUMMARY_LIMIT: usize = 10;

/// Arithmetic mean rounded to one decimal place.
pub fn mean_score(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return NEUTRAL_SCORE;
    }
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    (mean * 10.0).round() / 10.0
}

pub fn summary_limit(kind: EntityKind) -> Option<usize> {
    match kind {
        EntityKind::Journalist => None,
        EntityKind::Publication => Some(PUBLICATION_SUMMARY_LIMIT),
    }
}

/// Build the model input from scores ordered newest first.
pub fn build_input(kind: EntityKind, scores: &[ArticleScores]) -> BiasAnalysisInput {
    let polarization: Vec<f64> = scores.iter().filter_map(|s| s.polarization).collect();
    let objectivity: Vec<f64> = scores.iter().filter_map(|s| s.objectivity).collect();
    let limit = summary_limit(kind).unwrap_or(usize::MAX);
    let summaries = scores
        .iter()
        .filter_map(|s| s.summary.clone())
        .take(limit)
        .collect();

    BiasAnalysisInput {
        average_polarization: mean_score(&polarization),
        average_objectivity: mean_score(&objectivity),
        summaries,
    }
}

pub struct BiasAggregator {
    model: Arc<dyn LanguageModel>,
    storage: Arc<dyn ArticleStorage>,
}

impl fmt::Debug for BiasAggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BiasAggregator")
            .field("model", &self.model.name())
            .field("storage", &"<dyn ArticleStorage>")
            .finish()
    }
}

impl BiasAggregator {
    pub fn new(model: Arc<dyn LanguageModel>, storage: Arc<dyn ArticleStorage>) -> Self {
        Self { model, storage }
    }

    async fn entity_name(&self, entity: &EntityRef) -> Result<String> {
        let name = match entity.kind {
            EntityKind::Journalist => self.storage.get_journalist(&entity.id).await?.map(|j| j.name),
            EntityKind::Publication => self
                .storage
                .get_publication(&entity.id)
                .await?
                .map(|p| p.name.unwrap_or(p.hostname)),
        };
        name.ok_or_else(|| Error::NotFound(format!("{} {}", entity.kind, entity.id)))
    }

    /// Return the entity's bias explanation, asking the model only when the
    /// article count moved since the last stored analysis.
    pub async fn analyze(&self, entity: &EntityRef) -> Result<EntityBiasReport> {
        let name = self.entity_name(entity).await?;
        let scores = self.storage.entity_scores(entity).await?;
        let count = scores.len();

        if let Some(bias) = self.storage.find_entity_bias(entity, count).await? {
            debug!(%entity, count, "Reusing stored bias analysis");
            return Ok(EntityBiasReport { name, bias });
        }

        let input = build_input(entity.kind, &scores);
        let (prompt, property) = match entity.kind {
            EntityKind::Journalist => (
                prompts::build_journalist_analysis_prompt(&input),
                prompts::JOURNALIST_ANALYSIS_PROPERTY,
            ),
            EntityKind::Publication => (
                prompts::build_publication_analysis_prompt(&input),
                prompts::PUBLICATION_ANALYSIS_PROPERTY,
            ),
        };
        let result: AnalysisResult = invoke(self.model.as_ref(), prompt, property).await?;

        let bias = EntityBias {
            id: Uuid::new_v4().to_string(),
            entity: entity.clone(),
            num_articles_analyzed: count,
            polarization: input.average_polarization,
            objectivity: input.average_objectivity,
            analysis: result.analysis,
            created_at: Utc::now(),
        };
        self.storage.store_entity_bias(&bias).await?;
        info!(%entity, count, "Stored new bias analysis");

        Ok(EntityBiasReport { name, bias })
    }
}
