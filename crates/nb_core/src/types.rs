use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A parsed article, ready to be handed to storage.
///
/// `text` is always the cleaned body and `date_published` falls back to the
/// parse time when no date could be recovered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleData {
    pub title: String,
    pub authors: Vec<String>,
    pub date_published: DateTime<Utc>,
    pub date_updated: Option<DateTime<Utc>>,
    pub hostname: String,
    pub url: String,
    pub text: String,
}

/// What the model extracts from a single chunk of HTML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ParseFragment {
    pub title: String,
    pub authors: Vec<String>,
    pub date_published: String,
    pub date_updated: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasAnalysisInput {
    pub average_polarization: f64,
    pub average_objectivity: f64,
    pub summaries: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisResult {
    pub analysis: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Journalist,
    Publication,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Journalist => write!(f, "journalist"),
            EntityKind::Publication => write!(f, "publication"),
        }
    }
}

/// A journalist or publication whose articles can be aggregated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub kind: EntityKind,
    pub id: String,
}

impl EntityRef {
    pub fn journalist(id: impl Into<String>) -> Self {
        Self {
            kind: EntityKind::Journalist,
            id: id.into(),
        }
    }

    pub fn publication(id: impl Into<String>) -> Self {
        Self {
            kind: EntityKind::Publication,
            id: id.into(),
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Publication {
    pub id: String,
    pub hostname: String,
    pub name: Option<String>,
    pub date_founded: Option<DateTime<Utc>>,
    /// Set once a metadata lookup has completed, even if it found no name.
    pub metadata_checked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Journalist {
    pub id: String,
    pub name: String,
    pub publication_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredArticle {
    pub id: String,
    pub publication_id: String,
    pub title: String,
    pub authors: Vec<Journalist>,
    pub date_published: DateTime<Utc>,
    pub date_updated: Option<DateTime<Utc>>,
    pub hostname: String,
    pub url: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicationMetadata {
    pub name: Option<String>,
    pub date_founded: Option<DateTime<Utc>>,
}

/// Summary and bias scores for a single article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleAnalysis {
    pub summary: String,
    pub summary_footnotes: BTreeMap<String, String>,
    pub polarization: f64,
    pub polarization_analysis: String,
    pub polarization_footnotes: BTreeMap<String, String>,
    pub objectivity: f64,
    pub objectivity_analysis: String,
    pub objectivity_footnotes: BTreeMap<String, String>,
}

/// Per-article inputs to an entity aggregation. Any part may be missing if
/// the article was never analyzed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleScores {
    pub article_id: String,
    pub date_published: DateTime<Utc>,
    pub polarization: Option<f64>,
    pub objectivity: Option<f64>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityBias {
    pub id: String,
    pub entity: EntityRef,
    pub num_articles_analyzed: usize,
    pub polarization: f64,
    pub objectivity: f64,
    pub analysis: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityBiasReport {
    pub name: String,
    #[serde(flatten)]
    pub bias: EntityBias,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupeReport {
    pub hostnames: usize,
    pub publications_removed: usize,
    pub articles_removed: usize,
}
