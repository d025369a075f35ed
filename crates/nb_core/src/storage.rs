use async_trait::async_trait;

use crate::types::{
    ArticleAnalysis, ArticleData, ArticleScores, DedupeReport, EntityBias, EntityRef, Journalist,
    Publication, PublicationMetadata, StoredArticle,
};
use crate::Result;

#[async_trait]
pub trait ArticleStorage: Send + Sync {
    /// Insert or replace the article with the same URL. The publication is
    /// resolved by hostname and journalists by name, creating either as needed.
    async fn upsert_article(&self, article: &ArticleData) -> Result<StoredArticle>;

    async fn get_article(&self, id: &str) -> Result<Option<StoredArticle>>;

    async fn get_article_by_url(&self, url: &str) -> Result<Option<StoredArticle>>;

    async fn list_articles(&self) -> Result<Vec<StoredArticle>>;

    /// `(id, text)` pairs in insertion order, `limit` rows starting at `offset`.
    async fn list_article_texts(&self, offset: usize, limit: usize) -> Result<Vec<(String, String)>>;

    async fn delete_article(&self, id: &str) -> Result<()>;

    async fn update_article_text(&self, id: &str, text: &str) -> Result<()>;

    async fn store_article_analysis(&self, article_id: &str, analysis: &ArticleAnalysis) -> Result<()>;

    async fn get_article_analysis(&self, article_id: &str) -> Result<Option<ArticleAnalysis>>;

    async fn get_journalist(&self, id: &str) -> Result<Option<Journalist>>;

    async fn get_publication(&self, id: &str) -> Result<Option<Publication>>;

    /// Store the lookup result and mark the publication as checked.
    async fn update_publication_metadata(&self, id: &str, metadata: &PublicationMetadata) -> Result<()>;

    /// Scores of every article associated with the entity, newest first.
    async fn entity_scores(&self, entity: &EntityRef) -> Result<Vec<ArticleScores>>;

    /// Stored analysis for the entity that covered exactly `num_articles` articles.
    async fn find_entity_bias(&self, entity: &EntityRef, num_articles: usize) -> Result<Option<EntityBias>>;

    async fn store_entity_bias(&self, bias: &EntityBias) -> Result<()>;

    /// Collapse publications sharing a hostname into the oldest one.
    async fn dedupe_publications(&self) -> Result<DedupeReport>;
}
