use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use nb_core::{
    ArticleAnalysis, EntityBiasReport, EntityRef, Error, StoredArticle,
};
use nb_inference::analysis::{fetch_publication_metadata, SummaryResponse};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::error::ApiResult;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ParseArticleRequest {
    pub url: String,
    pub html: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateSummaryRequest {
    pub article_content: String,
}

#[derive(Debug, Serialize)]
pub struct ArticleResponse {
    #[serde(flatten)]
    pub article: StoredArticle,
    pub analysis: Option<ArticleAnalysis>,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "model": state.model.name(),
    }))
}

/// Look up a publication's display name the first time we see its hostname.
/// A failed lookup is logged, leaves the publication unchecked and never
/// fails the ingest.
async fn ensure_publication_metadata(state: &AppState, article: &StoredArticle) {
    let publication = match state.storage.get_publication(&article.publication_id).await {
        Ok(Some(publication)) if publication.metadata_checked_at.is_none() => publication,
        Ok(_) => return,
        Err(e) => {
            warn!(error = %e, "Could not load publication");
            return;
        }
    };

    match fetch_publication_metadata(state.model.as_ref(), &publication.hostname).await {
        Ok(metadata) => {
            if let Err(e) = state
                .storage
                .update_publication_metadata(&publication.id, &metadata)
                .await
            {
                warn!(hostname = %publication.hostname, error = %e, "Could not store publication metadata");
            }
        }
        Err(e) => {
            warn!(hostname = %publication.hostname, error = %e, "Could not fetch publication metadata");
        }
    }
}

pub async fn parse_article(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ParseArticleRequest>,
) -> ApiResult<Json<StoredArticle>> {
    let article = state.parsers.parse(&request.url, &request.html).await?;
    let stored = state.storage.upsert_article(&article).await?;
    info!(id = %stored.id, url = %stored.url, "Stored article");

    ensure_publication_metadata(&state, &stored).await;
    Ok(Json(stored))
}

pub async fn list_articles(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<StoredArticle>>> {
    Ok(Json(state.storage.list_articles().await?))
}

pub async fn get_article(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ArticleResponse>> {
    let article = state
        .storage
        .get_article(&id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("article {}", id)))?;
    let analysis = state.storage.get_article_analysis(&id).await?;
    Ok(Json(ArticleResponse { article, analysis }))
}

pub async fn delete_article(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.storage.delete_article(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn analyze_article(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ArticleAnalysis>> {
    let article = state
        .storage
        .get_article(&id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("article {}", id)))?;

    let analysis = state.analyzer.analyze(&article.text).await?;
    state.storage.store_article_analysis(&id, &analysis).await?;
    Ok(Json(analysis))
}

pub async fn generate_summary(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GenerateSummaryRequest>,
) -> ApiResult<Json<SummaryResponse>> {
    if request.article_content.trim().is_empty() {
        return Err(Error::EmptyContent("articleContent is empty".to_string()).into());
    }
    Ok(Json(state.analyzer.summarize(&request.article_content).await?))
}

pub async fn journalist_bias(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<EntityBiasReport>> {
    Ok(Json(state.aggregator.analyze(&EntityRef::journalist(id)).await?))
}

pub async fn publication_bias(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<EntityBiasReport>> {
    Ok(Json(state.aggregator.analyze(&EntityRef::publication(id)).await?))
}
