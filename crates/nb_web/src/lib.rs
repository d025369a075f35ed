use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod error;
pub mod handlers;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/articles", get(handlers::list_articles))
        .route("/api/articles/parse", post(handlers::parse_article))
        .route(
            "/api/articles/:id",
            get(handlers::get_article).delete(handlers::delete_article),
        )
        .route("/api/articles/:id/analyze", post(handlers::analyze_article))
        .route("/api/generate-summary", post(handlers::generate_summary))
        .route("/api/journalists/:id/bias", get(handlers::journalist_bias))
        .route("/api/publications/:id/bias", get(handlers::publication_bias))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state))
}

/// Bind `port` on all interfaces and serve until the process exits.
pub async fn serve(state: AppState, port: u16) -> nb_core::Result<()> {
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

pub mod prelude {
    pub use crate::{create_app, serve, AppState};
    pub use nb_core::{Error, Result, StoredArticle};
}
