pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::documents::handlers as documents;
use crate::embedding::handlers as embeddings;
use crate::matching::handlers as scoring;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        // Scoring API
        .route("/api/v1/score/match", post(scoring::handle_match))
        .route("/api/v1/score/explain", post(scoring::handle_explain))
        .route(
            "/api/v1/score/skill-overlap",
            post(scoring::handle_skill_overlap),
        )
        .route("/api/v1/score/batch", post(scoring::handle_batch))
        .route("/api/v1/score/stats", get(scoring::handle_stats))
        // Embeddings API
        .route("/api/v1/embeddings", post(embeddings::handle_embed))
        .route(
            "/api/v1/embeddings/similarity",
            post(embeddings::handle_similarity),
        )
        // Documents API
        .route(
            "/api/v1/parse/document",
            post(documents::handle_parse_document).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .with_state(state)
}
