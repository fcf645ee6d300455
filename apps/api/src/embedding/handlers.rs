//! Axum route handlers for the Embeddings API.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::embedding::cosine_similarity;
use crate::errors::AppError;
use crate::state::AppState;

/// Upper bound on texts embedded in one request.
const MAX_TEXTS_PER_REQUEST: usize = 100;

#[derive(Debug, Deserialize)]
pub struct EmbedRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub texts: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct EmbedResponse {
    pub model: String,
    pub dimension: usize,
    pub embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
pub struct SimilarityRequest {
    pub text_a: String,
    pub text_b: String,
}

#[derive(Debug, Serialize)]
pub struct SimilarityResponse {
    pub model: String,
    pub similarity: f64,
}

/// POST /api/v1/embeddings
///
/// Accepts a single `text`, a `texts` list, or both (the single text goes first).
pub async fn handle_embed(
    State(state): State<AppState>,
    Json(request): Json<EmbedRequest>,
) -> Result<Json<EmbedResponse>, AppError> {
    let texts: Vec<String> = request.text.into_iter().chain(request.texts).collect();
    if texts.is_empty() {
        return Err(AppError::Validation(
            "provide 'text' or a non-empty 'texts' list".to_string(),
        ));
    }
    if texts.len() > MAX_TEXTS_PER_REQUEST {
        return Err(AppError::UnprocessableEntity(format!(
            "at most {MAX_TEXTS_PER_REQUEST} texts per request, got {}",
            texts.len()
        )));
    }

    let embeddings = state.embedder.embed_batch(&texts).await?;

    Ok(Json(EmbedResponse {
        model: state.embedder.model_name().to_string(),
        dimension: state.embedder.dimension(),
        embeddings,
    }))
}

/// POST /api/v1/embeddings/similarity
pub async fn handle_similarity(
    State(state): State<AppState>,
    Json(request): Json<SimilarityRequest>,
) -> Result<Json<SimilarityResponse>, AppError> {
    let a = state.embedder.embed(&request.text_a).await?;
    let b = state.embedder.embed(&request.text_b).await?;

    Ok(Json(SimilarityResponse {
        model: state.embedder.model_name().to_string(),
        similarity: cosine_similarity(&a, &b),
    }))
}
