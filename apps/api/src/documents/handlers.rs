//! Axum route handler for document uploads.

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use tracing::info;

use crate::documents::extract_document_text;
use crate::errors::AppError;
use crate::matching::models::ExtractedProfile;
use crate::state::AppState;

const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct ParseDocumentResponse {
    pub filename: String,
    pub text: String,
    pub char_count: usize,
    /// Absent when the text holds nothing the extractor can read.
    pub profile: Option<ExtractedProfile>,
}

/// POST /api/v1/parse/document
///
/// Multipart upload with a `file` field (.pdf, .txt, .md). Returns the extracted
/// text and the skills/experience/education profile found in it.
pub async fn handle_parse_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ParseDocumentResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::Validation("file field must carry a filename".to_string()))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("failed to read upload: {e}")))?;

        let size = bytes.len();
        let name = filename.clone();
        // PDF parsing is CPU-bound; keep it off the async workers.
        let text = tokio::task::spawn_blocking(move || extract_document_text(&name, &bytes))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("document extraction task failed: {e}")))??;
        let profile = state.hybrid.rule_scorer().extractor().extract_profile(&text).ok();
        info!("Parsed document {filename}: {size} bytes");

        return Ok(Json(ParseDocumentResponse {
            char_count: text.chars().count(),
            filename,
            text,
            profile,
        }));
    }

    Err(AppError::Validation(format!(
        "multipart body must include a '{FILE_FIELD}' field"
    )))
}
