//! Plain-text extraction from uploaded résumé and job-description files.

use thiserror::Error;
use tracing::debug;

pub mod handlers;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Unsupported file type: {0}")]
    Unsupported(String),

    #[error("Failed to extract PDF text: {0}")]
    Pdf(String),

    #[error("Document contains no extractable text")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentKind {
    Pdf,
    PlainText,
}

fn kind_for(filename: &str) -> Result<DocumentKind, DocumentError> {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "pdf" => Ok(DocumentKind::Pdf),
        "txt" | "md" => Ok(DocumentKind::PlainText),
        _ => Err(DocumentError::Unsupported(if extension.is_empty() {
            filename.to_string()
        } else {
            format!(".{extension}")
        })),
    }
}

/// Collapses runs of whitespace to single spaces, keeping paragraph breaks as one newline.
pub fn normalize_whitespace(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Extracts normalised text from `bytes`, choosing the reader by file extension.
pub fn extract_document_text(filename: &str, bytes: &[u8]) -> Result<String, DocumentError> {
    let raw = match kind_for(filename)? {
        DocumentKind::Pdf => {
            pdf_extract::extract_text_from_mem(bytes).map_err(|e| DocumentError::Pdf(e.to_string()))?
        }
        DocumentKind::PlainText => String::from_utf8_lossy(bytes).into_owned(),
    };

    let text = normalize_whitespace(&raw);
    if text.is_empty() {
        return Err(DocumentError::Empty);
    }
    debug!("Extracted {} chars from {filename}", text.chars().count());
    Ok(text)
}
