//! Text embeddings and the semantic similarity fed into match scoring.
//!
//! The scorer only ever sees an `Option<f64>`: when embedding fails the similarity is
//! dropped and scoring carries on without it.

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

pub mod cache;
pub mod handlers;
pub mod hash;

pub use cache::CachedEmbedder;
pub use hash::HashEmbedder;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("cannot embed empty text")]
    EmptyText,
}

#[async_trait]
pub trait Embedder: Send + Sync {
    fn model_name(&self) -> &str;

    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }
}

/// Cosine similarity mapped from [-1, 1] into [0, 1].
///
/// Mismatched dimensions or a zero vector give 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0_f64, 0.0_f64, 0.0_f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let cosine = (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0);
    (cosine + 1.0) / 2.0
}

/// Similarity of two texts, or `None` when either side cannot be embedded.
pub async fn semantic_similarity(embedder: &dyn Embedder, left: &str, right: &str) -> Option<f64> {
    let embedded = async {
        let a = embedder.embed(left).await?;
        let b = embedder.embed(right).await?;
        Ok::<_, EmbeddingError>(cosine_similarity(&a, &b))
    };
    match embedded.await {
        Ok(similarity) => Some(similarity),
        Err(e) => {
            warn!("Semantic similarity unavailable ({}): {e}", embedder.model_name());
            None
        }
    }
}
