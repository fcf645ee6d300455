use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use siphasher::sip::SipHasher13;

use super::{Embedder, EmbeddingError};

// Fixed keys keep vectors stable across processes and Rust versions.
// Changing them invalidates every cached embedding: bump MODEL_NAME too.
const HASH_KEY_0: u64 = 0x0123_4567_89ab_cdef;
const HASH_KEY_1: u64 = 0xfedc_ba98_7654_3210;

const MODEL_NAME: &str = "feature-hash-v1";
const BIGRAM_WEIGHT: f32 = 0.5;

/// Deterministic feature-hashing embedder over word unigrams and bigrams.
///
/// No model download, no training. Each token lands in `hash % dimension` with a sign
/// taken from a second hash, and the result is L2-normalised.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
    max_text_length: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize, max_text_length: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            max_text_length,
        }
    }

    fn hash(token: &str) -> u64 {
        let mut hasher = SipHasher13::new_with_keys(HASH_KEY_0, HASH_KEY_1);
        token.hash(&mut hasher);
        hasher.finish()
    }

    fn add(&self, vector: &mut [f32], token: &str, weight: f32) {
        let idx = (Self::hash(token) % self.dimension as u64) as usize;
        let sign = if Self::hash(&format!("{token}#sign")) % 2 == 0 {
            1.0
        } else {
            -1.0
        };
        vector[idx] += sign * weight;
    }

    /// Embeds synchronously; the async trait method delegates here.
    pub fn embed_text(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let text = match text.char_indices().nth(self.max_text_length) {
            Some((idx, _)) => &text[..idx],
            None => text,
        };
        let lower = text.to_lowercase();
        let words = tokenize(&lower);
        if words.is_empty() {
            return Err(EmbeddingError::EmptyText);
        }

        let mut vector = vec![0.0_f32; self.dimension];
        for word in &words {
            self.add(&mut vector, word, 1.0);
        }
        for pair in words.windows(2) {
            self.add(&mut vector, &format!("{} {}", pair[0], pair[1]), BIGRAM_WEIGHT);
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }
}

/// Words are runs of alphanumerics plus `+`, `#` and `.` ("c++", "c#", "node.js"),
/// with trailing dots dropped.
fn tokenize(lower: &str) -> Vec<&str> {
    lower
        .split(|c: char| !(c.is_alphanumeric() || matches!(c, '+' | '#' | '.')))
        .map(|w| w.trim_matches('.'))
        .filter(|w| !w.is_empty())
        .collect()
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        MODEL_NAME
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_text(text)
    }
}
