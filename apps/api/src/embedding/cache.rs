//! Redis read-through cache in front of any `Embedder`.
//!
//! Cache trouble never fails an embedding: errors are logged and the inner embedder
//! answers directly.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use siphasher::sip::SipHasher13;
use thiserror::Error;
use tracing::{debug, warn};

use super::{Embedder, EmbeddingError};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// `embedding:<model>:<hex hash of text>`
pub fn cache_key(model: &str, text: &str) -> String {
    let mut hasher = SipHasher13::new_with_keys(0, 0);
    text.hash(&mut hasher);
    format!("embedding:{model}:{:016x}", hasher.finish())
}

/// Key-value backend for cached vectors.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<f32>>, CacheError>;

    async fn set(&self, key: &str, vector: &[f32], ttl_secs: u64) -> Result<(), CacheError>;
}

/// Vectors stored as JSON strings under `GET`/`SETEX`.
pub struct RedisStore {
    conn: MultiplexedConnection,
}

impl RedisStore {
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl VectorStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<f32>>, CacheError> {
        let mut conn = self.conn.clone();
        let cached: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        match cached {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, vector: &[f32], ttl_secs: u64) -> Result<(), CacheError> {
        let json = serde_json::to_string(vector)?;
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("SETEX")
            .arg(key)
            .arg(ttl_secs)
            .arg(json)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }
}

pub struct CachedEmbedder {
    inner: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    ttl_secs: u64,
}

impl CachedEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, store: Arc<dyn VectorStore>, ttl_secs: u64) -> Self {
        Self {
            inner,
            store,
            ttl_secs,
        }
    }

    /// Fails when Redis is unreachable; callers then use `inner` uncached.
    pub async fn connect(
        inner: Arc<dyn Embedder>,
        redis_url: &str,
        ttl_secs: u64,
    ) -> Result<Self, CacheError> {
        let store = RedisStore::connect(redis_url).await?;
        Ok(Self::new(inner, Arc::new(store), ttl_secs))
    }
}

#[async_trait]
impl Embedder for CachedEmbedder {
    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let key = cache_key(self.inner.model_name(), text);

        match self.store.get(&key).await {
            Ok(Some(vector)) if vector.len() == self.inner.dimension() => {
                debug!("Embedding cache hit: {key}");
                return Ok(vector);
            }
            Ok(_) => debug!("Embedding cache miss: {key}"),
            Err(e) => warn!("Embedding cache read failed, bypassing: {e}"),
        }

        let vector = self.inner.embed(text).await?;
        if let Err(e) = self.store.set(&key, &vector, self.ttl_secs).await {
            warn!("Embedding cache write failed: {e}");
        }
        Ok(vector)
    }
}
