mod config;
mod documents;
mod embedding;
mod errors;
mod llm_client;
mod matching;
mod routes;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::embedding::{CachedEmbedder, Embedder, HashEmbedder};
use crate::llm_client::LlmClient;
use crate::matching::explanation::ExplanationGenerator;
use crate::matching::extractor::FeatureExtractor;
use crate::matching::hybrid::{HybridScorer, ScoringSettings};
use crate::matching::refinement::LlmRefinementScorer;
use crate::matching::rule_scorer::RuleScorer;
use crate::matching::taxonomy::SkillTaxonomy;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on malformed env values)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Screener API v{}", env!("CARGO_PKG_VERSION"));

    // Skill taxonomy, shared by extraction and the skill-overlap endpoint
    let taxonomy = Arc::new(SkillTaxonomy::builtin().context("built-in skill taxonomy is invalid")?);
    info!(
        "Skill taxonomy loaded: {} skills, {} surface forms",
        taxonomy.len(),
        taxonomy.synonym_count()
    );
    let extractor =
        FeatureExtractor::new(taxonomy.clone()).context("failed to compile keyword matchers")?;

    // Initialize LLM client
    if config.anthropic_api_key.is_none() {
        warn!("ANTHROPIC_API_KEY not set: LLM refinement and narratives will fall back to rules");
    }
    let llm = Arc::new(LlmClient::new(
        config.anthropic_api_key.clone(),
        config.llm_model.clone(),
        Duration::from_secs(config.llm_timeout_secs),
    )?);
    info!("LLM client initialized (model: {})", config.llm_model);

    // Hybrid scorer: rule scorer + LLM refinement behind the RefinementScorer trait
    let hybrid = HybridScorer::new(
        RuleScorer::new(extractor.clone()),
        Arc::new(LlmRefinementScorer::new(llm.clone())),
        ScoringSettings {
            default_mode: config.scoring_mode.clone(),
            hybrid_threshold: config.hybrid_llm_threshold,
            cost_per_token: config.llm_cost_per_token,
        },
    );
    info!(
        "Scoring mode: {} (hybrid threshold {}%)",
        hybrid.resolve_mode(None).as_str(),
        config.hybrid_llm_threshold
    );

    let explainer = ExplanationGenerator::new(extractor, llm, config.llm_cost_per_token);

    let embedder = build_embedder(&config).await;

    // Build app state
    let state = AppState {
        config: config.clone(),
        hybrid: Arc::new(hybrid),
        explainer: Arc::new(explainer),
        embedder,
        taxonomy,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Hash embedder, wrapped in the Redis cache when one is configured and reachable.
async fn build_embedder(config: &Config) -> Arc<dyn Embedder> {
    let embedder: Arc<dyn Embedder> =
        Arc::new(HashEmbedder::new(config.embedding_dim, config.max_text_length));

    let redis_url = match (&config.redis_url, config.enable_cache) {
        (Some(url), true) => url,
        _ => {
            info!("Embedding cache disabled");
            return embedder;
        }
    };

    match CachedEmbedder::connect(embedder.clone(), redis_url, config.cache_ttl_seconds).await {
        Ok(cached) => {
            info!("Embedding cache enabled (TTL {}s)", config.cache_ttl_seconds);
            Arc::new(cached)
        }
        Err(e) => {
            warn!("Redis unavailable, embedding without cache: {e}");
            embedder
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_config(redis_url: Option<&str>, enable_cache: bool) -> Config {
        Config {
            port: 0,
            rust_log: "info".to_string(),
            scoring_mode: "rule_based".to_string(),
            hybrid_llm_threshold: 70.0,
            llm_cost_per_token: 0.0,
            anthropic_api_key: None,
            llm_model: "test-model".to_string(),
            llm_timeout_secs: 5,
            embedding_dim: 32,
            max_text_length: 1_000,
            redis_url: redis_url.map(str::to_string),
            enable_cache,
            cache_ttl_seconds: 60,
            max_upload_bytes: 1024,
        }
    }

    #[tokio::test]
    async fn test_unreachable_redis_falls_back_to_plain_embedder() {
        let config = cache_config(Some("redis://127.0.0.1:1"), true);
        let embedder = build_embedder(&config).await;
        let expected = HashEmbedder::new(32, 1_000).embed("rust engineer").await.unwrap();

        assert_eq!(embedder.dimension(), 32);
        assert_eq!(embedder.embed("rust engineer").await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_cache_disabled_uses_plain_embedder() {
        let config = cache_config(Some("redis://127.0.0.1:1"), false);
        let embedder = build_embedder(&config).await;
        assert_eq!(embedder.model_name(), "feature-hash-v1");
        assert!(embedder.embed("rust engineer").await.is_ok());
    }
}
