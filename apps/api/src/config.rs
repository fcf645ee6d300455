use std::str::FromStr;

use anyhow::{Context, Result};

use crate::llm_client::DEFAULT_MODEL;

/// Application configuration loaded from environment variables.
/// Every variable has a default; only malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    /// Raw value; unknown modes fall back to rule_based when a request is scored.
    pub scoring_mode: String,
    pub hybrid_llm_threshold: f64,
    pub llm_cost_per_token: f64,
    pub anthropic_api_key: Option<String>,
    pub llm_model: String,
    pub llm_timeout_secs: u64,
    pub embedding_dim: usize,
    pub max_text_length: usize,
    pub redis_url: Option<String>,
    pub enable_cache: bool,
    pub cache_ttl_seconds: u64,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            port: parse_env("PORT", 8000)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            scoring_mode: std::env::var("SCORING_MODE").unwrap_or_else(|_| "hybrid".to_string()),
            hybrid_llm_threshold: parse_env("HYBRID_LLM_THRESHOLD", 70.0)?,
            llm_cost_per_token: parse_env("LLM_COST_PER_TOKEN", 0.075 / 1_000_000.0)?,
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            llm_model: optional_env("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            llm_timeout_secs: parse_env("LLM_TIMEOUT_SECS", 60)?,
            embedding_dim: parse_env("EMBEDDING_DIM", 384)?,
            max_text_length: parse_env("MAX_TEXT_LENGTH", 50_000)?,
            redis_url: optional_env("REDIS_URL"),
            enable_cache: parse_env("ENABLE_CACHE", true)?,
            cache_ttl_seconds: parse_env("CACHE_TTL_SECONDS", 3600)?,
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
        })
    }
}

/// Set and non-blank, or `None`.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse::<T>()
        .with_context(|| format!("Environment variable '{key}' has an invalid value: '{raw}'"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_accepts_typed_values() {
        assert_eq!(parse_value::<u16>("PORT", " 9000 ").unwrap(), 9000);
        assert_eq!(parse_value::<f64>("HYBRID_LLM_THRESHOLD", "65.5").unwrap(), 65.5);
        assert!(!parse_value::<bool>("ENABLE_CACHE", "false").unwrap());
    }

    #[test]
    fn test_parse_value_reports_key() {
        let err = parse_value::<u16>("PORT", "eighty").unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn test_missing_variable_uses_default() {
        assert_eq!(
            parse_env("SCREENER_TEST_UNSET_VARIABLE", 42_u64).unwrap(),
            42
        );
    }
}
