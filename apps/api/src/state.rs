use std::sync::Arc;

use crate::config::Config;
use crate::embedding::Embedder;
use crate::matching::explanation::ExplanationGenerator;
use crate::matching::hybrid::HybridScorer;
use crate::matching::taxonomy::SkillTaxonomy;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub hybrid: Arc<HybridScorer>,
    pub explainer: Arc<ExplanationGenerator>,
    /// Hash embedder, optionally behind the Redis cache.
    pub embedder: Arc<dyn Embedder>,
    pub taxonomy: Arc<SkillTaxonomy>,
}
