//! Axum route handlers for the Scoring API.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::embedding::semantic_similarity;
use crate::errors::AppError;
use crate::matching::batch::{score_batch, BatchOutcome, BatchResume};
use crate::matching::hybrid::{MatchInput, ScoringMode};
use crate::matching::models::{
    round2, JobRequirements, MatchExplanation, MatchResult, ScoringMethod, SkillMatch,
};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ScoringModeQuery {
    pub scoring_mode: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    pub resume_text: String,
    pub job_description: String,
    #[serde(default)]
    pub resume_id: Option<String>,
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub requirements: Option<JobRequirements>,
    #[serde(default)]
    pub include_explanation: bool,
}

#[derive(Debug, Serialize)]
pub struct MatchMetadata {
    pub scoring_method: ScoringMethod,
    pub llm_enhanced: bool,
    pub api_cost: f64,
}

#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub resume_id: String,
    pub job_id: String,
    #[serde(rename = "match")]
    pub result: MatchResult,
    /// From the rule breakdown; empty when the score came from the LLM alone.
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub metadata: MatchMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<MatchExplanation>,
}

#[derive(Debug, Deserialize)]
pub struct ExplainRequest {
    pub resume_text: String,
    pub job_description: String,
    pub overall_score: f64,
    #[serde(default)]
    pub use_llm: bool,
}

#[derive(Debug, Serialize)]
pub struct ExplainResponse {
    pub explanation: MatchExplanation,
}

#[derive(Debug, Deserialize)]
pub struct SkillOverlapRequest {
    pub resume_skills: Vec<String>,
    pub job_skills: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SkillOverlapResponse {
    pub skill_matches: Vec<SkillMatch>,
    pub total_required: usize,
    pub matched: usize,
    pub missing: usize,
    pub match_percentage: f64,
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub resumes: Vec<BatchResume>,
    pub job_description: String,
    #[serde(default)]
    pub requirements: Option<JobRequirements>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub scoring_mode: &'static str,
    pub hybrid_threshold: f64,
    pub refinement_scorer: &'static str,
    pub llm_model: String,
    pub taxonomy_skills: usize,
    pub skill_synonyms: usize,
    pub embedding_model: String,
    pub embedding_dimension: usize,
}

fn require_text(value: &str, field: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/score/match?scoring_mode=rule_based|hybrid|llm_only
///
/// Embedding similarity, then the mode-dependent scoring pipeline. The LLM narrative is
/// only requested for an explanation when the score itself already used the LLM.
pub async fn handle_match(
    State(state): State<AppState>,
    Query(query): Query<ScoringModeQuery>,
    Json(request): Json<MatchRequest>,
) -> Result<Json<MatchResponse>, AppError> {
    require_text(&request.resume_text, "resume_text")?;
    require_text(&request.job_description, "job_description")?;

    let similarity = semantic_similarity(
        state.embedder.as_ref(),
        &request.resume_text,
        &request.job_description,
    )
    .await;

    let mode_override = query.scoring_mode.as_deref();
    let result = state
        .hybrid
        .calculate_match(MatchInput {
            resume_text: &request.resume_text,
            job_description: &request.job_description,
            requirements: request.requirements.as_ref(),
            similarity,
            mode_override,
        })
        .await;

    let explanation = if request.include_explanation {
        let use_llm = state.hybrid.resolve_mode(mode_override) == ScoringMode::LlmOnly
            || result.llm_enhanced();
        Some(
            state
                .explainer
                .generate_explanation(
                    &request.resume_text,
                    &request.job_description,
                    result.scores().overall,
                    use_llm,
                )
                .await,
        )
    } else {
        None
    };

    let metadata = MatchMetadata {
        scoring_method: result.scoring_method(),
        llm_enhanced: result.llm_enhanced(),
        api_cost: result.api_cost() + explanation.as_ref().map_or(0.0, |e| e.api_cost),
    };

    let (matched_skills, missing_skills) = result
        .breakdown()
        .map(|b| (b.skills.matched.clone(), b.skills.missing.clone()))
        .unwrap_or_default();

    Ok(Json(MatchResponse {
        resume_id: request.resume_id.unwrap_or_else(|| "unknown".to_string()),
        job_id: request.job_id.unwrap_or_else(|| "unknown".to_string()),
        result,
        matched_skills,
        missing_skills,
        metadata,
        explanation,
    }))
}

/// POST /api/v1/score/explain
pub async fn handle_explain(
    State(state): State<AppState>,
    Json(request): Json<ExplainRequest>,
) -> Result<Json<ExplainResponse>, AppError> {
    require_text(&request.resume_text, "resume_text")?;
    require_text(&request.job_description, "job_description")?;
    if !(0.0..=100.0).contains(&request.overall_score) {
        return Err(AppError::Validation(
            "overall_score must be between 0 and 100".to_string(),
        ));
    }

    let explanation = state
        .explainer
        .generate_explanation(
            &request.resume_text,
            &request.job_description,
            request.overall_score,
            request.use_llm,
        )
        .await;

    Ok(Json(ExplainResponse { explanation }))
}

/// POST /api/v1/score/skill-overlap
///
/// Both lists are canonicalized through the taxonomy before comparison.
pub async fn handle_skill_overlap(
    State(state): State<AppState>,
    Json(request): Json<SkillOverlapRequest>,
) -> Result<Json<SkillOverlapResponse>, AppError> {
    let skill_matches = state
        .taxonomy
        .analyze_skill_overlap(&request.resume_skills, &request.job_skills);

    let total_required = skill_matches.len();
    let matched = skill_matches.iter().filter(|m| m.matched).count();
    let match_percentage = if total_required == 0 {
        0.0
    } else {
        round2(matched as f64 / total_required as f64 * 100.0)
    };

    Ok(Json(SkillOverlapResponse {
        skill_matches,
        total_required,
        matched,
        missing: total_required - matched,
        match_percentage,
    }))
}

/// POST /api/v1/score/batch?scoring_mode=
///
/// Scores every résumé against one job; unreadable résumés are reported under `skipped`.
pub async fn handle_batch(
    State(state): State<AppState>,
    Query(query): Query<ScoringModeQuery>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<BatchOutcome>, AppError> {
    require_text(&request.job_description, "job_description")?;

    let outcome = score_batch(
        &state.hybrid,
        &request.resumes,
        &request.job_description,
        request.requirements.as_ref(),
        query.scoring_mode.as_deref(),
    )
    .await;

    Ok(Json(outcome))
}

/// GET /api/v1/score/stats
pub async fn handle_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let settings = state.hybrid.settings();
    Json(StatsResponse {
        scoring_mode: state.hybrid.resolve_mode(None).as_str(),
        hybrid_threshold: settings.hybrid_threshold,
        refinement_scorer: state.hybrid.refiner_name(),
        llm_model: state.config.llm_model.clone(),
        taxonomy_skills: state.taxonomy.len(),
        skill_synonyms: state.taxonomy.synonym_count(),
        embedding_model: state.embedder.model_name().to_string(),
        embedding_dimension: state.embedder.dimension(),
    })
}
