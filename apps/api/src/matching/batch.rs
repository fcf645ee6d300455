//! Batch scoring of many résumés against one job.
//!
//! A résumé with nothing extractable is skipped with its reason; the rest of the batch
//! carries on. Results come back best-first.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::matching::hybrid::{HybridScorer, MatchInput};
use crate::matching::models::{ComponentScore, JobRequirements, ScoringMethod};

#[derive(Debug, Clone, Deserialize)]
pub struct BatchResume {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchEntry {
    pub resume_id: String,
    pub scores: ComponentScore,
    pub scoring_method: ScoringMethod,
    pub api_cost: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedResume {
    pub resume_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub total_candidates: usize,
    pub scored_candidates: usize,
    pub results: Vec<BatchEntry>,
    pub skipped: Vec<SkippedResume>,
    pub total_api_cost: f64,
    pub scoring_mode: &'static str,
}

pub async fn score_batch(
    scorer: &HybridScorer,
    resumes: &[BatchResume],
    job_description: &str,
    requirements: Option<&JobRequirements>,
    mode_override: Option<&str>,
) -> BatchOutcome {
    let mode = scorer.resolve_mode(mode_override);
    let extractor = scorer.rule_scorer().extractor();

    let mut results = Vec::with_capacity(resumes.len());
    let mut skipped = Vec::new();

    for resume in resumes {
        if let Err(e) = extractor.extract_profile(&resume.text) {
            warn!("Skipping resume {} in batch: {e}", resume.id);
            skipped.push(SkippedResume {
                resume_id: resume.id.clone(),
                reason: e.to_string(),
            });
            continue;
        }

        let result = scorer
            .calculate_match(MatchInput {
                resume_text: &resume.text,
                job_description,
                requirements,
                similarity: None,
                mode_override: Some(mode.as_str()),
            })
            .await;

        results.push(BatchEntry {
            resume_id: resume.id.clone(),
            scores: *result.scores(),
            scoring_method: result.scoring_method(),
            api_cost: result.api_cost(),
        });
    }

    // Stable: equal scores keep submission order.
    results.sort_by(|a, b| b.scores.overall.total_cmp(&a.scores.overall));
    let total_api_cost: f64 = results.iter().map(|r| r.api_cost).sum();

    info!(
        "Batch scored {}/{} resumes in {} mode",
        results.len(),
        resumes.len(),
        mode.as_str()
    );

    BatchOutcome {
        total_candidates: resumes.len(),
        scored_candidates: results.len(),
        results,
        skipped,
        total_api_cost,
        scoring_mode: mode.as_str(),
    }
}
