//! Refinement Scorer: an independent set of component scores from the LLM.
//!
//! Pluggable behind `RefinementScorer` so the orchestrator never sees the LLM directly.
//! Malformed or missing JSON is an `Err`, never a panic or a default score.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::llm_client::prompts::{fill_template, truncate_for_prompt, JSON_ONLY_SYSTEM};
use crate::llm_client::{find_json_object, strip_json_fences, LlmError, LlmProvider};
use crate::matching::models::ComponentScore;
use crate::matching::prompts::REFINEMENT_PROMPT_TEMPLATE;

#[derive(Debug, Error)]
pub enum RefinementError {
    #[error("LLM call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("LLM response contained no JSON object")]
    NoJson,

    #[error("LLM response JSON was malformed: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait RefinementScorer: Send + Sync {
    /// Backend label for logs and stats.
    fn name(&self) -> &'static str;

    async fn refine(
        &self,
        resume_text: &str,
        job_description: &str,
    ) -> Result<ComponentScore, RefinementError>;
}

#[derive(Debug, Deserialize)]
struct LlmScores {
    overall_score: f64,
    skills_score: f64,
    experience_score: f64,
    education_score: f64,
}

/// Parses clamped component scores from an LLM reply.
///
/// The fence-stripped reply is tried as a whole first; only when that fails is the
/// first flat `{...}` embedded in prose used.
pub fn parse_llm_scores(text: &str) -> Result<ComponentScore, RefinementError> {
    let stripped = strip_json_fences(text);
    let scores: LlmScores = match serde_json::from_str(stripped) {
        Ok(scores) => scores,
        Err(_) => {
            let json = find_json_object(stripped, true).ok_or(RefinementError::NoJson)?;
            serde_json::from_str(json).map_err(|e| RefinementError::Malformed(e.to_string()))?
        }
    };

    Ok(ComponentScore {
        overall: scores.overall_score,
        skills: scores.skills_score,
        experience: scores.experience_score,
        education: scores.education_score,
    }
    .normalized())
}

/// LLM-backed refinement scorer.
pub struct LlmRefinementScorer {
    llm: Arc<dyn LlmProvider>,
}

impl LlmRefinementScorer {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl RefinementScorer for LlmRefinementScorer {
    fn name(&self) -> &'static str {
        "llm"
    }

    async fn refine(
        &self,
        resume_text: &str,
        job_description: &str,
    ) -> Result<ComponentScore, RefinementError> {
        let prompt = fill_template(
            REFINEMENT_PROMPT_TEMPLATE,
            &[
                ("resume_text", truncate_for_prompt(resume_text)),
                ("job_description", truncate_for_prompt(job_description)),
            ],
        );

        let response = self.llm.complete(&prompt, JSON_ONLY_SYSTEM).await?;
        let scores = parse_llm_scores(&response)?;
        debug!(
            "LLM refinement ({}): overall={:.1}",
            self.llm.model(),
            scores.overall
        );
        Ok(scores)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Returns a fixed reply (or error) and records every prompt it receives.
    pub(crate) struct ScriptedLlm {
        reply: Result<String, String>,
        pub(crate) prompts: Mutex<Vec<String>>,
    }

    impl ScriptedLlm {
        pub(crate) fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn failing(status_message: &str) -> Self {
            Self {
                reply: Err(status_message.to_string()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        fn model(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, prompt: &str, _system: &str) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.reply.clone().map_err(|message| LlmError::Api {
                status: 503,
                message,
            })
        }
    }

    #[test]
    fn test_parse_scores_from_plain_json() {
        let scores = parse_llm_scores(
            r#"{"skills_score": 80, "experience_score": 70, "education_score": 90, "overall_score": 78.5}"#,
        )
        .unwrap();
        assert_eq!(scores.overall, 78.5);
        assert_eq!(scores.skills, 80.0);
        assert_eq!(scores.experience, 70.0);
        assert_eq!(scores.education, 90.0);
    }

    #[test]
    fn test_parse_scores_embedded_in_prose() {
        let text = "Sure! Here is my assessment:\n```json\n{\"skills_score\": 60, \"experience_score\": 50, \"education_score\": 40, \"overall_score\": 55}\n```";
        assert_eq!(parse_llm_scores(text).unwrap().overall, 55.0);
    }

    #[test]
    fn test_parse_scores_whole_reply_with_nested_object() {
        let text = r#"{"skills_score": 80, "experience_score": 70, "education_score": 90, "overall_score": 78, "details": {"note": "ok"}}"#;
        assert_eq!(parse_llm_scores(text).unwrap().overall, 78.0);
    }

    #[test]
    fn test_parse_scores_whole_reply_with_brace_in_string() {
        let text = "```json\n{\"skills_score\": 80, \"experience_score\": 70, \"education_score\": 90, \"overall_score\": 75, \"reason\": \"strong {backend} fit\"}\n```";
        let scores = parse_llm_scores(text).unwrap();
        assert_eq!(scores.overall, 75.0);
        assert_eq!(scores.skills, 80.0);
    }

    #[test]
    fn test_parse_scores_clamps_out_of_range() {
        let scores = parse_llm_scores(
            r#"{"skills_score": 140, "experience_score": -5, "education_score": 90, "overall_score": 101}"#,
        )
        .unwrap();
        assert_eq!(scores.skills, 100.0);
        assert_eq!(scores.experience, 0.0);
        assert_eq!(scores.overall, 100.0);
    }

    #[test]
    fn test_parse_scores_without_json_fails() {
        assert!(matches!(
            parse_llm_scores("I cannot score this candidate."),
            Err(RefinementError::NoJson)
        ));
    }

    #[test]
    fn test_parse_scores_missing_field_fails() {
        assert!(matches!(
            parse_llm_scores(r#"{"skills_score": 80, "overall_score": 70}"#),
            Err(RefinementError::Malformed(_))
        ));
    }

    #[test]
    fn test_parse_scores_non_numeric_fails() {
        assert!(matches!(
            parse_llm_scores(
                r#"{"skills_score": "high", "experience_score": 1, "education_score": 1, "overall_score": 1}"#
            ),
            Err(RefinementError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_refine_sends_truncated_texts() {
        let llm = Arc::new(ScriptedLlm::replying(
            r#"{"skills_score": 1, "experience_score": 2, "education_score": 3, "overall_score": 4}"#,
        ));
        let scorer = LlmRefinementScorer::new(llm.clone());
        let long_resume = "x".repeat(5000);
        let scores = scorer.refine(&long_resume, "Rust role").await.unwrap();
        assert_eq!(scores.overall, 4.0);

        let prompts = llm.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Rust role"));
        assert!(!prompts[0].contains(&"x".repeat(2001)));
    }

    #[tokio::test]
    async fn test_refine_leaves_placeholders_in_resume_alone() {
        let llm = Arc::new(ScriptedLlm::replying(
            r#"{"skills_score": 1, "experience_score": 2, "education_score": 3, "overall_score": 4}"#,
        ));
        let scorer = LlmRefinementScorer::new(llm.clone());
        scorer
            .refine("Template nerd: {job_description}", "SECRET JOB")
            .await
            .unwrap();

        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].contains("Template nerd: {job_description}"));
        assert_eq!(prompts[0].matches("SECRET JOB").count(), 1);
    }

    #[tokio::test]
    async fn test_refine_propagates_transport_failure() {
        let scorer = LlmRefinementScorer::new(Arc::new(ScriptedLlm::failing("overloaded")));
        let err = scorer.refine("resume", "job").await.unwrap_err();
        assert!(matches!(err, RefinementError::Llm(LlmError::Api { status: 503, .. })));
    }
}
