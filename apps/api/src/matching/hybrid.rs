//! Hybrid Orchestrator: decides per call which scorer(s) run and how results combine.
//!
//! Modes:
//! - `rule_based`: rule scorer only, free.
//! - `llm_only`: refinement scorer only, cost estimated from input size.
//! - `hybrid`: rule scorer first; refinement only when the rule overall clears the
//!   threshold, then blended 60% rule / 40% LLM.
//!
//! Every path returns a `MatchResult`. Refinement failures degrade one tier down and are
//! signalled through `scoring_method`, never through an error.

use std::sync::Arc;

use tracing::{info, warn};

use crate::matching::models::{JobRequirements, MatchResult, ScoringOutcome};
use crate::matching::refinement::{RefinementError, RefinementScorer};
use crate::matching::rule_scorer::RuleScorer;

/// Rule share of a blended hybrid score.
const RULE_BLEND_WEIGHT: f64 = 0.6;
/// Rough characters-per-token ratio used for cost estimation.
const CHARS_PER_TOKEN: f64 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringMode {
    RuleBased,
    Hybrid,
    LlmOnly,
}

impl ScoringMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "rule_based" => Some(ScoringMode::RuleBased),
            "hybrid" => Some(ScoringMode::Hybrid),
            "llm_only" => Some(ScoringMode::LlmOnly),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScoringMode::RuleBased => "rule_based",
            ScoringMode::Hybrid => "hybrid",
            ScoringMode::LlmOnly => "llm_only",
        }
    }
}

/// Per-call override first, then the process default; anything unrecognized is rule_based.
pub fn resolve_mode(mode_override: Option<&str>, default_mode: &str) -> ScoringMode {
    let requested = mode_override.unwrap_or(default_mode);
    ScoringMode::parse(requested).unwrap_or_else(|| {
        warn!("Unknown scoring mode: {requested}, falling back to rule_based");
        ScoringMode::RuleBased
    })
}

/// `(len(resume) + len(job)) / 4` tokens at `cost_per_token`.
pub fn estimate_api_cost(resume_text: &str, job_description: &str, cost_per_token: f64) -> f64 {
    let chars = resume_text.chars().count() + job_description.chars().count();
    (chars as f64 / CHARS_PER_TOKEN) * cost_per_token
}

#[derive(Debug, Clone)]
pub struct ScoringSettings {
    /// Raw configured mode; validated per call so a bad value only warns.
    pub default_mode: String,
    pub hybrid_threshold: f64,
    pub cost_per_token: f64,
}

/// One match request, borrowed from the caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchInput<'a> {
    pub resume_text: &'a str,
    pub job_description: &'a str,
    pub requirements: Option<&'a JobRequirements>,
    pub similarity: Option<f64>,
    pub mode_override: Option<&'a str>,
}

/// The orchestrator. Holds no per-request state; share it behind an `Arc`.
pub struct HybridScorer {
    rule: RuleScorer,
    refiner: Arc<dyn RefinementScorer>,
    settings: ScoringSettings,
}

impl HybridScorer {
    pub fn new(rule: RuleScorer, refiner: Arc<dyn RefinementScorer>, settings: ScoringSettings) -> Self {
        Self {
            rule,
            refiner,
            settings,
        }
    }

    pub fn rule_scorer(&self) -> &RuleScorer {
        &self.rule
    }

    pub fn settings(&self) -> &ScoringSettings {
        &self.settings
    }

    pub fn refiner_name(&self) -> &'static str {
        self.refiner.name()
    }

    pub fn resolve_mode(&self, mode_override: Option<&str>) -> ScoringMode {
        resolve_mode(mode_override, &self.settings.default_mode)
    }

    pub async fn calculate_match(&self, input: MatchInput<'_>) -> MatchResult {
        let mode = self.resolve_mode(input.mode_override);

        let outcome = match self.run_mode(mode, &input).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Scoring in {} mode failed, falling back to rule-based: {e}", mode.as_str());
                self.rule_based(&input)
            }
        };

        let result = MatchResult {
            outcome,
            semantic_similarity: input.similarity,
        };
        info!(
            "Match calculated: {:.2}% using {}",
            result.scores().overall,
            result.scoring_method().as_str()
        );
        result
    }

    async fn run_mode(
        &self,
        mode: ScoringMode,
        input: &MatchInput<'_>,
    ) -> Result<ScoringOutcome, RefinementError> {
        match mode {
            ScoringMode::RuleBased => Ok(self.rule_based(input)),
            ScoringMode::LlmOnly => {
                let scores = self
                    .refiner
                    .refine(input.resume_text, input.job_description)
                    .await?;
                Ok(ScoringOutcome::Llm {
                    scores,
                    api_cost: self.cost(input),
                })
            }
            ScoringMode::Hybrid => Ok(self.hybrid(input).await),
        }
    }

    fn rule_based(&self, input: &MatchInput<'_>) -> ScoringOutcome {
        let rule = self.rule.score(
            input.resume_text,
            input.job_description,
            input.requirements,
            input.similarity,
        );
        ScoringOutcome::RuleBased {
            scores: rule.scores,
            breakdown: rule.breakdown,
        }
    }

    async fn hybrid(&self, input: &MatchInput<'_>) -> ScoringOutcome {
        let rule = self.rule.score(
            input.resume_text,
            input.job_description,
            input.requirements,
            input.similarity,
        );
        let rule_overall = rule.scores.overall;
        let threshold = self.settings.hybrid_threshold;

        if rule_overall < threshold {
            info!("Candidate score {rule_overall:.2}% < threshold {threshold}%, using rule-based only");
            return ScoringOutcome::HybridRuleOnly {
                scores: rule.scores,
                breakdown: rule.breakdown,
            };
        }

        info!("Candidate score {rule_overall:.2}% >= threshold {threshold}%, enhancing with LLM");
        match self
            .refiner
            .refine(input.resume_text, input.job_description)
            .await
        {
            Ok(llm_score) => {
                let blended = rule.scores.blend(&llm_score, RULE_BLEND_WEIGHT);
                info!(
                    "Hybrid scoring: Rule {:.2}% + LLM {:.2}% = {:.2}%",
                    rule_overall, llm_score.overall, blended.overall
                );
                ScoringOutcome::Hybrid {
                    scores: blended,
                    rule_score: rule.scores,
                    llm_score,
                    breakdown: rule.breakdown,
                    api_cost: self.cost(input),
                }
            }
            Err(e) => {
                warn!("LLM enhancement failed, using rule-based only: {e}");
                ScoringOutcome::HybridRuleOnly {
                    scores: rule.scores,
                    breakdown: rule.breakdown,
                }
            }
        }
    }

    fn cost(&self, input: &MatchInput<'_>) -> f64 {
        estimate_api_cost(
            input.resume_text,
            input.job_description,
            self.settings.cost_per_token,
        )
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::llm_client::LlmError;
    use crate::matching::extractor::FeatureExtractor;
    use crate::matching::models::{ComponentScore, EducationLevel, ScoringMethod};
    use crate::matching::taxonomy::SkillTaxonomy;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub(crate) const STRONG_RESUME: &str = "Software engineer with 5 years experience in Python, React. \
        Bachelor's degree in Computer Science.";
    pub(crate) const WEAK_RESUME: &str = "Barista with strong customer service. High school diploma.";
    pub(crate) const JOB: &str = "Hiring a Python and React engineer, 3 years experience, bachelor degree.";

    /// Counts calls; returns fixed scores or a transport failure.
    pub(crate) struct CountingRefiner {
        pub(crate) calls: AtomicUsize,
        scores: Option<ComponentScore>,
    }

    impl CountingRefiner {
        pub(crate) fn succeeding(overall: f64) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                scores: Some(ComponentScore {
                    overall,
                    skills: overall,
                    experience: overall,
                    education: overall,
                }),
            }
        }

        pub(crate) fn failing() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                scores: None,
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RefinementScorer for CountingRefiner {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn refine(&self, _: &str, _: &str) -> Result<ComponentScore, RefinementError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.scores
                .ok_or(RefinementError::Llm(LlmError::EmptyContent))
        }
    }

    pub(crate) fn scorer_with(refiner: Arc<dyn RefinementScorer>, default_mode: &str) -> HybridScorer {
        let taxonomy = Arc::new(SkillTaxonomy::builtin().unwrap());
        let extractor = FeatureExtractor::new(taxonomy).unwrap().with_current_year(2025);
        let rule = RuleScorer::new(extractor);
        HybridScorer::new(
            rule,
            refiner,
            ScoringSettings {
                default_mode: default_mode.to_string(),
                hybrid_threshold: 70.0,
                cost_per_token: 0.075 / 1_000_000.0,
            },
        )
    }

    fn input<'a>(resume: &'a str, mode: Option<&'a str>) -> MatchInput<'a> {
        MatchInput {
            resume_text: resume,
            job_description: JOB,
            mode_override: mode,
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_mode_prefers_override() {
        assert_eq!(resolve_mode(Some("llm_only"), "hybrid"), ScoringMode::LlmOnly);
        assert_eq!(resolve_mode(None, "hybrid"), ScoringMode::Hybrid);
        assert_eq!(resolve_mode(Some(" RULE_BASED "), "hybrid"), ScoringMode::RuleBased);
    }

    #[test]
    fn test_unknown_mode_falls_back_to_rule_based() {
        assert_eq!(resolve_mode(Some("quantum"), "hybrid"), ScoringMode::RuleBased);
        assert_eq!(resolve_mode(None, "bogus"), ScoringMode::RuleBased);
    }

    #[test]
    fn test_estimate_api_cost() {
        let cost = estimate_api_cost(&"a".repeat(3000), &"b".repeat(1000), 0.000_001);
        assert!((cost - 0.001).abs() < 1e-12);
        assert_eq!(estimate_api_cost("", "", 0.5), 0.0);
    }

    #[tokio::test]
    async fn test_rule_based_mode_never_calls_refiner() {
        let refiner = Arc::new(CountingRefiner::succeeding(90.0));
        let scorer = scorer_with(refiner.clone(), "rule_based");
        let result = scorer.calculate_match(input(STRONG_RESUME, None)).await;
        assert_eq!(result.scoring_method(), ScoringMethod::RuleBased);
        assert_eq!(result.api_cost(), 0.0);
        assert!(!result.llm_enhanced());
        assert!(result.breakdown().is_some());
        assert_eq!(refiner.calls(), 0);
    }

    #[tokio::test]
    async fn test_llm_only_mode_uses_refiner_scores_and_cost() {
        let refiner = Arc::new(CountingRefiner::succeeding(42.0));
        let scorer = scorer_with(refiner.clone(), "rule_based");
        let result = scorer
            .calculate_match(input(STRONG_RESUME, Some("llm_only")))
            .await;
        assert_eq!(result.scoring_method(), ScoringMethod::Llm);
        assert_eq!(result.scores().overall, 42.0);
        assert!(result.api_cost() > 0.0);
        assert_eq!(refiner.calls(), 1);
    }

    #[tokio::test]
    async fn test_llm_only_failure_degrades_to_rule_based() {
        let refiner = Arc::new(CountingRefiner::failing());
        let scorer = scorer_with(refiner.clone(), "llm_only");
        let result = scorer.calculate_match(input(STRONG_RESUME, None)).await;
        assert_eq!(result.scoring_method(), ScoringMethod::RuleBased);
        assert_eq!(result.api_cost(), 0.0);
        assert_eq!(refiner.calls(), 1);
    }

    #[tokio::test]
    async fn test_hybrid_below_threshold_skips_refiner() {
        let refiner = Arc::new(CountingRefiner::succeeding(95.0));
        let scorer = scorer_with(refiner.clone(), "hybrid");
        let result = scorer.calculate_match(input(WEAK_RESUME, None)).await;
        assert!(scorer.rule_scorer().score(WEAK_RESUME, JOB, None, None).scores.overall < 70.0);
        assert_eq!(result.scoring_method(), ScoringMethod::HybridRuleOnly);
        assert_eq!(result.api_cost(), 0.0);
        assert!(!result.llm_enhanced());
        assert_eq!(refiner.calls(), 0);
    }

    #[tokio::test]
    async fn test_hybrid_above_threshold_blends() {
        let refiner = Arc::new(CountingRefiner::succeeding(50.0));
        let scorer = scorer_with(refiner.clone(), "hybrid");
        let rule = scorer.rule_scorer().score(STRONG_RESUME, JOB, None, None).scores;
        assert!(rule.overall >= 70.0, "rule overall {}", rule.overall);

        let result = scorer.calculate_match(input(STRONG_RESUME, None)).await;
        assert_eq!(refiner.calls(), 1);
        assert_eq!(result.scoring_method(), ScoringMethod::Hybrid);
        assert!(result.llm_enhanced());
        assert!(result.api_cost() > 0.0);

        let expected = rule.overall * 0.6 + 50.0 * 0.4;
        assert!((result.scores().overall - expected).abs() < 0.01);
        match &result.outcome {
            ScoringOutcome::Hybrid {
                rule_score,
                llm_score,
                breakdown,
                ..
            } => {
                assert_eq!(rule_score.overall, rule.overall);
                assert_eq!(llm_score.overall, 50.0);
                assert!(breakdown.is_some());
            }
            other => panic!("expected hybrid outcome, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_hybrid_refiner_failure_returns_rule_only_without_cost() {
        let refiner = Arc::new(CountingRefiner::failing());
        let scorer = scorer_with(refiner.clone(), "hybrid");
        let rule = scorer.rule_scorer().score(STRONG_RESUME, JOB, None, None).scores;
        let result = scorer.calculate_match(input(STRONG_RESUME, None)).await;
        assert_eq!(refiner.calls(), 1);
        assert_eq!(result.scoring_method(), ScoringMethod::HybridRuleOnly);
        assert_eq!(result.api_cost(), 0.0);
        assert_eq!(result.scores(), &rule);
    }

    #[tokio::test]
    async fn test_unknown_override_scores_rule_based() {
        let refiner = Arc::new(CountingRefiner::succeeding(90.0));
        let scorer = scorer_with(refiner.clone(), "hybrid");
        let result = scorer
            .calculate_match(input(STRONG_RESUME, Some("premium")))
            .await;
        assert_eq!(result.scoring_method(), ScoringMethod::RuleBased);
        assert_eq!(refiner.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_resume_yields_neutral_result() {
        let refiner = Arc::new(CountingRefiner::succeeding(90.0));
        let scorer = scorer_with(refiner.clone(), "rule_based");
        let result = scorer.calculate_match(input("", None)).await;
        assert_eq!(result.scores(), &ComponentScore::NEUTRAL);
        assert!(result.breakdown().is_none());
    }

    #[tokio::test]
    async fn test_similarity_reported_with_requirements() {
        let refiner = Arc::new(CountingRefiner::failing());
        let scorer = scorer_with(refiner, "rule_based");
        let reqs = JobRequirements {
            required_skills: vec!["python".into()],
            required_education: EducationLevel::Bachelors,
            ..Default::default()
        };
        let result = scorer
            .calculate_match(MatchInput {
                resume_text: STRONG_RESUME,
                job_description: JOB,
                requirements: Some(&reqs),
                similarity: Some(0.8),
                mode_override: None,
            })
            .await;
        assert_eq!(result.semantic_similarity, Some(0.8));
        let plain = scorer.rule_scorer().score(STRONG_RESUME, JOB, Some(&reqs), None);
        assert_eq!(result.scores(), &plain.scores);
    }
}
