//! Explanation Generator: strengths, gaps and recommendations behind a score.
//!
//! Two modes: an LLM narrative (parsed from free text) and a rule-based mode built from
//! extracted feature differences. A narrative that fails to arrive or parse degrades to
//! the rule-based mode. Lists are capped and never empty in either mode.

use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::llm_client::prompts::{fill_template, truncate_for_prompt, JSON_ONLY_SYSTEM};
use crate::llm_client::{find_json_object, LlmError, LlmProvider};
use crate::matching::extractor::FeatureExtractor;
use crate::matching::hybrid::estimate_api_cost;
use crate::matching::models::{ExplanationMethod, ExtractedProfile, MatchExplanation};
use crate::matching::prompts::EXPLANATION_PROMPT_TEMPLATE;

const MAX_STRENGTHS: usize = 5;
const MAX_WEAKNESSES: usize = 5;
const MAX_RECOMMENDATIONS: usize = 3;
/// Skills listed inline in a single sentence.
const MAX_LISTED_SKILLS: usize = 5;
const MAX_LISTED_EXTRAS: usize = 3;

const NO_STRENGTHS: &str = "No significant strengths identified";
const NO_GAPS: &str = "No significant gaps identified";
const NO_RECOMMENDATIONS: &str = "Review the candidate manually";

#[derive(Debug, Error)]
pub enum NarrativeError {
    #[error("LLM call failed: {0}")]
    Llm(#[from] LlmError),

    #[error("narrative contained no JSON object")]
    NoJson,

    #[error("narrative JSON was malformed: {0}")]
    Malformed(String),

    #[error("narrative had no summary or no content")]
    Incomplete,
}

#[derive(Debug, Deserialize)]
struct Narrative {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default, alias = "gaps")]
    weaknesses: Vec<String>,
    #[serde(default)]
    recommendations: Vec<String>,
}

/// The three lists of a parsed narrative plus its summary, already capped.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedNarrative {
    pub summary: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Greedy `{...}` extraction; `gaps` is accepted for `weaknesses`.
pub fn parse_llm_explanation(text: &str) -> Result<ParsedNarrative, NarrativeError> {
    let json = find_json_object(text, false).ok_or(NarrativeError::NoJson)?;
    let narrative: Narrative =
        serde_json::from_str(json).map_err(|e| NarrativeError::Malformed(e.to_string()))?;

    let summary = narrative.summary.trim().to_string();
    let strengths = clean(narrative.strengths, MAX_STRENGTHS);
    let weaknesses = clean(narrative.weaknesses, MAX_WEAKNESSES);
    let recommendations = clean(narrative.recommendations, MAX_RECOMMENDATIONS);

    if summary.is_empty()
        || (strengths.is_empty() && weaknesses.is_empty() && recommendations.is_empty())
    {
        return Err(NarrativeError::Incomplete);
    }

    Ok(ParsedNarrative {
        summary,
        strengths,
        weaknesses,
        recommendations,
    })
}

fn clean(items: Vec<String>, cap: usize) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .take(cap)
        .collect()
}

fn or_placeholder(mut items: Vec<String>, cap: usize, placeholder: &str) -> Vec<String> {
    items.truncate(cap);
    if items.is_empty() {
        items.push(placeholder.to_string());
    }
    items
}

/// "5" for whole numbers, "2.5" otherwise.
fn fmt_years(years: f64) -> String {
    if years.fract() == 0.0 {
        format!("{years:.0}")
    } else {
        format!("{years:.1}")
    }
}

fn joined<'a>(skills: impl Iterator<Item = &'a String>, limit: usize) -> String {
    skills.take(limit).map(String::as_str).collect::<Vec<_>>().join(", ")
}

pub fn summary_for(overall: f64) -> String {
    if overall >= 80.0 {
        format!("Excellent match ({overall:.0}%). Candidate strongly aligns with the job requirements.")
    } else if overall >= 60.0 {
        format!("Good match ({overall:.0}%). Candidate meets most requirements with some gaps.")
    } else if overall >= 40.0 {
        format!("Moderate match ({overall:.0}%). Candidate has relevant background but significant gaps.")
    } else {
        format!("Low match ({overall:.0}%). Candidate lacks several key requirements.")
    }
}

pub fn recommendation_for(overall: f64) -> &'static str {
    if overall >= 75.0 {
        "Strong candidate - recommend for interview"
    } else if overall >= 60.0 {
        "Moderate fit - consider for a screening call"
    } else {
        "Review other candidates with stronger matches"
    }
}

pub struct ExplanationGenerator {
    extractor: FeatureExtractor,
    llm: Arc<dyn LlmProvider>,
    cost_per_token: f64,
}

impl ExplanationGenerator {
    pub fn new(extractor: FeatureExtractor, llm: Arc<dyn LlmProvider>, cost_per_token: f64) -> Self {
        Self {
            extractor,
            llm,
            cost_per_token,
        }
    }

    pub async fn generate_explanation(
        &self,
        resume_text: &str,
        job_description: &str,
        overall_score: f64,
        use_llm: bool,
    ) -> MatchExplanation {
        if use_llm {
            match self.narrate(resume_text, job_description, overall_score).await {
                Ok(narrative) => {
                    return MatchExplanation {
                        summary: narrative.summary,
                        strengths: or_placeholder(narrative.strengths, MAX_STRENGTHS, NO_STRENGTHS),
                        weaknesses: or_placeholder(narrative.weaknesses, MAX_WEAKNESSES, NO_GAPS),
                        recommendations: or_placeholder(
                            narrative.recommendations,
                            MAX_RECOMMENDATIONS,
                            NO_RECOMMENDATIONS,
                        ),
                        method: ExplanationMethod::Llm,
                        api_cost: estimate_api_cost(resume_text, job_description, self.cost_per_token),
                    };
                }
                Err(e) => warn!("LLM explanation failed, using rule-based: {e}"),
            }
        }

        self.rule_based(resume_text, job_description, overall_score)
    }

    async fn narrate(
        &self,
        resume_text: &str,
        job_description: &str,
        overall_score: f64,
    ) -> Result<ParsedNarrative, NarrativeError> {
        let score = format!("{overall_score:.0}");
        let prompt = fill_template(
            EXPLANATION_PROMPT_TEMPLATE,
            &[
                ("resume_text", truncate_for_prompt(resume_text)),
                ("job_description", truncate_for_prompt(job_description)),
                ("overall_score", score.as_str()),
            ],
        );

        let response = self.llm.complete(&prompt, JSON_ONLY_SYSTEM).await?;
        parse_llm_explanation(&response)
    }

    /// Templated sentences from the skill, experience and education differences.
    pub fn rule_based(
        &self,
        resume_text: &str,
        job_description: &str,
        overall_score: f64,
    ) -> MatchExplanation {
        let resume = self.profile_or_empty(resume_text);
        let job = self.profile_or_empty(job_description);

        let matched: Vec<&String> = resume.skills.intersection(&job.skills).collect();
        let missing: Vec<&String> = job.skills.difference(&resume.skills).collect();
        let extra: Vec<&String> = resume.skills.difference(&job.skills).collect();

        let mut strengths = Vec::new();
        let mut weaknesses = Vec::new();
        let mut recommendations = vec![recommendation_for(overall_score).to_string()];

        if !matched.is_empty() {
            strengths.push(format!(
                "Has {} of {} required skills: {}",
                matched.len(),
                job.skills.len(),
                joined(matched.iter().copied(), MAX_LISTED_SKILLS)
            ));
        }
        if !missing.is_empty() {
            weaknesses.push(format!(
                "Missing key skills: {}",
                joined(missing.iter().copied(), MAX_LISTED_SKILLS)
            ));
            recommendations.push(format!(
                "Probe for experience with: {}",
                joined(missing.iter().copied(), MAX_LISTED_EXTRAS)
            ));
        }

        let (have, need) = (resume.experience_years, job.experience_years);
        if need > 0.0 && have < need {
            weaknesses.push(format!(
                "Experience gap: {} years below the {}-year requirement",
                fmt_years(need - have),
                fmt_years(need)
            ));
            recommendations.push("Evaluate learning ability and growth potential".to_string());
        } else if have > 0.0 {
            strengths.push(format!("{} years of relevant experience", fmt_years(have)));
        }

        let (have_edu, need_edu) = (resume.education_level, job.education_level);
        if need_edu.rank() > 0 {
            if have_edu.meets(need_edu) {
                strengths.push(format!(
                    "Education ({}) meets the {} requirement",
                    have_edu.as_str(),
                    need_edu.as_str()
                ));
            } else {
                weaknesses.push(format!(
                    "Education level ({}) is below the {} requirement",
                    have_edu.as_str(),
                    need_edu.as_str()
                ));
            }
        }

        if !extra.is_empty() {
            strengths.push(format!(
                "Additional skills: {}",
                joined(extra.iter().copied(), MAX_LISTED_EXTRAS)
            ));
        }
        if overall_score < 40.0 {
            weaknesses.push("Overall match suggests limited qualification for the role".to_string());
        }

        debug!(
            "Rule-based explanation: {} strengths, {} gaps",
            strengths.len(),
            weaknesses.len()
        );

        MatchExplanation {
            summary: summary_for(overall_score),
            strengths: or_placeholder(strengths, MAX_STRENGTHS, NO_STRENGTHS),
            weaknesses: or_placeholder(weaknesses, MAX_WEAKNESSES, NO_GAPS),
            recommendations: or_placeholder(recommendations, MAX_RECOMMENDATIONS, NO_RECOMMENDATIONS),
            method: ExplanationMethod::RuleBased,
            api_cost: 0.0,
        }
    }

    fn profile_or_empty(&self, text: &str) -> ExtractedProfile {
        self.extractor.extract_profile(text).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::refinement::tests::ScriptedLlm;
    use crate::matching::taxonomy::SkillTaxonomy;

    const RESUME: &str = "Backend developer, 2 years experience with Python and Docker. \
        Bachelor of Science.";
    const JOB: &str = "Looking for Python, Kubernetes and AWS skills. Minimum 5 years. Master's degree.";

    fn generator(llm: Arc<ScriptedLlm>) -> ExplanationGenerator {
        let taxonomy = Arc::new(SkillTaxonomy::builtin().unwrap());
        ExplanationGenerator::new(
            FeatureExtractor::new(taxonomy).unwrap().with_current_year(2025),
            llm,
            0.000_001,
        )
    }

    #[test]
    fn test_summary_thresholds() {
        assert!(summary_for(80.0).starts_with("Excellent"));
        assert!(summary_for(79.99).starts_with("Good"));
        assert!(summary_for(60.0).starts_with("Good"));
        assert!(summary_for(40.0).starts_with("Moderate"));
        assert!(summary_for(39.9).starts_with("Low"));
    }

    #[test]
    fn test_recommendation_thresholds() {
        assert!(recommendation_for(75.0).contains("recommend for interview"));
        assert!(recommendation_for(60.0).contains("screening"));
        assert!(recommendation_for(59.0).contains("other candidates"));
    }

    #[test]
    fn test_parse_narrative_accepts_gaps_alias() {
        let parsed = parse_llm_explanation(
            r#"Here: {"summary": "Solid fit", "strengths": ["Python"], "gaps": ["No AWS"], "recommendations": []}"#,
        )
        .unwrap();
        assert_eq!(parsed.summary, "Solid fit");
        assert_eq!(parsed.weaknesses, vec!["No AWS".to_string()]);
        assert!(parsed.recommendations.is_empty());
    }

    #[test]
    fn test_parse_narrative_caps_lists() {
        let parsed = parse_llm_explanation(
            r#"{"summary": "s", "strengths": ["1","2","3","4","5","6","7"], "weaknesses": [], "recommendations": ["a","b","c","d"]}"#,
        )
        .unwrap();
        assert_eq!(parsed.strengths.len(), 5);
        assert_eq!(parsed.recommendations.len(), 3);
    }

    #[test]
    fn test_parse_narrative_without_summary_is_incomplete() {
        assert!(matches!(
            parse_llm_explanation(r#"{"strengths": ["x"]}"#),
            Err(NarrativeError::Incomplete)
        ));
        assert!(matches!(
            parse_llm_explanation(r#"{"summary": "ok", "strengths": [" "]}"#),
            Err(NarrativeError::Incomplete)
        ));
        assert!(matches!(
            parse_llm_explanation("no json here"),
            Err(NarrativeError::NoJson)
        ));
    }

    #[test]
    fn test_rule_based_lists_gaps() {
        let llm = Arc::new(ScriptedLlm::replying("unused"));
        let explanation = generator(llm.clone()).rule_based(RESUME, JOB, 35.0);

        assert_eq!(explanation.method, ExplanationMethod::RuleBased);
        assert_eq!(explanation.api_cost, 0.0);
        assert!(explanation.summary.starts_with("Low match (35%)"));
        assert!(explanation.strengths[0].contains("python"));
        assert!(explanation
            .weaknesses
            .iter()
            .any(|w| w.starts_with("Missing key skills") && w.contains("kubernetes") && w.contains("aws")));
        assert!(explanation
            .weaknesses
            .iter()
            .any(|w| w == "Experience gap: 3 years below the 5-year requirement"));
        assert!(explanation
            .weaknesses
            .iter()
            .any(|w| w.contains("bachelors") && w.contains("masters")));
        assert_eq!(
            explanation.recommendations[0],
            "Review other candidates with stronger matches"
        );
        assert!(explanation.recommendations.len() <= 3);
        assert_eq!(llm.calls(), 0);
    }

    #[test]
    fn test_rule_based_never_returns_empty_lists() {
        let llm = Arc::new(ScriptedLlm::replying("unused"));
        let explanation = generator(llm).rule_based("", "", 90.0);
        assert_eq!(explanation.strengths, vec![NO_STRENGTHS.to_string()]);
        assert_eq!(explanation.weaknesses, vec![NO_GAPS.to_string()]);
        assert_eq!(explanation.recommendations.len(), 1);
        assert!(explanation.summary.starts_with("Excellent"));
    }

    #[tokio::test]
    async fn test_llm_narrative_used_when_parsable() {
        let llm = Arc::new(ScriptedLlm::replying(
            r#"{"summary": "Great fit", "strengths": ["Python depth"], "weaknesses": [], "recommendations": ["Interview"]}"#,
        ));
        let explanation = generator(llm.clone())
            .generate_explanation(RESUME, JOB, 72.0, true)
            .await;
        assert_eq!(explanation.method, ExplanationMethod::Llm);
        assert_eq!(explanation.summary, "Great fit");
        assert_eq!(explanation.weaknesses, vec![NO_GAPS.to_string()]);
        assert!(explanation.api_cost > 0.0);
        assert!(llm.prompts.lock().unwrap()[0].contains("Match Score: 72%"));
    }

    #[tokio::test]
    async fn test_score_placeholder_in_resume_is_not_substituted() {
        let llm = Arc::new(ScriptedLlm::replying("no json"));
        generator(llm.clone())
            .generate_explanation("Scored {overall_score} on a quiz.", JOB, 72.0, true)
            .await;

        let prompt = &llm.prompts.lock().unwrap()[0];
        assert!(prompt.contains("Scored {overall_score} on a quiz."));
        assert!(prompt.contains("Match Score: 72%"));
    }

    #[tokio::test]
    async fn test_llm_failure_degrades_to_rule_based() {
        let llm = Arc::new(ScriptedLlm::failing("overloaded"));
        let explanation = generator(llm.clone())
            .generate_explanation(RESUME, JOB, 65.0, true)
            .await;
        assert_eq!(explanation.method, ExplanationMethod::RuleBased);
        assert_eq!(explanation.api_cost, 0.0);
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_unparsable_narrative_degrades_to_rule_based() {
        let llm = Arc::new(ScriptedLlm::replying("The candidate seems fine overall."));
        let explanation = generator(llm)
            .generate_explanation(RESUME, JOB, 65.0, true)
            .await;
        assert_eq!(explanation.method, ExplanationMethod::RuleBased);
        assert!(explanation.summary.starts_with("Good match"));
    }

    #[tokio::test]
    async fn test_use_llm_false_skips_llm() {
        let llm = Arc::new(ScriptedLlm::replying("{}"));
        generator(llm.clone())
            .generate_explanation(RESUME, JOB, 65.0, false)
            .await;
        assert_eq!(llm.calls(), 0);
    }
}
