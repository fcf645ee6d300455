//! Value types shared by the scorers, the orchestrator and the explanation generator.
//!
//! Everything here is request-scoped: built once per scoring call, never mutated,
//! dropped when the response is written.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Highest completed education level, ordered by rank.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EducationLevel {
    #[default]
    None,
    Diploma,
    #[serde(alias = "associate")]
    Associates,
    #[serde(alias = "bachelor")]
    Bachelors,
    #[serde(alias = "master")]
    Masters,
    #[serde(alias = "doctorate")]
    Phd,
}

impl EducationLevel {
    /// none=0, diploma=1, associates=2, bachelors=3, masters=4, phd=5
    pub fn rank(self) -> u8 {
        match self {
            EducationLevel::None => 0,
            EducationLevel::Diploma => 1,
            EducationLevel::Associates => 2,
            EducationLevel::Bachelors => 3,
            EducationLevel::Masters => 4,
            EducationLevel::Phd => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EducationLevel::None => "none",
            EducationLevel::Diploma => "diploma",
            EducationLevel::Associates => "associates",
            EducationLevel::Bachelors => "bachelors",
            EducationLevel::Masters => "masters",
            EducationLevel::Phd => "phd",
        }
    }

    pub fn meets(self, required: EducationLevel) -> bool {
        self.rank() >= required.rank()
    }
}

/// Features pulled out of one free-text document.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractedProfile {
    pub skills: BTreeSet<String>,
    pub experience_years: f64,
    pub education_level: EducationLevel,
}

/// Explicit job requirements supplied alongside the job description.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct JobRequirements {
    pub required_skills: Vec<String>,
    pub preferred_skills: Vec<String>,
    /// 0 means "derive from the job description".
    pub required_experience_years: f64,
    /// `none` means "derive from the job description".
    pub required_education: EducationLevel,
}

/// One scorer's verdict. Each field is in [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentScore {
    pub overall: f64,
    pub skills: f64,
    pub experience: f64,
    pub education: f64,
}

impl ComponentScore {
    pub const NEUTRAL: ComponentScore = ComponentScore {
        overall: 50.0,
        skills: 50.0,
        experience: 50.0,
        education: 50.0,
    };

    /// Clamps every component into [0, 100] (NaN becomes 0) and rounds to 2 decimals.
    pub fn normalized(self) -> Self {
        Self {
            overall: clamp_score(self.overall),
            skills: clamp_score(self.skills),
            experience: clamp_score(self.experience),
            education: clamp_score(self.education),
        }
    }

    /// Per-component `self * self_weight + other * (1 - self_weight)`.
    pub fn blend(&self, other: &ComponentScore, self_weight: f64) -> ComponentScore {
        let mix = |a: f64, b: f64| a * self_weight + b * (1.0 - self_weight);
        ComponentScore {
            overall: mix(self.overall, other.overall),
            skills: mix(self.skills, other.skills),
            experience: mix(self.experience, other.experience),
            education: mix(self.education, other.education),
        }
        .normalized()
    }
}

pub fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    round2(value.clamp(0.0, 100.0))
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillBreakdown {
    pub matched: Vec<String>,
    pub missing: Vec<String>,
    pub resume_skills: Vec<String>,
    pub match_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperienceBreakdown {
    pub resume_years: f64,
    pub required_years: f64,
    pub meets_requirement: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EducationBreakdown {
    pub resume_level: EducationLevel,
    pub required_level: EducationLevel,
    pub meets_requirement: bool,
}

/// Rule-derived detail explaining a score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchBreakdown {
    pub skills: SkillBreakdown,
    pub experience: ExperienceBreakdown,
    pub education: EducationBreakdown,
}

/// Output of the rule scorer. `breakdown` is absent when the neutral default was returned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuleScore {
    pub scores: ComponentScore,
    pub breakdown: Option<MatchBreakdown>,
}

impl RuleScore {
    pub fn neutral() -> Self {
        Self {
            scores: ComponentScore::NEUTRAL,
            breakdown: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMethod {
    RuleBased,
    Llm,
    Hybrid,
    HybridRuleOnly,
}

impl ScoringMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            ScoringMethod::RuleBased => "rule_based",
            ScoringMethod::Llm => "llm",
            ScoringMethod::Hybrid => "hybrid",
            ScoringMethod::HybridRuleOnly => "hybrid_rule_only",
        }
    }
}

/// Which scorer(s) produced a result, tagged by `scoring_method`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "scoring_method", rename_all = "snake_case")]
pub enum ScoringOutcome {
    RuleBased {
        scores: ComponentScore,
        breakdown: Option<MatchBreakdown>,
    },
    Llm {
        scores: ComponentScore,
        api_cost: f64,
    },
    Hybrid {
        scores: ComponentScore,
        rule_score: ComponentScore,
        llm_score: ComponentScore,
        breakdown: Option<MatchBreakdown>,
        api_cost: f64,
    },
    HybridRuleOnly {
        scores: ComponentScore,
        breakdown: Option<MatchBreakdown>,
    },
}

/// Final product of one `calculate_match` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    #[serde(flatten)]
    pub outcome: ScoringOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_similarity: Option<f64>,
}

impl MatchResult {
    pub fn scores(&self) -> &ComponentScore {
        match &self.outcome {
            ScoringOutcome::RuleBased { scores, .. }
            | ScoringOutcome::Llm { scores, .. }
            | ScoringOutcome::Hybrid { scores, .. }
            | ScoringOutcome::HybridRuleOnly { scores, .. } => scores,
        }
    }

    pub fn scoring_method(&self) -> ScoringMethod {
        match self.outcome {
            ScoringOutcome::RuleBased { .. } => ScoringMethod::RuleBased,
            ScoringOutcome::Llm { .. } => ScoringMethod::Llm,
            ScoringOutcome::Hybrid { .. } => ScoringMethod::Hybrid,
            ScoringOutcome::HybridRuleOnly { .. } => ScoringMethod::HybridRuleOnly,
        }
    }

    /// True only when a blended LLM refinement contributed to the scores.
    pub fn llm_enhanced(&self) -> bool {
        matches!(self.outcome, ScoringOutcome::Hybrid { .. })
    }

    pub fn api_cost(&self) -> f64 {
        match self.outcome {
            ScoringOutcome::Llm { api_cost, .. } | ScoringOutcome::Hybrid { api_cost, .. } => {
                api_cost
            }
            _ => 0.0,
        }
    }

    pub fn breakdown(&self) -> Option<&MatchBreakdown> {
        match &self.outcome {
            ScoringOutcome::RuleBased { breakdown, .. }
            | ScoringOutcome::Hybrid { breakdown, .. }
            | ScoringOutcome::HybridRuleOnly { breakdown, .. } => breakdown.as_ref(),
            ScoringOutcome::Llm { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplanationMethod {
    Llm,
    RuleBased,
}

/// Human-readable reasoning behind a score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchExplanation {
    pub summary: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recommendations: Vec<String>,
    pub method: ExplanationMethod,
    pub api_cost: f64,
}

/// Whether one required skill is covered by the résumé.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillMatch {
    pub skill: String,
    pub matched: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_education_rank_ordering() {
        assert!(EducationLevel::Phd > EducationLevel::Masters);
        assert!(EducationLevel::Bachelors.meets(EducationLevel::Associates));
        assert!(!EducationLevel::Diploma.meets(EducationLevel::Bachelors));
        assert_eq!(EducationLevel::None.rank(), 0);
        assert_eq!(EducationLevel::Phd.rank(), 5);
    }

    #[test]
    fn test_education_level_deserializes_aliases() {
        let level: EducationLevel = serde_json::from_str(r#""bachelor""#).unwrap();
        assert_eq!(level, EducationLevel::Bachelors);
        let level: EducationLevel = serde_json::from_str(r#""phd""#).unwrap();
        assert_eq!(level, EducationLevel::Phd);
    }

    #[test]
    fn test_normalized_clamps_and_rounds() {
        let score = ComponentScore {
            overall: 150.0,
            skills: -3.0,
            experience: 66.666_666,
            education: f64::NAN,
        }
        .normalized();
        assert_eq!(score.overall, 100.0);
        assert_eq!(score.skills, 0.0);
        assert_eq!(score.experience, 66.67);
        assert_eq!(score.education, 0.0);
    }

    #[test]
    fn test_blend_sixty_forty() {
        let rule = ComponentScore {
            overall: 80.0,
            skills: 100.0,
            experience: 60.0,
            education: 50.0,
        };
        let llm = ComponentScore {
            overall: 60.0,
            skills: 50.0,
            experience: 100.0,
            education: 100.0,
        };
        let blended = rule.blend(&llm, 0.6);
        assert_eq!(blended.overall, 72.0);
        assert_eq!(blended.skills, 80.0);
        assert_eq!(blended.experience, 76.0);
        assert_eq!(blended.education, 70.0);
    }

    #[test]
    fn test_outcome_serializes_with_method_tag() {
        let result = MatchResult {
            outcome: ScoringOutcome::HybridRuleOnly {
                scores: ComponentScore::NEUTRAL,
                breakdown: None,
            },
            semantic_similarity: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["scoring_method"], "hybrid_rule_only");
        assert_eq!(json["scores"]["overall"], 50.0);
        assert!(json.get("semantic_similarity").is_none());
    }

    #[test]
    fn test_match_result_accessors() {
        let result = MatchResult {
            outcome: ScoringOutcome::Llm {
                scores: ComponentScore::NEUTRAL,
                api_cost: 0.5,
            },
            semantic_similarity: Some(0.7),
        };
        assert_eq!(result.scoring_method(), ScoringMethod::Llm);
        assert!(!result.llm_enhanced());
        assert_eq!(result.api_cost(), 0.5);
        assert!(result.breakdown().is_none());
    }
}
