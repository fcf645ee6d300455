//! Rule Scorer: deterministic skills/experience/education scoring, no external calls.
//!
//! Weights: skills 50%, experience 30%, education 20%.
//! Extraction failures never escape `score`: the neutral 50/50/50/50 default is returned.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::matching::extractor::{ExtractionError, FeatureExtractor};
use crate::matching::models::{
    round2, ComponentScore, EducationBreakdown, EducationLevel, ExperienceBreakdown,
    ExtractedProfile, JobRequirements, MatchBreakdown, RuleScore, SkillBreakdown,
};

#[derive(Debug, Clone, Copy)]
pub struct ScoringWeights {
    pub skills: f64,
    pub experience: f64,
    pub education: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            skills: 0.50,
            experience: 0.30,
            education: 0.20,
        }
    }
}

/// Share of the overall score given to embedding similarity on the text-only path.
const SIMILARITY_WEIGHT: f64 = 0.15;

pub fn skills_score(resume: &BTreeSet<String>, job: &BTreeSet<String>) -> f64 {
    if job.is_empty() {
        return 85.0;
    }
    if resume.is_empty() {
        return 20.0;
    }

    let matched = resume.intersection(job).count();
    let base = matched as f64 / job.len() as f64 * 100.0;
    let bonus = if resume.len() > job.len() {
        ((resume.len() - job.len()) as f64 * 2.0).min(10.0)
    } else {
        0.0
    };

    debug!(
        "Skills: {}/{} matched, {} resume skills",
        matched,
        job.len(),
        resume.len()
    );
    (base + bonus).min(100.0)
}

pub fn experience_score(resume_years: f64, required_years: f64) -> f64 {
    if required_years <= 0.0 {
        return 80.0;
    }
    if resume_years <= 0.0 {
        return 30.0;
    }

    let score = if resume_years >= required_years {
        85.0 + 15.0 * (required_years / resume_years)
    } else {
        85.0 * (resume_years / required_years)
    };
    score.min(100.0)
}

pub fn education_score(resume: EducationLevel, required: EducationLevel) -> f64 {
    if required.rank() == 0 {
        return 80.0;
    }
    if resume.rank() == 0 {
        return 40.0;
    }
    if resume.meets(required) {
        return 100.0;
    }
    let gap = f64::from(required.rank() - resume.rank());
    (100.0 - 20.0 * gap).max(40.0)
}

/// Deterministic scorer over a `FeatureExtractor`.
#[derive(Debug, Clone)]
pub struct RuleScorer {
    extractor: FeatureExtractor,
    weights: ScoringWeights,
}

impl RuleScorer {
    pub fn new(extractor: FeatureExtractor) -> Self {
        Self {
            extractor,
            weights: ScoringWeights::default(),
        }
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    /// Never fails: extraction errors yield the neutral default.
    ///
    /// Without explicit `requirements` the job profile comes from `job_text` alone and a
    /// supplied `similarity` is blended into the overall score at 15%. With requirements
    /// the similarity is left out of the score and reported separately by the caller.
    pub fn score(
        &self,
        resume_text: &str,
        job_text: &str,
        requirements: Option<&JobRequirements>,
        similarity: Option<f64>,
    ) -> RuleScore {
        match self.try_score(resume_text, job_text, requirements, similarity) {
            Ok(score) => score,
            Err(e) => {
                warn!("Rule-based scoring fell back to neutral defaults: {e}");
                RuleScore::neutral()
            }
        }
    }

    pub fn try_score(
        &self,
        resume_text: &str,
        job_text: &str,
        requirements: Option<&JobRequirements>,
        similarity: Option<f64>,
    ) -> Result<RuleScore, ExtractionError> {
        let resume = self.extractor.extract_profile(resume_text)?;
        let job = match requirements {
            Some(reqs) => self.job_profile_with_requirements(job_text, reqs),
            None => self.extractor.extract_profile(job_text)?,
        };

        let skills = skills_score(&resume.skills, &job.skills);
        let experience = experience_score(resume.experience_years, job.experience_years);
        let education = education_score(resume.education_level, job.education_level);

        let mut overall = skills * self.weights.skills
            + experience * self.weights.experience
            + education * self.weights.education;

        if requirements.is_none() {
            if let Some(sim) = similarity {
                let sim = if sim.is_nan() { 0.0 } else { sim.clamp(0.0, 1.0) };
                overall = overall * (1.0 - SIMILARITY_WEIGHT) + sim * 100.0 * SIMILARITY_WEIGHT;
            }
        }

        let scores = ComponentScore {
            overall,
            skills,
            experience,
            education,
        }
        .normalized();

        info!(
            "Rule-based scores - Overall: {:.1}, Skills: {:.1}, Experience: {:.1}, Education: {:.1}",
            scores.overall, scores.skills, scores.experience, scores.education
        );

        Ok(RuleScore {
            scores,
            breakdown: Some(build_breakdown(&resume, &job)),
        })
    }

    /// Job profile from explicit requirements, filling the gaps from the job text.
    /// Unreadable job text contributes nothing; the requirements still apply.
    fn job_profile_with_requirements(
        &self,
        job_text: &str,
        reqs: &JobRequirements,
    ) -> ExtractedProfile {
        let mut job = self.extractor.extract_profile(job_text).unwrap_or_default();

        let taxonomy = self.extractor.taxonomy();
        for skill in reqs.required_skills.iter().chain(&reqs.preferred_skills) {
            let canonical = taxonomy.canonicalize_or_raw(skill);
            if !canonical.is_empty() {
                job.skills.insert(canonical);
            }
        }

        if reqs.required_experience_years > 0.0 {
            job.experience_years = reqs.required_experience_years;
        }
        if reqs.required_education != EducationLevel::None {
            job.education_level = reqs.required_education;
        }
        job
    }
}

fn build_breakdown(resume: &ExtractedProfile, job: &ExtractedProfile) -> MatchBreakdown {
    let matched: Vec<String> = resume.skills.intersection(&job.skills).cloned().collect();
    let missing: Vec<String> = job.skills.difference(&resume.skills).cloned().collect();
    let match_percentage = if job.skills.is_empty() {
        100.0
    } else {
        round2(matched.len() as f64 / job.skills.len() as f64 * 100.0)
    };

    MatchBreakdown {
        skills: SkillBreakdown {
            matched,
            missing,
            resume_skills: resume.skills.iter().cloned().collect(),
            match_percentage,
        },
        experience: ExperienceBreakdown {
            resume_years: resume.experience_years,
            required_years: job.experience_years,
            meets_requirement: resume.experience_years >= job.experience_years,
        },
        education: EducationBreakdown {
            resume_level: resume.education_level,
            required_level: job.education_level,
            meets_requirement: resume.education_level.meets(job.education_level),
        },
    }
}
