//! Feature Extractor: pulls skills, years of experience and education level out of raw text.
//!
//! Skill and degree keywords are scanned with one Aho-Corasick automaton each. A hit counts
//! only when the characters on both sides are non-word characters (or the text boundary),
//! so "java" never fires inside "javascript" while "c++" and "node.js" still match.

use std::collections::BTreeSet;
use std::sync::{Arc, LazyLock};

use aho_corasick::{AhoCorasick, MatchKind};
use chrono::{Datelike, Utc};
use regex::Regex;
use thiserror::Error;

use crate::matching::models::{EducationLevel, ExtractedProfile};
use crate::matching::taxonomy::SkillTaxonomy;

#[derive(Debug, Error, PartialEq)]
pub enum ExtractionError {
    #[error("text is empty")]
    EmptyText,

    #[error("text contains no readable content")]
    NoReadableContent,

    #[error("failed to build keyword matcher: {0}")]
    Matcher(String),
}

/// "N years (of) experience", "N years in", "experience: N years", "minimum N years",
/// "at least N years". Each yields a candidate; the largest wins.
static YEARS_PHRASES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(\d+(?:\.\d+)?)\+?\s*(?:years?|yrs?)\s+(?:of\s+)?experience",
        r"(\d+(?:\.\d+)?)\+?\s*(?:years?|yrs?)\s+in\b",
        r"experience\s*[:\-]\s*(\d+(?:\.\d+)?)\+?\s*(?:years?|yrs?)",
        r"minimum\s+(?:of\s+)?(\d+(?:\.\d+)?)\+?\s*(?:years?|yrs?)",
        r"at\s+least\s+(\d+(?:\.\d+)?)\+?\s*(?:years?|yrs?)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static years pattern compiles"))
    .collect()
});

/// "2019-2023", "2015 – present", "2020 to current".
static DATE_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(19\d{2}|20\d{2})\s*(?:-|–|—|to)\s*(19\d{2}|20\d{2}|present|current)\b")
        .expect("static date range pattern compiles")
});

/// Degree keywords in strict precedence order, highest first.
///
/// Two-letter abbreviations that are also English words ("as", "be", "ma") are excluded.
const DEGREE_KEYWORDS: &[(EducationLevel, &[&str])] = &[
    (
        EducationLevel::Phd,
        &["phd", "ph.d", "doctorate", "doctoral", "doctor of philosophy"],
    ),
    (
        EducationLevel::Masters,
        &["masters", "master", "m.s", "msc", "m.sc", "mba", "m.b.a", "m.a", "m.tech", "mtech"],
    ),
    (
        EducationLevel::Bachelors,
        &[
            "bachelors", "bachelor", "b.s", "bs", "bsc", "b.sc", "b.a", "ba", "btech", "b.tech",
            "b.e", "undergraduate degree",
        ],
    ),
    (
        EducationLevel::Associates,
        &["associates", "associate degree", "associate's degree", "a.s", "a.a"],
    ),
    (EducationLevel::Diploma, &["diploma", "certificate"]),
];

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// True when the span `start..end` of `haystack` is bounded by non-word characters.
fn is_token_bounded(haystack: &str, start: usize, end: usize) -> bool {
    let before_ok = haystack[..start]
        .chars()
        .next_back()
        .map_or(true, |c| !is_word_char(c));
    let after_ok = haystack[end..]
        .chars()
        .next()
        .map_or(true, |c| !is_word_char(c));
    before_ok && after_ok
}

/// One automaton over many keywords, each tagged with a label.
#[derive(Debug, Clone)]
struct KeywordMatcher<T> {
    automaton: AhoCorasick,
    labels: Vec<T>,
}

impl<T> KeywordMatcher<T> {
    fn build<'a>(entries: impl IntoIterator<Item = (&'a str, T)>) -> Result<Self, ExtractionError> {
        let (patterns, labels): (Vec<&str>, Vec<T>) = entries.into_iter().unzip();
        // Standard semantics so overlapping forms ("react", "react.js") all report.
        let automaton = AhoCorasick::builder()
            .match_kind(MatchKind::Standard)
            .build(&patterns)
            .map_err(|e| ExtractionError::Matcher(e.to_string()))?;
        Ok(Self { automaton, labels })
    }

    /// Labels of every token-bounded hit. `lower` must already be lowercased.
    fn labels_in<'s>(&'s self, lower: &'s str) -> impl Iterator<Item = &'s T> + 's {
        self.automaton
            .find_overlapping_iter(lower)
            .filter(move |m| is_token_bounded(lower, m.start(), m.end()))
            .map(move |m| &self.labels[m.pattern().as_usize()])
    }
}

/// Stateless extractor over a shared taxonomy.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    taxonomy: Arc<SkillTaxonomy>,
    skills: KeywordMatcher<String>,
    /// Labels carry the precedence rank; lower wins.
    degrees: KeywordMatcher<(usize, EducationLevel)>,
    current_year: Option<i32>,
}

impl FeatureExtractor {
    /// Compiles the skill and degree automata from `taxonomy`.
    pub fn new(taxonomy: Arc<SkillTaxonomy>) -> Result<Self, ExtractionError> {
        let skills = KeywordMatcher::build(
            taxonomy
                .surface_forms()
                .map(|(surface, canonical)| (surface, canonical.to_string())),
        )?;
        let degrees = KeywordMatcher::build(DEGREE_KEYWORDS.iter().enumerate().flat_map(
            |(rank, (level, keywords))| keywords.iter().map(move |kw| (*kw, (rank, *level))),
        ))?;
        Ok(Self {
            taxonomy,
            skills,
            degrees,
            current_year: None,
        })
    }

    /// Pins the year "present"/"current" resolves to.
    #[cfg(test)]
    pub fn with_current_year(mut self, year: i32) -> Self {
        self.current_year = Some(year);
        self
    }

    pub fn taxonomy(&self) -> &SkillTaxonomy {
        &self.taxonomy
    }

    fn current_year(&self) -> i32 {
        self.current_year.unwrap_or_else(|| Utc::now().year())
    }

    /// Extracts a full profile, rejecting text with nothing to read.
    pub fn extract_profile(&self, text: &str) -> Result<ExtractedProfile, ExtractionError> {
        if text.trim().is_empty() {
            return Err(ExtractionError::EmptyText);
        }
        if !text.chars().any(char::is_alphanumeric) {
            return Err(ExtractionError::NoReadableContent);
        }
        Ok(ExtractedProfile {
            skills: self.extract_skills(text),
            experience_years: self.extract_years_of_experience(text),
            education_level: self.extract_education_level(text),
        })
    }

    /// Canonical skills mentioned anywhere in `text`.
    pub fn extract_skills(&self, text: &str) -> BTreeSet<String> {
        let lower = text.to_lowercase();
        self.skills.labels_in(&lower).cloned().collect()
    }

    /// max(largest phrase mention, sum of all date-range spans).
    pub fn extract_years_of_experience(&self, text: &str) -> f64 {
        let lower = text.to_lowercase();

        let phrase_max = YEARS_PHRASES
            .iter()
            .flat_map(|re| re.captures_iter(&lower))
            .filter_map(|caps| caps.get(1)?.as_str().parse::<f64>().ok())
            .fold(0.0_f64, f64::max);

        let current_year = self.current_year();
        let range_sum: f64 = DATE_RANGE
            .captures_iter(&lower)
            .filter_map(|caps| {
                let start: i32 = caps.get(1)?.as_str().parse().ok()?;
                let end = match caps.get(2)?.as_str() {
                    "present" | "current" => current_year,
                    year => year.parse().ok()?,
                };
                Some(f64::from((end - start).max(0)))
            })
            .sum();

        phrase_max.max(range_sum)
    }

    /// Highest education level with any keyword present; `None` when nothing matches.
    pub fn extract_education_level(&self, text: &str) -> EducationLevel {
        let lower = text.to_lowercase();
        self.degrees
            .labels_in(&lower)
            .min_by_key(|(rank, _)| *rank)
            .map(|(_, level)| *level)
            .unwrap_or(EducationLevel::None)
    }
}
