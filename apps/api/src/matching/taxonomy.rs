//! Skill Normalizer: canonicalizes free-text skill mentions against a synonym table.
//!
//! The reverse index is built once at startup and shared read-only (`Arc<SkillTaxonomy>`).
//! A synonym claimed by two canonical skills is a configuration error surfaced at build time.

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use crate::matching::models::SkillMatch;

#[derive(Debug, Error, PartialEq)]
pub enum TaxonomyError {
    #[error("synonym '{synonym}' maps to both '{first}' and '{second}'")]
    ConflictingSynonym {
        synonym: String,
        first: String,
        second: String,
    },

    #[error("empty skill name in taxonomy")]
    EmptyName,
}

/// Built-in canonical skills and their surface forms.
///
/// Bare English words that collide with ordinary prose ("next", "rest", "es") are left out.
const DEFAULT_SKILLS: &[(&str, &[&str])] = &[
    // Programming languages
    ("javascript", &["js", "ecmascript", "es6", "es2015", "es2020"]),
    ("typescript", &["ts"]),
    ("python", &["python3", "py"]),
    ("java", &["java8", "java11", "java17", "jdk"]),
    ("c++", &["cpp", "cplusplus"]),
    ("c#", &["csharp", "c sharp"]),
    ("ruby", &["rb"]),
    ("go", &["golang"]),
    ("rust", &["rust-lang"]),
    ("php", &["php7", "php8"]),
    ("swift", &["swift5"]),
    ("kotlin", &["kt"]),
    // Frontend frameworks
    ("react", &["reactjs", "react.js", "react js"]),
    ("angular", &["angularjs", "angular2", "angular.js"]),
    ("vue", &["vuejs", "vue.js", "vue js"]),
    ("nextjs", &["next.js", "next js"]),
    ("svelte", &["sveltejs"]),
    // Backend frameworks
    ("nodejs", &["node", "node.js", "node js"]),
    ("express", &["expressjs", "express.js"]),
    ("django", &[]),
    ("flask", &[]),
    ("spring", &["spring boot", "springboot"]),
    ("fastapi", &["fast api"]),
    // Databases
    ("mongodb", &["mongo", "mongo db"]),
    ("postgresql", &["postgres", "psql"]),
    ("mysql", &["my sql"]),
    ("redis", &[]),
    ("elasticsearch", &["elastic search"]),
    // Cloud & DevOps
    ("aws", &["amazon web services"]),
    ("azure", &["microsoft azure"]),
    ("gcp", &["google cloud", "google cloud platform"]),
    ("docker", &["containerization"]),
    ("kubernetes", &["k8s"]),
    ("terraform", &[]),
    ("jenkins", &[]),
    // Testing
    ("jest", &[]),
    ("pytest", &["py.test"]),
    ("junit", &[]),
    ("selenium", &[]),
    // Other
    ("git", &["github", "gitlab", "version control"]),
    ("agile", &["scrum", "kanban"]),
    ("restapi", &["restful", "rest api", "restful api"]),
    ("graphql", &["graph ql"]),
    ("microservices", &["micro services"]),
    ("machine learning", &["ml", "deep learning"]),
    ("artificial intelligence", &["ai"]),
];

/// Lowercases, trims and collapses internal whitespace.
pub fn normalize_term(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Immutable mapping canonical skill ⇄ surface forms.
#[derive(Debug, Clone)]
pub struct SkillTaxonomy {
    canonical: BTreeMap<String, Vec<String>>,
    index: HashMap<String, String>,
}

impl SkillTaxonomy {
    /// Builds the taxonomy. Each canonical name is registered as its own synonym.
    pub fn new(entries: &[(&str, &[&str])]) -> Result<Self, TaxonomyError> {
        let mut canonical: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut index: HashMap<String, String> = HashMap::new();

        for (name, synonyms) in entries {
            let name = normalize_term(name);
            if name.is_empty() {
                return Err(TaxonomyError::EmptyName);
            }

            let forms = canonical.entry(name.clone()).or_default();
            for surface in std::iter::once(name.as_str()).chain(synonyms.iter().copied()) {
                let surface = normalize_term(surface);
                if surface.is_empty() {
                    return Err(TaxonomyError::EmptyName);
                }
                match index.get(&surface) {
                    Some(existing) if *existing != name => {
                        return Err(TaxonomyError::ConflictingSynonym {
                            synonym: surface,
                            first: existing.clone(),
                            second: name,
                        });
                    }
                    Some(_) => {}
                    None => {
                        index.insert(surface.clone(), name.clone());
                        forms.push(surface);
                    }
                }
            }
        }

        Ok(Self { canonical, index })
    }

    /// The built-in technology taxonomy.
    pub fn builtin() -> Result<Self, TaxonomyError> {
        Self::new(DEFAULT_SKILLS)
    }

    /// O(1) lookup after normalization.
    pub fn canonicalize(&self, raw_term: &str) -> Option<&str> {
        self.index.get(&normalize_term(raw_term)).map(String::as_str)
    }

    /// Canonical name, or the normalized term itself when the taxonomy doesn't know it.
    pub fn canonicalize_or_raw(&self, raw_term: &str) -> String {
        self.canonicalize(raw_term)
            .map(str::to_string)
            .unwrap_or_else(|| normalize_term(raw_term))
    }

    /// Every (surface form, canonical) pair, grouped by canonical name.
    pub fn surface_forms(&self) -> impl Iterator<Item = (&str, &str)> {
        self.canonical.iter().flat_map(|(canonical, forms)| {
            forms
                .iter()
                .map(move |form| (form.as_str(), canonical.as_str()))
        })
    }

    /// Number of canonical skills.
    pub fn len(&self) -> usize {
        self.canonical.len()
    }

    pub fn synonym_count(&self) -> usize {
        self.index.len()
    }

    /// Reports, for each job skill in order, whether any résumé skill canonicalizes to it.
    pub fn analyze_skill_overlap(
        &self,
        resume_skills: &[String],
        job_skills: &[String],
    ) -> Vec<SkillMatch> {
        let resume: std::collections::HashSet<String> = resume_skills
            .iter()
            .map(|s| self.canonicalize_or_raw(s))
            .collect();

        job_skills
            .iter()
            .map(|skill| SkillMatch {
                skill: skill.clone(),
                matched: resume.contains(&self.canonicalize_or_raw(skill)),
            })
            .collect()
    }
}
