// Candidate/job matching engine.
// Implements: skill taxonomy, feature extraction, rule scoring, LLM refinement,
// hybrid orchestration, explanations, batch scoring.
// All LLM calls go through llm_client via the LlmProvider trait.

pub mod batch;
pub mod explanation;
pub mod extractor;
pub mod handlers;
pub mod hybrid;
pub mod models;
pub mod prompts;
pub mod refinement;
pub mod rule_scorer;
pub mod taxonomy;
