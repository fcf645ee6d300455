// Cross-cutting prompt fragments shared by every LLM-backed component.
// Component-specific prompts live next to the component (see matching/prompts.rs).

use std::sync::LazyLock;

use regex::{Captures, Regex};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{(\w+)\}").expect("static placeholder pattern compiles")
});

/// System prompt that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant \
    evaluating candidates for recruiters. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Maximum characters of each source text forwarded to the LLM.
pub const PROMPT_TEXT_LIMIT: usize = 2000;

/// Truncates `text` to `PROMPT_TEXT_LIMIT` characters on a char boundary.
pub fn truncate_for_prompt(text: &str) -> &str {
    match text.char_indices().nth(PROMPT_TEXT_LIMIT) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Substitutes `{name}` placeholders in a single pass, so placeholder-like text inside an
/// inserted value is left as is. Unknown names stay verbatim.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            values
                .iter()
                .find(|(name, _)| *name == &caps[1])
                .map_or_else(|| caps[0].to_string(), |(_, value)| value.to_string())
        })
        .into_owned()
}
