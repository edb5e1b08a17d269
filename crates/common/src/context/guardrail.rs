//! Guard-rail filter for "answer only from context" responses

use crate::FALLBACK_ANSWER;

/// Phrases (lowercase) that signal the model could not answer from context
pub const NO_ANSWER_PHRASES: &[&str] = &["no information", "not in context", "out of context"];

/// Normalise a generated answer.
///
/// Returns [`FALLBACK_ANSWER`] when `text` is blank, already the fallback, or
/// contains any [`NO_ANSWER_PHRASES`] entry (case-insensitive); otherwise
/// returns `text` unchanged. Idempotent.
pub fn apply_guard_rail(text: &str) -> String {
    if is_fallback(text) {
        FALLBACK_ANSWER.to_string()
    } else {
        text.to_string()
    }
}

/// Whether [`apply_guard_rail`] would replace `text` with the fallback
pub fn is_fallback(text: &str) -> bool {
    if text.trim().is_empty() || text == FALLBACK_ANSWER {
        return true;
    }

    let lowered = text.to_lowercase();
    NO_ANSWER_PHRASES.iter().any(|phrase| lowered.contains(phrase))
}
