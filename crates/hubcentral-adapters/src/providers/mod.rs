//! Concrete [`crate::ProviderAdapter`] implementations.

pub mod openai_compat;
pub mod script;

pub use openai_compat::OpenAiCompatProvider;
pub use script::ScriptProvider;

/// Truncate `text` to at most `max_chars` characters.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
