//! Concrete [`crate::StorageAdapter`] implementations and the
//! [`StorageManager`] that fans out across them.

pub mod manager;
pub mod memory;
pub mod vault;

pub use manager::{SaveOutcome, StorageManager};
pub use memory::MemoryStorage;
pub use vault::VaultStorage;

use serde_json::Value;

/// Whether saved data asks to append to an existing body.
pub(crate) fn is_append(data: &Value) -> bool {
    data.get("mode").and_then(Value::as_str) == Some("append")
}

/// Render saved data as a markdown body.
///
/// A string `content` is used verbatim; anything else is wrapped in a JSON
/// code block under a title heading.
pub(crate) fn render_body(data: &Value) -> String {
    if let Some(content) = data.get("content").and_then(Value::as_str) {
        return content.to_string();
    }
    let title = data.get("title").and_then(Value::as_str).unwrap_or("Data");
    let pretty = serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string());
    format!(
        "# {title}\n\n**Created:** {}\n\n```json\n{pretty}\n```",
        chrono::Local::now().format("%Y-%m-%d %H:%M")
    )
}

/// Default path for data saved without one.
pub(crate) fn default_path() -> String {
    format!("Hub Central/data_{}.md", chrono::Local::now().format("%Y%m%d_%H%M%S"))
}
