//! Units of routed work.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::category::Category;
use crate::provider::Provider;

/// Outcome of one provider attempt within a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    pub provider: Provider,
    pub success: bool,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A prompt plus its chosen provider ordering, and once executed, the
/// outcome.
///
/// `provider_used` is `Some` exactly when `success` is true.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub category: Category,
    pub prompt: String,
    pub context: Value,
    pub candidate_providers: Vec<Provider>,
    /// Per-attempt timeout, in seconds.
    pub timeout_secs: u64,
    pub created_at: DateTime<Utc>,

    pub result: Option<String>,
    pub provider_used: Option<Provider>,
    /// Wall-clock time spent in `execute`, across all attempts.
    pub elapsed_ms: u64,
    pub success: bool,
    pub error: Option<String>,
    pub attempts: Vec<Attempt>,
}

impl Task {
    /// Create an unexecuted task with an explicit candidate list.
    pub fn new(
        prompt: impl Into<String>,
        category: Category,
        candidate_providers: Vec<Provider>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            category,
            prompt: prompt.into(),
            context: Value::Object(serde_json::Map::new()),
            candidate_providers,
            timeout_secs,
            created_at: Utc::now(),
            result: None,
            provider_used: None,
            elapsed_ms: 0,
            success: false,
            error: None,
            attempts: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// Whether `context` carries anything worth forwarding to a provider.
    pub(crate) fn has_context(&self) -> bool {
        match &self.context {
            Value::Null => false,
            Value::Object(map) => !map.is_empty(),
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_task_is_unexecuted() {
        let task = Task::new("hi", Category::Conversation, vec![Provider::Gemini], 30);
        assert!(!task.success);
        assert!(task.provider_used.is_none());
        assert!(task.attempts.is_empty());
        assert!(!task.has_context());
        assert_eq!(task.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn context_presence() {
        let task = Task::new("hi", Category::Code, vec![], 0).with_context(json!({ "file": "a.rs" }));
        assert!(task.has_context());
        assert_eq!(task.timeout(), Duration::from_secs(1));
    }
}
