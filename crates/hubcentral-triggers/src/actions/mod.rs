//! Trigger action handlers.
//!
//! Every trigger's `action.type` names one [`ActionKind`].  The
//! [`ActionRegistry`] maps each kind to its [`ActionHandler`]; the mapping is
//! fixed at construction and action kinds are validated when a trigger is
//! created, so an unknown kind never reaches execution for triggers created
//! through the registry.
//!
//! Handlers receive the action parameters, the merged execution context
//! (`{trigger, timestamp, ...}`) and the collaborators in [`ActionContext`].
//! Handlers that need a collaborator which is not wired fail with
//! [`TriggerError::Execution`].

mod ai;
mod note;
mod system;
mod webhook;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use hubcentral_adapters::{StorageAdapter, StorageManager};
use hubcentral_engine::ExecutionEngine;
use hubcentral_kernel::{EventBus, WeakEventBus};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, TriggerError};
use crate::render::render;

pub use ai::{ProcessWithAi, RunAiAnalysis};
pub use note::{ApplyTemplate, CreateNote, GenerateSummary, UpdateNote};
pub use system::{BackupVault, CustomScript, LogEvent, SendNotification};
pub use webhook::SendWebhook;

/// Action kind used when a trigger's action has no `type`.
pub const DEFAULT_ACTION: ActionKind = ActionKind::LogEvent;

// ---------------------------------------------------------------------------
// ActionKind
// ---------------------------------------------------------------------------

/// The fixed set of actions a trigger can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    CreateNote,
    UpdateNote,
    SendNotification,
    RunAiAnalysis,
    BackupVault,
    GenerateSummary,
    ApplyTemplate,
    ProcessWithAi,
    SendWebhook,
    LogEvent,
    CustomScript,
}

impl ActionKind {
    pub const ALL: [ActionKind; 11] = [
        Self::CreateNote,
        Self::UpdateNote,
        Self::SendNotification,
        Self::RunAiAnalysis,
        Self::BackupVault,
        Self::GenerateSummary,
        Self::ApplyTemplate,
        Self::ProcessWithAi,
        Self::SendWebhook,
        Self::LogEvent,
        Self::CustomScript,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateNote => "create_note",
            Self::UpdateNote => "update_note",
            Self::SendNotification => "send_notification",
            Self::RunAiAnalysis => "run_ai_analysis",
            Self::BackupVault => "backup_vault",
            Self::GenerateSummary => "generate_summary",
            Self::ApplyTemplate => "apply_template",
            Self::ProcessWithAi => "process_with_ai",
            Self::SendWebhook => "send_webhook",
            Self::LogEvent => "log_event",
            Self::CustomScript => "custom_script",
        }
    }

    /// The kind named by an action object's `type` field.
    pub fn of(action: &Map<String, Value>) -> Result<Self> {
        match action.get("type") {
            None | Some(Value::Null) => Ok(DEFAULT_ACTION),
            Some(Value::String(name)) => name.parse(),
            Some(other) => Err(TriggerError::Configuration(format!(
                "action `type` must be a string, got {other}"
            ))),
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = TriggerError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| TriggerError::Configuration(format!("unknown action type `{s}`")))
    }
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// Collaborators available to action handlers.
#[derive(Clone, Default)]
pub struct ActionContext {
    storage: Option<Arc<StorageManager>>,
    engine: Option<ExecutionEngine>,
    bus: Option<WeakEventBus>,
    http: reqwest::Client,
}

impl ActionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_storage(mut self, storage: Arc<StorageManager>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_engine(mut self, engine: ExecutionEngine) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Publish notifications on `bus`.  Only a weak handle is kept, since
    /// the bus itself ends up holding the trigger registry.
    pub fn with_bus(mut self, bus: &EventBus) -> Self {
        self.bus = Some(bus.downgrade());
        self
    }

    pub fn storage_manager(&self) -> Result<&Arc<StorageManager>> {
        self.storage
            .as_ref()
            .ok_or_else(|| TriggerError::Execution("storage is not configured".into()))
    }

    /// The adapter named by `name`, or the primary one.
    pub async fn storage(&self, name: Option<&str>) -> Result<Arc<dyn StorageAdapter>> {
        let manager = self.storage_manager()?;
        match name {
            Some(name) => Ok(manager.require(name).await?),
            None => manager
                .primary()
                .await
                .ok_or_else(|| TriggerError::Execution("no storage backend registered".into())),
        }
    }

    pub fn engine(&self) -> Result<&ExecutionEngine> {
        self.engine
            .as_ref()
            .ok_or_else(|| TriggerError::Execution("execution engine is not configured".into()))
    }

    pub fn bus(&self) -> Option<EventBus> {
        self.bus.as_ref().and_then(WeakEventBus::upgrade)
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }
}

// ---------------------------------------------------------------------------
// Handler trait & registry
// ---------------------------------------------------------------------------

/// One action implementation.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    fn kind(&self) -> ActionKind;

    /// Run the action.  `params` is the trigger's `action` object and
    /// `context` the merged execution context.
    async fn run(
        &self,
        params: &Map<String, Value>,
        context: &Map<String, Value>,
        deps: &ActionContext,
    ) -> Result<Value>;
}

/// Enum-keyed handler table.
pub struct ActionRegistry {
    handlers: HashMap<ActionKind, Arc<dyn ActionHandler>>,
}

impl ActionRegistry {
    /// A registry with the built-in handler for every [`ActionKind`].
    #[must_use]
    pub fn new() -> Self {
        let builtin: [Arc<dyn ActionHandler>; 11] = [
            Arc::new(CreateNote),
            Arc::new(UpdateNote),
            Arc::new(SendNotification),
            Arc::new(RunAiAnalysis),
            Arc::new(BackupVault),
            Arc::new(GenerateSummary),
            Arc::new(ApplyTemplate),
            Arc::new(ProcessWithAi),
            Arc::new(SendWebhook),
            Arc::new(LogEvent),
            Arc::new(CustomScript),
        ];
        let handlers = builtin.into_iter().map(|h| (h.kind(), h)).collect();
        Self { handlers }
    }

    /// Replace the handler for `handler.kind()`.
    pub fn with_handler(mut self, handler: Arc<dyn ActionHandler>) -> Self {
        self.handlers.insert(handler.kind(), handler);
        self
    }

    pub fn get(&self, kind: ActionKind) -> Option<Arc<dyn ActionHandler>> {
        self.handlers.get(&kind).cloned()
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Reject static action parameters that could never run.
pub(crate) fn validate_params(kind: ActionKind, params: &Map<String, Value>) -> Result<()> {
    match kind {
        ActionKind::RunAiAnalysis | ActionKind::ProcessWithAi => ai::validate_params(params),
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Parameter helpers
// ---------------------------------------------------------------------------

/// A non-empty string parameter.
pub(crate) fn str_param<'a>(params: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// A string parameter rendered against `context`.
pub(crate) fn rendered(
    params: &Map<String, Value>,
    key: &str,
    context: &Map<String, Value>,
) -> Option<String> {
    str_param(params, key).map(|template| render(template, context))
}

/// A required string parameter rendered against `context`.
pub(crate) fn required(
    params: &Map<String, Value>,
    key: &str,
    context: &Map<String, Value>,
    kind: ActionKind,
) -> Result<String> {
    rendered(params, key, context)
        .ok_or_else(|| TriggerError::Execution(format!("`{kind}` needs a `{key}` parameter")))
}

/// A string from the context, e.g. `note_path` from an event payload.
pub(crate) fn context_str<'a>(context: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    context
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Ensure a note path carries a `.md` extension.
pub(crate) fn note_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.ends_with(".md") {
        trimmed.to_string()
    } else {
        format!("{trimmed}.md")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use hubcentral_adapters::MemoryStorage;
    use serde_json::json;

    pub(crate) fn obj(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    /// Collaborators backed by a single in-memory store.
    pub(crate) async fn memory_deps() -> (ActionContext, Arc<MemoryStorage>) {
        let memory = Arc::new(MemoryStorage::new("memory"));
        let manager = Arc::new(StorageManager::new());
        manager.register("memory", memory.clone(), 0).await;
        (ActionContext::new().with_storage(manager), memory)
    }

    #[test]
    fn every_kind_has_a_builtin_handler() {
        let registry = ActionRegistry::new();
        for kind in ActionKind::ALL {
            let handler = registry.get(kind).unwrap();
            assert_eq!(handler.kind(), kind);
            assert_eq!(kind.as_str().parse::<ActionKind>().unwrap(), kind);
        }
    }

    #[test]
    fn action_kind_resolution() {
        assert_eq!(ActionKind::of(&obj(json!({}))).unwrap(), ActionKind::LogEvent);
        assert_eq!(
            ActionKind::of(&obj(json!({ "type": "send_webhook" }))).unwrap(),
            ActionKind::SendWebhook
        );
        assert!(matches!(
            ActionKind::of(&obj(json!({ "type": "launch_rocket" }))),
            Err(TriggerError::Configuration(_))
        ));
        assert!(ActionKind::of(&obj(json!({ "type": 3 }))).is_err());
    }

    #[tokio::test]
    async fn missing_collaborators_are_execution_errors() {
        let deps = ActionContext::new();
        assert!(matches!(deps.engine(), Err(TriggerError::Execution(_))));
        assert!(matches!(deps.storage(None).await, Err(TriggerError::Execution(_))));
        assert!(deps.bus().is_none());
    }

    #[test]
    fn note_paths_get_markdown_extension() {
        assert_eq!(note_path("/Inbox/today"), "Inbox/today.md");
        assert_eq!(note_path("Inbox/today.md"), "Inbox/today.md");
    }
}
