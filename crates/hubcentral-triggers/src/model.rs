//! Trigger records and their creation/update payloads.
//!
//! A [`Trigger`] is the durable unit of automation: an activation mode
//! ([`TriggerType`] plus its `config`), an `action` naming one of the fixed
//! [`crate::ActionKind`]s with its parameters, and run bookkeeping.  Fields
//! this version does not know are captured in `extra` and written back
//! unchanged.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::TriggerError;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// How a trigger is activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerType {
    /// Timer driven, handled by the scheduler tick loop.
    Scheduled,
    /// Fired by `process_event` when `config.event_type` matches.
    Event,
    /// Fired by `process_webhook` when `config.source` matches.
    Webhook,
    /// Evaluated on demand against a caller-supplied context.
    Intelligent,
}

impl TriggerType {
    pub const ALL: [TriggerType; 4] = [
        Self::Scheduled,
        Self::Event,
        Self::Webhook,
        Self::Intelligent,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Event => "event",
            Self::Webhook => "webhook",
            Self::Intelligent => "intelligent",
        }
    }
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerType {
    type Err = TriggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == lowered)
            .ok_or_else(|| TriggerError::Configuration(format!("unknown trigger type `{s}`")))
    }
}

/// Lifecycle status of a trigger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerStatus {
    #[default]
    Active,
    Paused,
    Disabled,
    /// The last execution failed.  The trigger is still enabled.
    Error,
}

impl TriggerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Disabled => "disabled",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for TriggerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Trigger
// ---------------------------------------------------------------------------

/// A persisted trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    /// `trg_` followed by 8 hex digits.
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub trigger_type: TriggerType,
    /// Activation parameters, specific to `trigger_type`.
    #[serde(default)]
    pub config: Map<String, Value>,
    /// `{ "type": <action kind>, ...parameters }`.
    #[serde(default)]
    pub action: Map<String, Value>,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub status: TriggerStatus,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    pub last_run: Option<DateTime<Utc>>,
    #[serde(default)]
    pub run_count: u64,
    #[serde(default)]
    pub error_count: u64,
    pub last_error: Option<String>,

    /// Unknown fields, preserved across load/save.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_enabled() -> bool {
    true
}

impl Trigger {
    /// Build a fresh record from a validated creation payload.
    pub(crate) fn from_new(new: NewTrigger, config: Map<String, Value>, action: Map<String, Value>) -> Self {
        let now = Utc::now();
        Self {
            id: new_trigger_id(),
            name: new.name,
            trigger_type: new.trigger_type,
            config,
            action,
            description: new.description,
            enabled: new.enabled,
            status: if new.enabled {
                TriggerStatus::Active
            } else {
                TriggerStatus::Disabled
            },
            created_at: now,
            updated_at: now,
            last_run: None,
            run_count: 0,
            error_count: 0,
            last_error: None,
            extra: Map::new(),
        }
    }

    /// The `action.type` string, if any.
    pub fn action_type(&self) -> Option<&str> {
        self.action.get("type").and_then(Value::as_str)
    }

    /// Set `enabled` and the matching `active`/`disabled` status.
    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.status = if enabled {
            TriggerStatus::Active
        } else {
            TriggerStatus::Disabled
        };
    }
}

/// Generate a trigger id: `trg_` plus 8 random hex digits.
pub fn new_trigger_id() -> String {
    let hex = Uuid::now_v7().simple().to_string();
    // The tail of a v7 UUID is random; the head is a timestamp.
    format!("trg_{}", &hex[hex.len() - 8..])
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Input to `TriggerRegistry::create`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTrigger {
    pub name: String,
    #[serde(rename = "type")]
    pub trigger_type: TriggerType,
    #[serde(default = "empty_object")]
    pub config: Value,
    #[serde(default = "empty_object")]
    pub action: Value,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

impl NewTrigger {
    pub fn new(name: impl Into<String>, trigger_type: TriggerType) -> Self {
        Self {
            name: name.into(),
            trigger_type,
            config: empty_object(),
            action: empty_object(),
            description: String::new(),
            enabled: true,
        }
    }

    pub fn with_config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }

    pub fn with_action(mut self, action: Value) -> Self {
        self.action = action;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

impl From<&Trigger> for NewTrigger {
    fn from(trigger: &Trigger) -> Self {
        Self {
            name: trigger.name.clone(),
            trigger_type: trigger.trigger_type,
            config: Value::Object(trigger.config.clone()),
            action: Value::Object(trigger.action.clone()),
            description: trigger.description.clone(),
            enabled: trigger.enabled,
        }
    }
}

/// Partial update for `TriggerRegistry::update`.
///
/// `config` and `action` are merged key by key into the existing objects;
/// the other fields replace.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerUpdate {
    pub name: Option<String>,
    pub config: Option<Map<String, Value>>,
    pub action: Option<Map<String, Value>>,
    pub description: Option<String>,
    pub enabled: Option<bool>,
}

impl TriggerUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn config(mut self, config: Map<String, Value>) -> Self {
        self.config = Some(config);
        self
    }

    pub fn action(mut self, action: Map<String, Value>) -> Self {
        self.action = Some(action);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }
}

/// Merge `patch` into `target`, replacing values key by key.
pub(crate) fn merge_object(target: &mut Map<String, Value>, patch: Map<String, Value>) {
    for (key, value) in patch {
        target.insert(key, value);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
