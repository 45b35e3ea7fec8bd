//! Event model.
//!
//! An [`Event`] is a typed, prioritized record of something that happened.
//! Events are created by producers through [`crate::EventBus::create_event`],
//! queued exactly once, and mutated only by the bus worker when it dispatches
//! them (the `processed` flag and `result`).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::KernelError;

// ---------------------------------------------------------------------------
// Event type
// ---------------------------------------------------------------------------

/// The kind of occurrence an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// System lifecycle (startup, shutdown).
    System,
    /// A request issued by the user.
    #[serde(rename = "user")]
    UserRequest,
    /// Emitted by a timer.
    Scheduled,
    /// Data received from an external webhook.
    Webhook,
    /// Emitted by an automatic trigger.
    Trigger,
    /// Outcome of a routed AI task.
    AiResponse,
    /// A file or note changed.
    FileChange,
    /// A notification for the user.
    Notification,
}

impl EventType {
    /// Every event type, in declaration order.
    pub const ALL: [EventType; 8] = [
        Self::System,
        Self::UserRequest,
        Self::Scheduled,
        Self::Webhook,
        Self::Trigger,
        Self::AiResponse,
        Self::FileChange,
        Self::Notification,
    ];

    /// The wire name of this event type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::UserRequest => "user",
            Self::Scheduled => "scheduled",
            Self::Webhook => "webhook",
            Self::Trigger => "trigger",
            Self::AiResponse => "ai_response",
            Self::FileChange => "file_change",
            Self::Notification => "notification",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == lowered)
            .ok_or_else(|| KernelError::UnknownEventType(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

/// Urgency tier that determines dispatch order.
///
/// Lower discriminant means more urgent; the bus always drains every
/// pending event of a more urgent tier before touching a less urgent one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Must be dispatched before anything else.
    Critical = 1,
    /// Important but not safety-critical.
    High = 2,
    /// Default for most events.
    Normal = 3,
    /// Informational feedback (e.g. AI responses).
    Low = 4,
    /// Best-effort bookkeeping.
    Background = 5,
}

impl Priority {
    /// Every priority, most urgent first.
    pub const ALL: [Priority; 5] = [
        Self::Critical,
        Self::High,
        Self::Normal,
        Self::Low,
        Self::Background,
    ];

    /// Zero-based lane index used by the bus queue.
    pub(crate) fn lane(self) -> usize {
        self as usize - 1
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::Normal
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Normal => "normal",
            Self::Low => "low",
            Self::Background => "background",
        };
        f.write_str(s)
    }
}

impl FromStr for Priority {
    type Err = KernelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "critical" => Ok(Self::Critical),
            "high" => Ok(Self::High),
            "normal" => Ok(Self::Normal),
            "low" => Ok(Self::Low),
            "background" => Ok(Self::Background),
            _ => Err(KernelError::UnknownPriority(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A record of something that happened, queued for dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique, time-ordered identifier (UUID v7).
    pub id: Uuid,
    /// What kind of occurrence this is.
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Free-form producer name (e.g. `"execution_engine"`, `"n8n"`).
    pub source: String,
    /// Arbitrary JSON payload.
    pub payload: serde_json::Value,
    /// Dispatch urgency.
    pub priority: Priority,
    /// When the event was created.
    pub timestamp: DateTime<Utc>,
    /// Monotonic enqueue order, used to keep FIFO order within a tier.
    pub sequence: u64,
    /// Set by the worker once every handler has run.
    pub processed: bool,
    /// Summary of handler outcomes, filled in by the worker.
    pub result: Option<serde_json::Value>,
}

impl Event {
    pub(crate) fn new(
        event_type: EventType,
        source: impl Into<String>,
        payload: serde_json::Value,
        priority: Priority,
        sequence: u64,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            event_type,
            source: source.into(),
            payload,
            priority,
            timestamp: Utc::now(),
            sequence,
            processed: false,
            result: None,
        }
    }

    /// Read a string field from the payload.
    pub fn payload_str(&self, field: &str) -> Option<&str> {
        self.payload.get(field).and_then(|v| v.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
