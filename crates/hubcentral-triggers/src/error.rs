//! Trigger error types.
//!
//! All trigger subsystems surface errors through [`TriggerError`].  The
//! first four variants are the failure classes callers act on; the rest are
//! upstream conversions.

/// Unified error type for the trigger crate.
#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    // -- Caller-facing classes -----------------------------------------------
    /// A trigger definition is malformed (unknown action kind, bad schedule,
    /// invalid regex...).
    #[error("invalid trigger configuration: {0}")]
    Configuration(String),

    /// No trigger or template exists under the given name.
    #[error("trigger not found: {0}")]
    NotFound(String),

    /// An action handler failed.
    #[error("trigger execution failed: {0}")]
    Execution(String),

    /// The trigger set could not be read from or written to durable storage.
    #[error("trigger persistence failed: {0}")]
    Persistence(String),

    // -- Upstream crate errors -----------------------------------------------
    /// An error propagated from a storage adapter.
    #[error("storage error: {0}")]
    Storage(#[from] hubcentral_adapters::AdapterError),

    /// An error propagated from the execution engine.
    #[error("engine error: {0}")]
    Engine(#[from] hubcentral_engine::EngineError),

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A filesystem operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the trigger crate.
pub type Result<T> = std::result::Result<T, TriggerError>;
