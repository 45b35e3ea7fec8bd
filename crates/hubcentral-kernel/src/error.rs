//! Kernel error types.
//!
//! All kernel subsystems surface errors through [`KernelError`], which is the
//! single error type returned by every fallible public API in this crate.

use uuid::Uuid;

/// Unified error type for the Hub Central kernel.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    // -- Bus lifecycle ------------------------------------------------------
    /// The bus worker could not be joined within the shutdown window.
    #[error("event bus worker did not stop within {seconds}s")]
    ShutdownTimeout { seconds: u64 },

    /// The bus worker task panicked or was aborted.
    #[error("event bus worker failed: {reason}")]
    WorkerFailed { reason: String },

    // -- Condition triggers -------------------------------------------------
    /// The referenced condition trigger is not registered on the bus.
    #[error("bus trigger not found: {trigger_id}")]
    TriggerNotFound { trigger_id: Uuid },

    // -- Parsing ------------------------------------------------------------
    /// A textual event type did not name any known [`crate::EventType`].
    #[error("unknown event type `{0}`")]
    UnknownEventType(String),

    /// A textual priority did not name any known [`crate::Priority`].
    #[error("unknown priority `{0}`")]
    UnknownPriority(String),
}

/// Convenience alias used throughout the kernel crate.
pub type Result<T> = std::result::Result<T, KernelError>;
