//! Engine error types.

use crate::category::Category;

/// Unified error type for the decision and execution engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A textual category did not name any known [`Category`].
    #[error("unknown category `{0}`")]
    UnknownCategory(String),

    /// A textual provider did not name any known [`crate::Provider`].
    #[error("unknown provider `{0}`")]
    UnknownProvider(String),

    /// No provider was available for the task.
    #[error("no providers available for category `{category}`")]
    NoProviders { category: Category },

    /// Every candidate provider failed.
    #[error("all providers failed: {last_error}")]
    AllProvidersFailed { last_error: String },

    /// A `[[providers]]` entry is unusable.
    #[error("invalid provider configuration for `{provider}`: {reason}")]
    InvalidProviderConfig { provider: String, reason: String },
}

/// Convenience alias used throughout the engine crate.
pub type Result<T> = std::result::Result<T, EngineError>;
