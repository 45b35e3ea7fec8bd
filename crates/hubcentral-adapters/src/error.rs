//! Adapter error types.
//!
//! Storage adapters surface errors through [`AdapterError`].  Provider calls
//! return the narrower [`ProviderError`], an explicit outcome kind the
//! execution engine inspects per attempt to decide whether to fall back.

/// Unified error type for Hub Central storage adapters.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// An I/O operation failed within the adapter.
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The requested document does not exist.
    #[error("not found: `{path}` in storage `{storage_id}`")]
    NotFound { storage_id: String, path: String },

    /// A path escaped the storage root or is otherwise unusable.
    #[error("invalid path `{path}`: {reason}")]
    InvalidPath { path: String, reason: String },

    /// No storage adapter is registered under the given name.
    #[error("unknown storage `{0}`")]
    UnknownStorage(String),

    /// Configuration error in adapter setup.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// Invalid input provided to adapter.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Convenience alias used throughout the adapters crate.
pub type Result<T> = std::result::Result<T, AdapterError>;

/// Outcome kinds of a failed provider call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The call did not complete within its timeout.
    #[error("timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The request never produced a response (connection, DNS, spawn...).
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend answered with a non-success status.
    #[error("status {code}: {body}")]
    Status { code: u16, body: String },

    /// The provider is missing credentials or is not registered.
    #[error("not configured: {0}")]
    NotConfigured(String),

    /// The backend answered but the payload could not be understood.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Result of a single provider call.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;
