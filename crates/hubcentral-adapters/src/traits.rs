//! Collaborator traits and supporting types.
//!
//! Every AI backend implements [`ProviderAdapter`] and every document store
//! implements [`StorageAdapter`], giving the execution engine and the trigger
//! actions a uniform, narrow interface to depend on.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ProviderResult, Result};

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// The health status of a storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// The backend is fully operational.
    Healthy,
    /// The backend is working but with reduced capability or elevated latency.
    Degraded,
    /// The backend is not functional.
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded => write!(f, "degraded"),
            Self::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Result of [`StorageAdapter::health_check`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageHealth {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StorageHealth {
    pub fn healthy(latency_ms: u64) -> Self {
        Self {
            status: HealthStatus::Healthy,
            latency_ms: Some(latency_ms),
            message: None,
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            latency_ms: None,
            message: Some(message.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Core traits
// ---------------------------------------------------------------------------

/// A backend capable of answering a natural-language prompt.
///
/// Implementations report every failure as a typed [`crate::ProviderError`]
/// so callers can fall back to another provider without parsing strings.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Stable provider name (e.g. `openai`, `ollama`).
    fn name(&self) -> &str;

    /// Send `prompt` (optionally preceded by a system context) and return the
    /// answer text.
    async fn call(
        &self,
        prompt: &str,
        system_context: Option<&str>,
        timeout: Duration,
    ) -> ProviderResult<String>;
}

/// A document store addressed by slash-separated relative paths.
///
/// Documents are JSON objects.  Note-oriented callers put the markdown body
/// under `content`; `mode: "append"` in saved data appends to an existing
/// body instead of replacing it.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Unique identifier for this storage instance.
    fn id(&self) -> &str;

    /// Persist `data`.  When `path` is `None` the adapter picks one.
    ///
    /// Returns `{ "path": ..., "bytes": ... }`.
    async fn save(&self, data: &Value, path: Option<&str>) -> Result<Value>;

    /// Load a document.  The returned object always carries `path`.
    async fn load(&self, path: &str) -> Result<Value>;

    /// List document paths, optionally restricted to a prefix.
    async fn list(&self, prefix: Option<&str>) -> Result<Vec<String>>;

    /// Remove a document.
    async fn delete(&self, path: &str) -> Result<()>;

    /// Check whether the backend is reachable.
    async fn health_check(&self) -> StorageHealth;
}
