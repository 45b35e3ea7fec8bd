//! Durable trigger storage.
//!
//! The trigger set is persisted as one JSON document, rewritten in full on
//! every mutation:
//!
//! ```json
//! { "version": "1.0", "updated_at": "...", "triggers": [ ... ] }
//! ```
//!
//! [`JsonFileStore`] writes to a sibling temp file and renames it over the
//! target, so a crash mid-write leaves the previous document intact.
//! Unknown top-level keys survive the rewrite.  A record that no longer
//! parses is skipped with a warning instead of failing the whole load.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::error::{Result, TriggerError};
use crate::model::Trigger;

/// Format version written to new documents.
pub const STORE_VERSION: &str = "1.0";

/// On-disk document shape.
#[derive(Debug, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default = "default_version")]
    version: String,
    #[serde(default = "Utc::now")]
    updated_at: DateTime<Utc>,
    #[serde(default)]
    triggers: Vec<Value>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

fn default_version() -> String {
    STORE_VERSION.to_string()
}

/// Where the trigger set lives between runs.
#[async_trait]
pub trait TriggerStore: Send + Sync {
    /// Read every persisted trigger.  A store that has never been written
    /// yields an empty set.
    async fn load(&self) -> Result<Vec<Trigger>>;

    /// Replace the persisted set with `triggers`.
    async fn save(&self, triggers: &[Trigger]) -> Result<()>;
}

// ---------------------------------------------------------------------------
// JsonFileStore
// ---------------------------------------------------------------------------

/// A single JSON file on the local filesystem.
pub struct JsonFileStore {
    path: PathBuf,
    /// Top-level keys of the last loaded document other than ours.
    extra: Mutex<Map<String, Value>>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            extra: Mutex::new(Map::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "triggers.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl TriggerStore for JsonFileStore {
    async fn load(&self) -> Result<Vec<Trigger>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "no trigger file yet, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(TriggerError::Persistence(format!(
                    "cannot read {}: {e}",
                    self.path.display()
                )));
            }
        };

        let document: StoreDocument = serde_json::from_slice(&bytes).map_err(|e| {
            TriggerError::Persistence(format!("cannot parse {}: {e}", self.path.display()))
        })?;
        if document.version != STORE_VERSION {
            tracing::warn!(
                path = %self.path.display(),
                version = %document.version,
                "trigger file has an unexpected version, loading anyway"
            );
        }

        let mut triggers = Vec::with_capacity(document.triggers.len());
        for (index, record) in document.triggers.into_iter().enumerate() {
            let id = record.get("id").and_then(Value::as_str).unwrap_or("?").to_string();
            match serde_json::from_value::<Trigger>(record) {
                Ok(trigger) => triggers.push(trigger),
                Err(e) => tracing::warn!(
                    path = %self.path.display(),
                    index,
                    trigger_id = %id,
                    error = %e,
                    "skipping unreadable trigger record"
                ),
            }
        }
        *self.extra.lock().await = document.extra;

        tracing::info!(
            path = %self.path.display(),
            count = triggers.len(),
            "triggers loaded"
        );
        Ok(triggers)
    }

    async fn save(&self, triggers: &[Trigger]) -> Result<()> {
        let persistence = |e: std::io::Error| {
            TriggerError::Persistence(format!("cannot write {}: {e}", self.path.display()))
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await.map_err(persistence)?;
        }

        let records = triggers
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let document = StoreDocument {
            version: STORE_VERSION.to_string(),
            updated_at: Utc::now(),
            triggers: records,
            extra: self.extra.lock().await.clone(),
        };
        let json = serde_json::to_vec_pretty(&document)?;

        let temp = self.temp_path();
        tokio::fs::write(&temp, json).await.map_err(persistence)?;
        tokio::fs::rename(&temp, &self.path).await.map_err(persistence)?;

        tracing::debug!(path = %self.path.display(), count = triggers.len(), "triggers saved");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// Non-durable store for tests and dry runs.
#[derive(Default)]
pub struct MemoryStore {
    triggers: Mutex<Vec<Trigger>>,
    saves: Mutex<u64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the store, as if a previous run had saved `triggers`.
    pub fn with_triggers(triggers: Vec<Trigger>) -> Self {
        Self {
            triggers: Mutex::new(triggers),
            saves: Mutex::new(0),
        }
    }

    /// Number of completed `save` calls.
    pub async fn save_count(&self) -> u64 {
        *self.saves.lock().await
    }
}

#[async_trait]
impl TriggerStore for MemoryStore {
    async fn load(&self) -> Result<Vec<Trigger>> {
        Ok(self.triggers.lock().await.clone())
    }

    async fn save(&self, triggers: &[Trigger]) -> Result<()> {
        *self.triggers.lock().await = triggers.to_vec();
        *self.saves.lock().await += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
