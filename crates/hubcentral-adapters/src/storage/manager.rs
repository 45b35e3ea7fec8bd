//! Fan-out over several named storage backends.
//!
//! Backends are registered with a priority (lower is preferred).  The
//! lowest-priority backend is the *primary*: the one trigger actions read
//! from and write to by default.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::{AdapterError, Result};
use crate::traits::{StorageAdapter, StorageHealth};

/// Per-backend result of [`StorageManager::save_to_all`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveOutcome {
    pub target: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

struct Registered {
    name: String,
    priority: u32,
    adapter: Arc<dyn StorageAdapter>,
}

/// Registry of storage backends.
#[derive(Default)]
pub struct StorageManager {
    backends: RwLock<Vec<Registered>>,
}

impl StorageManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a backend under `name`.
    pub async fn register(&self, name: impl Into<String>, adapter: Arc<dyn StorageAdapter>, priority: u32) {
        let name = name.into();
        let mut backends = self.backends.write().await;
        backends.retain(|b| b.name != name);
        backends.push(Registered {
            name: name.clone(),
            priority,
            adapter,
        });
        // Stable: equal priorities keep registration order.
        backends.sort_by_key(|b| b.priority);
        tracing::info!(storage = %name, priority, "storage backend registered");
    }

    /// Look up a backend by name.
    pub async fn get(&self, name: &str) -> Option<Arc<dyn StorageAdapter>> {
        self.backends
            .read()
            .await
            .iter()
            .find(|b| b.name == name)
            .map(|b| Arc::clone(&b.adapter))
    }

    /// Like [`StorageManager::get`] but failing with
    /// [`AdapterError::UnknownStorage`].
    pub async fn require(&self, name: &str) -> Result<Arc<dyn StorageAdapter>> {
        self.get(name)
            .await
            .ok_or_else(|| AdapterError::UnknownStorage(name.to_string()))
    }

    /// The preferred backend, if any is registered.
    pub async fn primary(&self) -> Option<Arc<dyn StorageAdapter>> {
        self.backends
            .read()
            .await
            .first()
            .map(|b| Arc::clone(&b.adapter))
    }

    /// Registered backend names in priority order.
    pub async fn names(&self) -> Vec<String> {
        self.backends
            .read()
            .await
            .iter()
            .map(|b| b.name.clone())
            .collect()
    }

    /// Save `data` to every backend, in priority order.  One backend failing
    /// does not prevent the others from being written.
    pub async fn save_to_all(&self, data: &Value, path: Option<&str>) -> Vec<SaveOutcome> {
        let targets = self.snapshot().await;
        let mut outcomes = Vec::with_capacity(targets.len());
        for (name, adapter) in targets {
            let outcome = match adapter.save(data, path).await {
                Ok(result) => SaveOutcome {
                    target: name,
                    success: true,
                    result: Some(result),
                    error: None,
                },
                Err(e) => {
                    tracing::warn!(storage = %name, error = %e, "save failed");
                    SaveOutcome {
                        target: name,
                        success: false,
                        result: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Health of every backend keyed by name.
    pub async fn health_check_all(&self) -> BTreeMap<String, StorageHealth> {
        let mut report = BTreeMap::new();
        for (name, adapter) in self.snapshot().await {
            report.insert(name, adapter.health_check().await);
        }
        report
    }

    async fn snapshot(&self) -> Vec<(String, Arc<dyn StorageAdapter>)> {
        self.backends
            .read()
            .await
            .iter()
            .map(|b| (b.name.clone(), Arc::clone(&b.adapter)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStorage, VaultStorage};
    use crate::traits::HealthStatus;
    use serde_json::json;

    #[tokio::test]
    async fn primary_follows_priority() {
        let manager = StorageManager::new();
        manager.register("backup", Arc::new(MemoryStorage::new("backup")), 10).await;
        manager.register("main", Arc::new(MemoryStorage::new("main")), 0).await;

        assert_eq!(manager.names().await, vec!["main", "backup"]);
        assert_eq!(manager.primary().await.unwrap().id(), "main");
        assert!(manager.require("nope").await.is_err());
    }

    #[tokio::test]
    async fn re_registering_replaces_backend() {
        let manager = StorageManager::new();
        manager.register("main", Arc::new(MemoryStorage::new("one")), 0).await;
        manager.register("main", Arc::new(MemoryStorage::new("two")), 0).await;
        assert_eq!(manager.names().await.len(), 1);
        assert_eq!(manager.get("main").await.unwrap().id(), "two");
    }

    #[tokio::test]
    async fn save_to_all_reports_per_target() {
        let dir = tempfile::tempdir().unwrap();
        let manager = StorageManager::new();
        manager.register("mem", Arc::new(MemoryStorage::new("mem")), 0).await;
        manager
            .register("vault", Arc::new(VaultStorage::new("vault", dir.path())), 1)
            .await;

        // The vault rejects traversal; memory accepts any key.
        let outcomes = manager
            .save_to_all(&json!({ "content": "x" }), Some("../escape.md"))
            .await;
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].target, "mem");
        assert!(outcomes[0].success);
        assert_eq!(outcomes[1].target, "vault");
        assert!(!outcomes[1].success);
        assert!(outcomes[1].error.is_some());

        let health = manager.health_check_all().await;
        assert_eq!(health["mem"].status, HealthStatus::Healthy);
        assert_eq!(health["vault"].status, HealthStatus::Healthy);
    }
}
