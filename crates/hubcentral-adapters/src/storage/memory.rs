//! In-memory storage backed by [`DashMap`].

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Value, json};

use crate::error::{AdapterError, Result};
use crate::storage::{default_path, is_append};
use crate::traits::{StorageAdapter, StorageHealth};

/// Process-local document store.  Contents are lost on drop.
pub struct MemoryStorage {
    id: String,
    documents: DashMap<String, Value>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            documents: DashMap::new(),
        }
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
impl StorageAdapter for MemoryStorage {
    fn id(&self) -> &str {
        &self.id
    }

    async fn save(&self, data: &Value, path: Option<&str>) -> Result<Value> {
        let path = path.map(str::to_string).unwrap_or_else(default_path);
        let mut document = match data {
            Value::Object(map) => map.clone(),
            other => {
                let mut map = serde_json::Map::new();
                map.insert("content".into(), other.clone());
                map
            }
        };
        document.remove("mode");

        if is_append(data)
            && let Some(existing) = self.documents.get(&path)
            && let (Some(old), Some(new)) = (
                existing.get("content").and_then(Value::as_str),
                document.get("content").and_then(Value::as_str),
            )
        {
            let combined = format!("{old}{new}");
            document.insert("content".into(), Value::String(combined));
        }

        let bytes = serde_json::to_vec(&document)?.len();
        self.documents.insert(path.clone(), Value::Object(document));
        tracing::debug!(storage = %self.id, path = %path, bytes, "document saved");
        Ok(json!({ "path": path, "bytes": bytes }))
    }

    async fn load(&self, path: &str) -> Result<Value> {
        let document = self
            .documents
            .get(path)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| AdapterError::NotFound {
                storage_id: self.id.clone(),
                path: path.to_string(),
            })?;
        let mut map = match document {
            Value::Object(map) => map,
            other => {
                let mut map = serde_json::Map::new();
                map.insert("content".into(), other);
                map
            }
        };
        map.insert("path".into(), Value::String(path.to_string()));
        Ok(Value::Object(map))
    }

    async fn list(&self, prefix: Option<&str>) -> Result<Vec<String>> {
        let mut paths: Vec<String> = self
            .documents
            .iter()
            .map(|entry| entry.key().clone())
            .filter(|path| prefix.is_none_or(|p| path.starts_with(p)))
            .collect();
        paths.sort();
        Ok(paths)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.documents
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| AdapterError::NotFound {
                storage_id: self.id.clone(),
                path: path.to_string(),
            })
    }

    async fn health_check(&self) -> StorageHealth {
        StorageHealth::healthy(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::HealthStatus;

    #[tokio::test]
    async fn save_load_delete() {
        let storage = MemoryStorage::new("mem");
        let saved = storage
            .save(&json!({ "content": "hello" }), Some("Notes/a.md"))
            .await
            .unwrap();
        assert_eq!(saved["path"], "Notes/a.md");

        let loaded = storage.load("Notes/a.md").await.unwrap();
        assert_eq!(loaded["content"], "hello");
        assert_eq!(loaded["path"], "Notes/a.md");

        storage.delete("Notes/a.md").await.unwrap();
        assert!(matches!(
            storage.load("Notes/a.md").await,
            Err(AdapterError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn append_mode_concatenates_content() {
        let storage = MemoryStorage::new("mem");
        storage
            .save(&json!({ "content": "one" }), Some("log.md"))
            .await
            .unwrap();
        storage
            .save(&json!({ "content": "\ntwo", "mode": "append" }), Some("log.md"))
            .await
            .unwrap();
        let loaded = storage.load("log.md").await.unwrap();
        assert_eq!(loaded["content"], "one\ntwo");
        assert!(loaded.get("mode").is_none());
    }

    #[tokio::test]
    async fn list_filters_by_prefix_and_sorts() {
        let storage = MemoryStorage::new("mem");
        for path in ["b/2.md", "a/1.md", "b/1.md"] {
            storage.save(&json!({ "content": path }), Some(path)).await.unwrap();
        }
        assert_eq!(storage.list(Some("b/")).await.unwrap(), vec!["b/1.md", "b/2.md"]);
        assert_eq!(storage.list(None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn save_without_path_picks_one() {
        let storage = MemoryStorage::new("mem");
        let saved = storage.save(&json!({ "x": 1 }), None).await.unwrap();
        assert!(saved["path"].as_str().unwrap().starts_with("Hub Central/data_"));
        assert_eq!(storage.health_check().await.status, HealthStatus::Healthy);
    }
}
