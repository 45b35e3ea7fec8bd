//! Markdown vault on the local filesystem.
//!
//! Documents are plain files under a root directory; paths without an
//! extension get `.md` appended.  Every path is resolved relative to the root
//! and rejected if it escapes it (e.g. via `..` components or an absolute
//! path).

use std::path::{Component, Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{AdapterError, Result};
use crate::storage::{default_path, is_append, render_body};
use crate::traits::{StorageAdapter, StorageHealth};

/// Local-directory note vault.
pub struct VaultStorage {
    id: String,
    root_dir: PathBuf,
}

impl VaultStorage {
    /// Create a vault rooted at `root_dir`.  The directory is created on the
    /// first save if it does not exist.
    ///
    /// A relative root (including `""` and `.`) is resolved against the
    /// current directory once, here.
    pub fn new(id: impl Into<String>, root_dir: impl Into<PathBuf>) -> Self {
        let mut root_dir = root_dir.into();
        if root_dir.as_os_str().is_empty() {
            root_dir = PathBuf::from(".");
        }
        let root_dir = std::path::absolute(&root_dir).unwrap_or(root_dir);
        Self {
            id: id.into(),
            root_dir: normalize_path(&root_dir),
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Resolve a relative document path to an absolute file path inside the
    /// root, returning it together with its canonical relative form.
    fn safe_resolve(&self, raw_path: &str) -> Result<(PathBuf, String)> {
        let trimmed = raw_path.trim();
        if trimmed.is_empty() {
            return Err(AdapterError::InvalidPath {
                path: raw_path.to_string(),
                reason: "path is empty".into(),
            });
        }
        if Path::new(trimmed).is_absolute() {
            return Err(AdapterError::InvalidPath {
                path: raw_path.to_string(),
                reason: "absolute paths are not allowed".into(),
            });
        }

        let mut candidate = normalize_path(&self.root_dir.join(trimmed));
        if candidate.components().any(|c| c == Component::ParentDir) {
            return Err(AdapterError::InvalidPath {
                path: raw_path.to_string(),
                reason: format!("resolves outside the vault root `{}`", self.root_dir.display()),
            });
        }
        if candidate.extension().is_none() {
            candidate.set_extension("md");
        }

        let relative = candidate
            .strip_prefix(&self.root_dir)
            .ok()
            .filter(|rel| !rel.as_os_str().is_empty())
            .ok_or_else(|| AdapterError::InvalidPath {
                path: raw_path.to_string(),
                reason: format!("resolves outside the vault root `{}`", self.root_dir.display()),
            })?;

        let relative = relative_string(relative);
        Ok((candidate, relative))
    }

    fn not_found(&self, path: &str) -> AdapterError {
        AdapterError::NotFound {
            storage_id: self.id.clone(),
            path: path.to_string(),
        }
    }
}

/// Normalize `.` and `..` components without touching the filesystem (the
/// target may not exist yet, so `canonicalize()` would fail).
fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                if matches!(components.last(), Some(Component::Normal(_))) {
                    components.pop();
                } else {
                    components.push(component);
                }
            }
            Component::CurDir => {}
            _ => components.push(component),
        }
    }
    components.iter().collect()
}

fn relative_string(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[async_trait]
impl StorageAdapter for VaultStorage {
    fn id(&self) -> &str {
        &self.id
    }

    async fn save(&self, data: &Value, path: Option<&str>) -> Result<Value> {
        let raw = path.map(str::to_string).unwrap_or_else(default_path);
        let (file, relative) = self.safe_resolve(&raw)?;

        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut body = render_body(data);
        if is_append(data) {
            match tokio::fs::read_to_string(&file).await {
                Ok(existing) => body = format!("{existing}{body}"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        tokio::fs::write(&file, body.as_bytes()).await?;
        debug!(storage = %self.id, path = %relative, bytes = body.len(), "note written");
        Ok(json!({ "path": relative, "bytes": body.len() }))
    }

    async fn load(&self, path: &str) -> Result<Value> {
        let (file, relative) = self.safe_resolve(path)?;
        match tokio::fs::read_to_string(&file).await {
            Ok(content) => Ok(json!({ "path": relative, "content": content })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(self.not_found(&relative)),
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, prefix: Option<&str>) -> Result<Vec<String>> {
        let mut paths = Vec::new();
        let mut pending = vec![self.root_dir.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            while let Some(entry) = entries.next_entry().await? {
                let file_type = entry.file_type().await?;
                let entry_path = entry.path();
                if file_type.is_dir() {
                    pending.push(entry_path);
                } else if file_type.is_file()
                    && let Ok(rel) = entry_path.strip_prefix(&self.root_dir)
                {
                    paths.push(relative_string(rel));
                }
            }
        }

        if let Some(prefix) = prefix {
            paths.retain(|p| p.starts_with(prefix));
        }
        paths.sort();
        Ok(paths)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let (file, relative) = self.safe_resolve(path)?;
        match tokio::fs::remove_file(&file).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(self.not_found(&relative)),
            Err(e) => Err(e.into()),
        }
    }

    async fn health_check(&self) -> StorageHealth {
        let start = Instant::now();
        match tokio::fs::metadata(&self.root_dir).await {
            Ok(meta) if meta.is_dir() => StorageHealth::healthy(start.elapsed().as_millis() as u64),
            Ok(_) => StorageHealth::unhealthy(format!(
                "`{}` is not a directory",
                self.root_dir.display()
            )),
            Err(e) => StorageHealth::unhealthy(format!(
                "vault root `{}` unavailable: {e}",
                self.root_dir.display()
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
