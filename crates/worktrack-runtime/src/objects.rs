//! Filesystem Object Store.
//!
//! Objects are stored as `<root>/<category>/<uuid>_<name>`; the returned path
//! is relative to the root and uses `/` separators.

use std::path::{Component, Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use uuid::Uuid;
use worktrack_core::config::StorageConfig;
use worktrack_core::error::{Result, WorktrackError};
use worktrack_core::objects::ObjectStore;
use worktrack_core::store::StoreFuture;

/// Longest file name kept from the caller's suggestion.
const MAX_NAME_LEN: usize = 100;

/// Object Store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.root_dir)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a stored path under the root, refusing anything that could
    /// escape it.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let safe = !path.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(WorktrackError::invalid("path", format!("'{}' is not an object path", path)));
        }
        Ok(self.root.join(relative))
    }
}

/// Reduce a caller-supplied file name to `[A-Za-z0-9._-]`, keeping the
/// extension readable.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    let cleaned = if cleaned.chars().count() > MAX_NAME_LEN {
        let skip = cleaned.chars().count() - MAX_NAME_LEN;
        cleaned.chars().skip(skip).collect()
    } else {
        cleaned.to_string()
    };

    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}

impl ObjectStore for LocalObjectStore {
    fn put<'a>(
        &'a self,
        category: &'a str,
        suggested_name: &'a str,
        bytes: &'a [u8],
    ) -> StoreFuture<'a, String> {
        Box::pin(async move {
            let category = sanitize_file_name(category);
            let path = format!(
                "{}/{}_{}",
                category,
                Uuid::new_v4().simple(),
                sanitize_file_name(suggested_name)
            );
            let full = self.resolve(&path)?;

            if let Some(dir) = full.parent() {
                tokio::fs::create_dir_all(dir).await?;
            }

            let mut file = tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&full)
                .await?;
            file.write_all(bytes).await?;
            file.flush().await?;

            info!(path = %path, bytes = bytes.len(), "Object stored");
            Ok(path)
        })
    }

    fn delete<'a>(&'a self, path: &'a str) -> StoreFuture<'a, ()> {
        Box::pin(async move {
            let full = self.resolve(path)?;
            match tokio::fs::remove_file(&full).await {
                Ok(()) => {
                    info!(path = %path, "Object deleted");
                    Ok(())
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!(path = %path, "Object already absent");
                    Ok(())
                }
                Err(e) => Err(e.into()),
            }
        })
    }
}
