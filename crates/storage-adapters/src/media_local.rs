//! # LocalMediaStorage
//!
//! Filesystem implementation of the `MediaStorage` port. Paths are
//! storage-relative; the adapter owns only the root directory.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;

use domains::{AppError, MediaStorage, Result};

pub struct LocalMediaStorage {
    root: PathBuf,
}

impl LocalMediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Joins under the root, rejecting any path that could escape it.
    fn resolve(&self, rel_path: &str) -> Result<PathBuf> {
        let rel = Path::new(rel_path);
        let safe = rel
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !safe || rel_path.is_empty() {
            return Err(AppError::Internal(format!(
                "media path escapes storage root: {rel_path}"
            )));
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl MediaStorage for LocalMediaStorage {
    async fn put(&self, rel_path: &str, data: Bytes) -> Result<()> {
        let target = self.resolve(rel_path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await.map_err(AppError::internal)?;
        }
        fs::write(&target, &data).await.map_err(AppError::internal)?;
        tracing::debug!(path = %target.display(), bytes = data.len(), "stored payload");
        Ok(())
    }

    /// Idempotent: removing an already-absent payload is not an error.
    async fn remove(&self, rel_path: &str) -> Result<()> {
        let target = self.resolve(rel_path)?;
        match fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(AppError::internal(err)),
        }
    }
}
