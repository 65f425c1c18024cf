use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use super::{blob_path, BlobStore, StoredBlob};
use crate::errors::AppError;

/// Blob store rooted at a local directory. Used for development without MinIO.
#[derive(Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves a storage path under the root, refusing anything that escapes it.
    fn resolve(&self, path: &str) -> Result<PathBuf, AppError> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if escapes || path.is_empty() {
            return Err(AppError::Storage(format!("invalid blob path '{path}'")));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn upload(
        &self,
        name: &str,
        _content_type: &str,
        data: Bytes,
    ) -> Result<StoredBlob, AppError> {
        let path = blob_path(name);
        let target = self.resolve(&path)?;

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("create {}: {e}", parent.display())))?;
        }
        tokio::fs::write(&target, &data)
            .await
            .map_err(|e| AppError::Storage(format!("write {}: {e}", target.display())))?;

        debug!("Stored {} ({} bytes)", target.display(), data.len());
        Ok(StoredBlob {
            path,
            name: name.to_string(),
            size: data.len() as u64,
        })
    }

    async fn read(&self, path: &str) -> Result<Option<Bytes>, AppError> {
        let target = self.resolve(path)?;
        match tokio::fs::read(&target).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Storage(format!("read {}: {e}", target.display()))),
        }
    }
}
