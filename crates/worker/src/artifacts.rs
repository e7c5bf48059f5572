//! Write-once storage for generated images, addressed by job id.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use flux_core::types::JobId;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Artifact not found: {0}")]
    Missing(String),

    #[error("Artifact I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Persists artifact bytes and reads them back by reference.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store `bytes` for `id`, returning an opaque reference.
    async fn store(&self, id: JobId, bytes: &[u8]) -> Result<String, StorageError>;

    async fn load(&self, reference: &str) -> Result<Vec<u8>, StorageError>;

    async fn remove(&self, reference: &str) -> Result<(), StorageError>;
}

/// Stores each artifact as `{root}/{job_id}.png`. The reference is the
/// file path.
pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    /// Open the store, creating `root` if needed.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn store(&self, id: JobId, bytes: &[u8]) -> Result<String, StorageError> {
        let path = self.root.join(format!("{id}.png"));
        tokio::fs::write(&path, bytes).await?;
        Ok(path.to_string_lossy().into_owned())
    }

    async fn load(&self, reference: &str) -> Result<Vec<u8>, StorageError> {
        match tokio::fs::read(reference).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::Missing(reference.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn remove(&self, reference: &str) -> Result<(), StorageError> {
        match tokio::fs::remove_file(reference).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
