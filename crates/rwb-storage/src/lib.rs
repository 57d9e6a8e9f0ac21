//! Object storage contract + filesystem-backed implementation.

use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

pub const CRATE_NAME: &str = "rwb-storage";

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("object {bucket}/{key} not found")]
    NotFound { bucket: String, key: String },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Whole-object storage by bucket + key. Uploads either fully succeed or
/// report an error; existing objects are overwritten.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn download(&self, bucket: &str, key: &str) -> Result<Vec<u8>, ObjectStoreError>;

    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<(), ObjectStoreError>;
}

/// Filesystem stand-in for the external bucket service. Buckets are
/// directories under one root; writes go through a temp file + rename so a
/// crashed upload never leaves a partial object behind.
#[derive(Debug, Clone)]
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.root.join(bucket).join(key)
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn download(&self, bucket: &str, key: &str) -> Result<Vec<u8>, ObjectStoreError> {
        let path = self.object_path(bucket, key);
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                Err(ObjectStoreError::NotFound {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                })
            }
            Err(err) => Err(ObjectStoreError::Other(anyhow::Error::new(err).context(
                format!("reading object {}", path.display()),
            ))),
        }
    }

    async fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        let path = self.object_path(bucket, key);
        let parent = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        fs::create_dir_all(&parent)
            .await
            .with_context(|| format!("creating object directory {}", parent.display()))?;

        let temp_path = parent.join(format!(".{}.{}.tmp", Uuid::new_v4(), bytes.len()));
        let mut file = fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp_path)
            .await
            .with_context(|| format!("opening temp object file {}", temp_path.display()))?;
        file.write_all(bytes)
            .await
            .with_context(|| format!("writing temp object file {}", temp_path.display()))?;
        file.flush()
            .await
            .with_context(|| format!("flushing temp object file {}", temp_path.display()))?;
        drop(file);

        if let Err(err) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(ObjectStoreError::Other(anyhow::Error::new(err).context(
                format!(
                    "atomically renaming temp object {} -> {}",
                    temp_path.display(),
                    path.display()
                ),
            )));
        }

        debug!(bucket, key, content_type, bytes = bytes.len(), "stored object");
        Ok(())
    }
}
