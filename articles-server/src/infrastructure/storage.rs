use std::io;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tokio::fs;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),
    #[error("invalid object name: {0}")]
    InvalidName(String),
    #[error("storage io error: {0}")]
    Io(#[from] io::Error),
}

/// Minimal blob-store client: write an object, hand out a time-limited URL for it.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put_object(
        &self,
        name: &str,
        content_type: &str,
        content: &[u8],
    ) -> Result<(), StorageError>;

    async fn presigned_url(&self, name: &str, expiry: Duration) -> Result<String, StorageError>;
}

/// Bucket laid out as a directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalObjectStorage {
    root: PathBuf,
    bucket: String,
    public_url: String,
}

impl LocalObjectStorage {
    pub fn new(root: impl Into<PathBuf>, bucket: String, public_url: String) -> Self {
        Self {
            root: root.into(),
            bucket,
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    fn object_path(&self, name: &str) -> Result<PathBuf, StorageError> {
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(StorageError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(&self.bucket).join(name))
    }
}

#[async_trait]
impl ObjectStorage for LocalObjectStorage {
    async fn put_object(
        &self,
        name: &str,
        content_type: &str,
        content: &[u8],
    ) -> Result<(), StorageError> {
        let path = self.object_path(name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, content).await?;
        tracing::debug!(
            bucket = %self.bucket,
            object = %name,
            content_type = %content_type,
            bytes = content.len(),
            "object stored"
        );
        Ok(())
    }

    async fn presigned_url(&self, name: &str, expiry: Duration) -> Result<String, StorageError> {
        let path = self.object_path(name)?;
        if !fs::try_exists(&path).await? {
            return Err(StorageError::NotFound(name.to_string()));
        }
        let expires = Utc::now().timestamp() + expiry.as_secs() as i64;
        Ok(format!(
            "{}/{}/{}?expires={}",
            self.public_url, self.bucket, name, expires
        ))
    }
}
