use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tracing::{info, instrument};

use crate::domain::error::DomainError;
use crate::infrastructure::storage::{ObjectStorage, StorageError};

const URL_EXPIRY: Duration = Duration::from_secs(7 * 24 * 60 * 60);
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone, Serialize)]
pub struct UploadedFile {
    pub object: String,
    pub url: String,
}

#[derive(Clone)]
pub struct FileService {
    storage: Arc<dyn ObjectStorage>,
}

impl FileService {
    pub fn new(storage: Arc<dyn ObjectStorage>) -> Self {
        Self { storage }
    }

    #[instrument(skip(self, content), fields(bytes = content.len()))]
    pub async fn upload(
        &self,
        filename: &str,
        content_type: Option<&str>,
        content: &[u8],
    ) -> Result<UploadedFile, DomainError> {
        let filename = filename.trim();
        if filename.is_empty() || filename.contains(['/', '\\']) {
            return Err(DomainError::InvalidInput(
                "Filename must be a plain, non-empty name".into(),
            ));
        }
        if content.is_empty() {
            return Err(DomainError::InvalidInput("File must not be empty".into()));
        }

        let object = format!("{}_{}", Utc::now().timestamp_millis(), filename);
        let content_type = content_type.unwrap_or(DEFAULT_CONTENT_TYPE);

        self.storage
            .put_object(&object, content_type, content)
            .await
            .map_err(storage_error)?;
        let url = self
            .storage
            .presigned_url(&object, URL_EXPIRY)
            .await
            .map_err(storage_error)?;

        info!(object = %object, "file uploaded");
        Ok(UploadedFile { object, url })
    }
}

fn storage_error(err: StorageError) -> DomainError {
    match err {
        StorageError::InvalidName(name) => {
            DomainError::InvalidInput(format!("invalid file name: {}", name))
        }
        other => DomainError::Internal(other.to_string()),
    }
}
