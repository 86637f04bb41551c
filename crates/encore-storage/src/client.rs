//! Storage abstraction trait.

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;

use encore_core::models::UploadPart;
use encore_core::AppError;

/// Storage operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Multipart operation failed: {0}")]
    Multipart(String),

    #[error("Presign failed: {0}")]
    Presign(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Invalid parts: {0}")]
    InvalidParts(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidParts(msg) => AppError::Validation(msg),
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// Object store client.
///
/// Keys are bucket-relative paths (see [`crate::keys`]). All operations may
/// block on the network arbitrarily long; callers hand out their own
/// deadlines via presign TTLs and job-level cancellation.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Begin a multipart session for `key`; returns the provider's upload id.
    async fn create_multipart(&self, key: &str, content_type: &str) -> StorageResult<String>;

    /// One presigned PUT URL per part, ordered by part number (1-based).
    async fn presign_part_urls(
        &self,
        key: &str,
        upload_id: &str,
        part_count: usize,
    ) -> StorageResult<Vec<String>>;

    /// Finalize a multipart session. Parts must be strictly ascending by
    /// part number; etags are opaque.
    async fn complete_multipart(
        &self,
        key: &str,
        upload_id: &str,
        parts: &[UploadPart],
    ) -> StorageResult<()>;

    /// Best-effort cleanup of an unfinished multipart session.
    async fn abort_multipart(&self, key: &str, upload_id: &str) -> StorageResult<()>;

    /// Presigned GET URL for streaming reads (ffprobe/ffmpeg pull from this).
    async fn presign_get(&self, key: &str, ttl: Duration) -> StorageResult<String>;

    /// Direct upload of a small object; returns its public URL.
    async fn put_object(
        &self,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> StorageResult<String>;

    /// Delete an object. Missing objects are not an error.
    async fn delete_object(&self, key: &str) -> StorageResult<()>;

    /// Public (CDN) URL for a key.
    fn cdn_url(&self, key: &str) -> String;
}

/// Reject part lists that are empty or not strictly ascending by number.
pub(crate) fn validate_parts(parts: &[UploadPart]) -> StorageResult<()> {
    if parts.is_empty() {
        return Err(StorageError::InvalidParts("no parts provided".to_string()));
    }
    for pair in parts.windows(2) {
        if pair[1].part_number <= pair[0].part_number {
            return Err(StorageError::InvalidParts(format!(
                "part numbers must be strictly ascending, got {} after {}",
                pair[1].part_number, pair[0].part_number
            )));
        }
    }
    if parts[0].part_number < 1 {
        return Err(StorageError::InvalidParts(
            "part numbers are 1-based".to_string(),
        ));
    }
    Ok(())
}
