//! Storage abstraction trait
//!
//! This module defines the Storage trait that all storage backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use aura_core::AppError;
use bytes::Bytes;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    /// A conditional write lost: the key already exists (`IfAbsent`) or changed (`IfMatch`).
    #[error("Precondition failed for key: {0}")]
    PreconditionFailed(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => AppError::NotFound(format!("Object not found: {}", key)),
            StorageError::InvalidKey(msg) => AppError::InvalidInput(msg),
            other => AppError::S3(other.to_string()),
        }
    }
}

/// Opaque version token of a stored object, used for compare-and-swap writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectVersion {
    pub e_tag: Option<String>,
    pub version: Option<String>,
}

/// An object read back from the store.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Bytes,
    pub version: ObjectVersion,
}

/// Write precondition for [`Storage::put`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PutCondition {
    /// Unconditional whole-object replace.
    #[default]
    Overwrite,
    /// Only create; fails with `PreconditionFailed` if the key exists.
    IfAbsent,
    /// Only replace the exact version previously read.
    IfMatch(ObjectVersion),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    pub key: String,
    pub size: u64,
}

/// One page of a prefix listing. `next_cursor` is the last key of the page when
/// more entries may follow; pass it back as `start_after`.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub entries: Vec<ObjectEntry>,
    pub next_cursor: Option<String>,
}

/// Storage abstraction trait
///
/// All storage backends (S3-compatible, local filesystem, in-memory) implement this
/// trait so the conversion pipeline never couples to a specific backend.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Fetch an object. Returns `StorageError::NotFound` when the key is absent.
    async fn get(&self, storage_key: &str) -> StorageResult<StoredObject>;

    /// Write an object under `storage_key` and return its public URL.
    ///
    /// Conditional writes that lose report `StorageError::PreconditionFailed`,
    /// never a generic upload failure, so callers can retry on it.
    async fn put(
        &self,
        storage_key: &str,
        data: Bytes,
        content_type: &str,
        condition: PutCondition,
    ) -> StorageResult<String>;

    /// Delete an object by its storage key
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// List objects under `prefix` in key order, starting strictly after `start_after`.
    async fn list_by_prefix(
        &self,
        prefix: &str,
        start_after: Option<&str>,
        limit: usize,
    ) -> StorageResult<ListPage>;

    /// Publicly reachable URL for a key.
    fn public_url(&self, storage_key: &str) -> String;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}

#[cfg(test)]
mod tests {
    use super::*;
    use aura_core::ErrorMetadata;

    #[test]
    fn test_storage_error_maps_to_app_error() {
        let err: AppError = StorageError::NotFound("uploads/a.docx".to_string()).into();
        assert_eq!(err.http_status_code(), 404);

        let err: AppError = StorageError::PreconditionFailed("k".to_string()).into();
        assert_eq!(err.error_code(), "STORAGE_ERROR");

        let err: AppError = StorageError::InvalidKey("bad".to_string()).into();
        assert_eq!(err.http_status_code(), 400);
    }
}
