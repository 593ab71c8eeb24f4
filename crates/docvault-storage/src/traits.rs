//! Storage abstraction trait
//!
//! This module defines the Storage trait that all blob backends must implement.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
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

    #[error("List failed: {0}")]
    ListFailed(String),

    #[error("Blob not found: {0}")]
    NotFound(String),

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

/// One entry of a blob listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobMeta {
    pub key: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

/// Blob directory abstraction
///
/// Blobs are immutable: a key is written once and then only read or deleted.
/// Implementations must make `upload_with_key` atomic from a reader's point of
/// view, so `download` never returns a partially written blob.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Write `data` under `storage_key`.
    async fn upload_with_key(&self, storage_key: &str, data: Bytes) -> StorageResult<()>;

    /// Read a whole blob. Missing keys yield [`StorageError::NotFound`].
    async fn download(&self, storage_key: &str) -> StorageResult<Bytes>;

    /// Delete a blob. Deleting a missing key succeeds.
    async fn delete(&self, storage_key: &str) -> StorageResult<()>;

    /// Every blob currently present, with its last-modified time.
    ///
    /// Includes blobs no metadata row references; this is what orphan
    /// reconciliation diffs against.
    async fn list_blobs(&self) -> StorageResult<Vec<BlobMeta>>;

    /// Cheap reachability probe for health endpoints.
    async fn health_check(&self) -> StorageResult<()>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
