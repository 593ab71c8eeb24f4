//! Blob backends that wrap [`LocalStorage`] to inject failures or pauses.

use async_trait::async_trait;
use bytes::Bytes;
use docvault_services::{
    BlobMeta, LocalStorage, Storage, StorageBackend, StorageError, StorageResult,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Fails the first `failing_deletes` delete calls, then behaves normally.
pub struct FlakyDeleteStorage {
    inner: LocalStorage,
    remaining_failures: AtomicUsize,
}

impl FlakyDeleteStorage {
    pub fn new(inner: LocalStorage, failing_deletes: usize) -> Self {
        Self {
            inner,
            remaining_failures: AtomicUsize::new(failing_deletes),
        }
    }
}

#[async_trait]
impl Storage for FlakyDeleteStorage {
    async fn upload_with_key(&self, storage_key: &str, data: Bytes) -> StorageResult<()> {
        self.inner.upload_with_key(storage_key, data).await
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Bytes> {
        self.inner.download(storage_key).await
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        let failing = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StorageError::DeleteFailed(format!(
                "injected failure for {}",
                storage_key
            )));
        }
        self.inner.delete(storage_key).await
    }

    async fn list_blobs(&self) -> StorageResult<Vec<BlobMeta>> {
        self.inner.list_blobs().await
    }

    async fn health_check(&self) -> StorageResult<()> {
        self.inner.health_check().await
    }

    fn backend_type(&self) -> StorageBackend {
        self.inner.backend_type()
    }
}

/// Pauses inside `list_blobs` until released, to hold a sweep mid-run.
///
/// `entered` is signalled when a listing starts; `release` lets it continue.
pub struct GatedListStorage {
    inner: LocalStorage,
    entered: Arc<Notify>,
    release: Arc<Notify>,
}

impl GatedListStorage {
    pub fn new(inner: LocalStorage, entered: Arc<Notify>, release: Arc<Notify>) -> Self {
        Self {
            inner,
            entered,
            release,
        }
    }
}

#[async_trait]
impl Storage for GatedListStorage {
    async fn upload_with_key(&self, storage_key: &str, data: Bytes) -> StorageResult<()> {
        self.inner.upload_with_key(storage_key, data).await
    }

    async fn download(&self, storage_key: &str) -> StorageResult<Bytes> {
        self.inner.download(storage_key).await
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        self.inner.delete(storage_key).await
    }

    async fn list_blobs(&self) -> StorageResult<Vec<BlobMeta>> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.list_blobs().await
    }

    async fn health_check(&self) -> StorageResult<()> {
        self.inner.health_check().await
    }

    fn backend_type(&self) -> StorageBackend {
        self.inner.backend_type()
    }
}
