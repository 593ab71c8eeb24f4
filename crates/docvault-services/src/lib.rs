//! Docvault Services Layer
//!
//! This crate hosts the document store, which binds blob writes to metadata
//! rows, and the reconciliation service that cascades session expiry and
//! sweeps orphaned blobs. It re-exports the storage and database types callers
//! need so binaries depend on a single service facade.

pub mod document_store;
pub mod reconciliation;

pub use document_store::DocumentStore;
pub use reconciliation::{
    OrphanSweepReport, ReconciliationHandle, ReconciliationService, SweepOutcome, SweepReport,
};

pub use docvault_db::{setup_database, DocumentRepository, SessionRepository, SqlitePool};
pub use docvault_storage::{
    create_storage, BlobMeta, Storage, StorageBackend, StorageError, StorageResult,
};
#[cfg(feature = "storage-local")]
pub use docvault_storage::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use docvault_storage::S3Storage;
