//! Docvault Storage Library
//!
//! This crate provides the blob directory abstraction: the [`Storage`] trait and
//! its local filesystem and S3 implementations.
//!
//! # Key format
//!
//! The namespace is flat. Keys are server-generated (see [`generate_storage_key`]),
//! carry no extension and never contain `/`, `\` or `..`. Callers must not assume
//! any path semantics beyond "one key, one blob".

mod error;
pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use docvault_core::StorageBackend;
pub use factory::create_storage;
pub use keys::{generate_storage_key, validate_storage_key};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{BlobMeta, Storage, StorageError, StorageResult};
