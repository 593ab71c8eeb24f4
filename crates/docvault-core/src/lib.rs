//! Docvault Core Library
//!
//! This crate provides the domain models, error types, configuration, clock and
//! upload validation shared by the storage, database and service crates.

pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod retrieval_url;
pub mod storage_types;
pub mod validation;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, DocvaultConfig, ReconciliationSettings, StoreSettings};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{classify_file_type, Document, DocumentHandle, FileType, NewDocument, Session};
pub use retrieval_url::{RetrievalUrl, RetrievalUrlBuilder};
pub use storage_types::StorageBackend;
pub use validation::{UploadValidator, ValidationError};
