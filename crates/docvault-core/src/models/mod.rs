//! Data models for the store
//!
//! Fixed-shape records for the two persisted entities plus the handle returned
//! to upload and display callers.

mod document;
mod session;

pub use document::{classify_file_type, Document, DocumentHandle, FileType, NewDocument};
pub use session::Session;
