//! Shared key generation and validation for storage backends.
//!
//! Keys are a UUID v4 in simple form (32 lowercase hex characters). They are
//! never derived from user input and never reused.

use crate::{StorageError, StorageResult};
use uuid::Uuid;

/// Prefix of in-flight local writes. Listed like any blob so that writes
/// interrupted by a crash age out through orphan reconciliation.
pub const STAGING_PREFIX: &str = ".tmp-";

/// Generate a fresh storage key.
pub fn generate_storage_key() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Reject keys that could escape a flat namespace.
pub fn validate_storage_key(storage_key: &str) -> StorageResult<()> {
    if storage_key.is_empty()
        || storage_key == "."
        || storage_key.contains("..")
        || storage_key.contains('/')
        || storage_key.contains('\\')
        || storage_key.contains('\0')
    {
        return Err(StorageError::InvalidKey(format!(
            "Storage key contains invalid characters: {:?}",
            storage_key
        )));
    }
    Ok(())
}
