//! Database repositories for data access layer
//!
//! Rows are read into fixed-shape `*Row` structs and validated into domain
//! types at this boundary; a malformed row surfaces as an error instead of
//! leaking past the repository.

pub mod document;
pub mod session;
pub mod transaction;

pub use document::DocumentRepository;
pub use session::SessionRepository;

use chrono::{DateTime, Utc};
use docvault_core::AppError;
use uuid::Uuid;

pub(crate) fn timestamp_from_millis(millis: i64, column: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| AppError::Internal(format!("Invalid {} in row: {}", column, millis)))
}

pub(crate) fn uuid_from_text(value: &str, column: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(value)
        .map_err(|e| AppError::Internal(format!("Invalid {} in row: {}: {}", column, value, e)))
}

#[cfg(test)]
pub(crate) mod test_support {
    use sqlx::SqlitePool;
    use std::time::Duration;
    use tempfile::TempDir;

    /// File-backed database in a temp dir; keep the TempDir alive for the test.
    pub async fn test_pool() -> (TempDir, SqlitePool) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("test.db").display());
        let pool = crate::setup::connect(&url, 4, Duration::from_secs(5))
            .await
            .unwrap();
        (dir, pool)
    }
}
