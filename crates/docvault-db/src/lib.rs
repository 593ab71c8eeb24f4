//! Docvault metadata store
//!
//! SQLite access layer for the `sessions` and `documents` tables. Every query
//! that depends on time takes `now` as a parameter; the database clock is never
//! consulted.

pub mod db;
pub mod setup;

pub use db::transaction::TransactionGuard;
pub use db::{DocumentRepository, SessionRepository};
pub use setup::{connect, health_check, setup_database};
pub use sqlx::SqlitePool;
