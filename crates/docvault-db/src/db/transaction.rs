//! Database transaction utilities
//!
//! Multi-statement changes (a session cascade, a document delete) go through
//! [`TransactionGuard`] so they commit or roll back as one unit.

use docvault_core::AppError;
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::ops::{Deref, DerefMut};

/// A transaction that must be committed explicitly.
///
/// Dropping the guard without calling [`commit`](Self::commit) rolls the
/// transaction back when the connection returns to the pool.
///
/// # Example
///
/// ```ignore
/// use docvault_db::TransactionGuard;
///
/// async fn example(pool: &sqlx::SqlitePool) -> Result<(), docvault_core::AppError> {
///     let mut tx = TransactionGuard::begin(pool).await?;
///     sqlx::query("DELETE FROM documents WHERE session_id = ?1")
///         .bind("...")
///         .execute(&mut **tx)
///         .await?;
///     tx.commit().await
/// }
/// ```
pub struct TransactionGuard {
    transaction: Transaction<'static, Sqlite>,
}

impl TransactionGuard {
    /// Begin a new database transaction
    pub async fn begin(pool: &SqlitePool) -> Result<Self, AppError> {
        let transaction = pool.begin().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to begin database transaction");
            AppError::Database(e)
        })?;

        Ok(Self { transaction })
    }

    /// Commit the transaction
    pub async fn commit(self) -> Result<(), AppError> {
        self.transaction.commit().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to commit database transaction");
            AppError::Database(e)
        })
    }

    /// Roll the transaction back explicitly
    pub async fn rollback(self) -> Result<(), AppError> {
        self.transaction.rollback().await.map_err(|e| {
            tracing::warn!(error = %e, "Failed to rollback database transaction");
            AppError::Database(e)
        })
    }
}

impl Deref for TransactionGuard {
    type Target = Transaction<'static, Sqlite>;

    fn deref(&self) -> &Self::Target {
        &self.transaction
    }
}

impl DerefMut for TransactionGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.transaction
    }
}
