//! Session repository: CRUD for the sessions table plus the expiry cascade.

use chrono::{DateTime, Utc};
use docvault_core::models::Session;
use docvault_core::AppError;
use sqlx::{Sqlite, SqlitePool};
use uuid::Uuid;

use super::transaction::TransactionGuard;
use super::{timestamp_from_millis, uuid_from_text};

/// Row type for sessions table (for FromRow).
#[derive(Debug, sqlx::FromRow)]
pub struct SessionRow {
    pub id: String,
    pub created_at: i64,
    pub expires_at: i64,
}

impl SessionRow {
    pub fn to_session(self) -> Result<Session, AppError> {
        Ok(Session {
            id: uuid_from_text(&self.id, "sessions.id")?,
            created_at: timestamp_from_millis(self.created_at, "sessions.created_at")?,
            expires_at: timestamp_from_millis(self.expires_at, "sessions.expires_at")?,
        })
    }
}

/// Repository for sessions table.
#[derive(Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a new session row.
    #[tracing::instrument(skip(self, session), fields(db.table = "sessions", db.record_id = %session.id))]
    pub async fn create(&self, session: &Session) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, created_at, expires_at)
            VALUES (?1, ?2, ?3)
            "#,
        )
        .bind(session.id.to_string())
        .bind(session.created_at.timestamp_millis())
        .bind(session.expires_at.timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Fetch a session by id regardless of expiry.
    #[tracing::instrument(skip(self), fields(db.table = "sessions", db.record_id = %id))]
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Session>, AppError> {
        let row: Option<SessionRow> = sqlx::query_as::<Sqlite, SessionRow>(
            "SELECT id, created_at, expires_at FROM sessions WHERE id = ?1",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(SessionRow::to_session).transpose()
    }

    /// Fetch a session only if it is live at `now`.
    #[tracing::instrument(skip(self), fields(db.table = "sessions", db.record_id = %id))]
    pub async fn get_live(&self, id: Uuid, now: DateTime<Utc>) -> Result<Option<Session>, AppError> {
        let row: Option<SessionRow> = sqlx::query_as::<Sqlite, SessionRow>(
            "SELECT id, created_at, expires_at FROM sessions WHERE id = ?1 AND expires_at > ?2",
        )
        .bind(id.to_string())
        .bind(now.timestamp_millis())
        .fetch_optional(&self.pool)
        .await?;
        row.map(SessionRow::to_session).transpose()
    }

    /// Sessions whose `expires_at` is strictly before `now`, oldest first.
    #[tracing::instrument(skip(self), fields(db.table = "sessions"))]
    pub async fn get_expired(&self, now: DateTime<Utc>) -> Result<Vec<Session>, AppError> {
        let rows: Vec<SessionRow> = sqlx::query_as::<Sqlite, SessionRow>(
            r#"
            SELECT id, created_at, expires_at
            FROM sessions
            WHERE expires_at < ?1
            ORDER BY expires_at ASC
            "#,
        )
        .bind(now.timestamp_millis())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(SessionRow::to_session).collect()
    }

    /// Delete a session and all of its documents in one transaction.
    ///
    /// Returns the storage keys the deleted documents referenced, or `None` if
    /// the session did not exist. Blobs are left for the caller to remove after
    /// the commit.
    #[tracing::instrument(skip(self), fields(db.table = "sessions", db.operation = "cascade_delete", db.record_id = %id))]
    pub async fn delete_with_documents(&self, id: Uuid) -> Result<Option<Vec<String>>, AppError> {
        let mut tx = TransactionGuard::begin(&self.pool).await?;

        let storage_keys: Vec<String> = sqlx::query_scalar::<Sqlite, String>(
            "DELETE FROM documents WHERE session_id = ?1 RETURNING storage_key",
        )
        .bind(id.to_string())
        .fetch_all(&mut **tx)
        .await?;

        let deleted = sqlx::query("DELETE FROM sessions WHERE id = ?1")
            .bind(id.to_string())
            .execute(&mut **tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        tx.commit().await?;

        tracing::debug!(
            session_id = %id,
            documents = storage_keys.len(),
            "Session rows deleted"
        );

        Ok(Some(storage_keys))
    }
}
