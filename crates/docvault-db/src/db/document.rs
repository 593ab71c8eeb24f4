//! Document repository: CRUD for the documents table.
//!
//! Reads and deletes scoped to a session only match while that session is
//! live; an expired session's documents are invisible even before they are
//! reaped.

use chrono::{DateTime, Utc};
use docvault_core::models::{Document, FileType, NewDocument};
use docvault_core::AppError;
use sqlx::{Sqlite, SqlitePool};
use uuid::Uuid;

use super::transaction::TransactionGuard;
use super::{timestamp_from_millis, uuid_from_text};

/// Row type for documents table (for FromRow).
#[derive(Debug, sqlx::FromRow)]
pub struct DocumentRow {
    pub id: i64,
    pub session_id: String,
    pub file_name: String,
    pub storage_key: String,
    pub file_type: String,
    pub uploaded_at: i64,
}

impl DocumentRow {
    pub fn to_document(self) -> Result<Document, AppError> {
        let file_type = self.file_type.parse::<FileType>().map_err(|e| {
            AppError::Internal(format!("Invalid documents.file_type in row {}: {}", self.id, e))
        })?;

        Ok(Document {
            id: self.id,
            session_id: uuid_from_text(&self.session_id, "documents.session_id")?,
            file_name: self.file_name,
            storage_key: self.storage_key,
            file_type,
            uploaded_at: timestamp_from_millis(self.uploaded_at, "documents.uploaded_at")?,
        })
    }
}

/// Repository for documents table.
#[derive(Clone)]
pub struct DocumentRepository {
    pool: SqlitePool,
}

impl DocumentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a document row and return it with its assigned id.
    #[tracing::instrument(skip(self, document), fields(db.table = "documents", storage_key = %document.storage_key))]
    pub async fn create(&self, document: &NewDocument) -> Result<Document, AppError> {
        let row: DocumentRow = sqlx::query_as::<Sqlite, DocumentRow>(
            r#"
            INSERT INTO documents (session_id, file_name, storage_key, file_type, uploaded_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING id, session_id, file_name, storage_key, file_type, uploaded_at
            "#,
        )
        .bind(document.session_id.to_string())
        .bind(&document.file_name)
        .bind(&document.storage_key)
        .bind(document.file_type.as_str())
        .bind(document.uploaded_at.timestamp_millis())
        .fetch_one(&self.pool)
        .await?;
        row.to_document()
    }

    /// Fetch a document owned by a session that is live at `now`.
    #[tracing::instrument(skip(self), fields(db.table = "documents", db.record_id = document_id))]
    pub async fn get_for_live_session(
        &self,
        session_id: Uuid,
        document_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<Document>, AppError> {
        let row: Option<DocumentRow> = sqlx::query_as::<Sqlite, DocumentRow>(
            r#"
            SELECT d.id, d.session_id, d.file_name, d.storage_key, d.file_type, d.uploaded_at
            FROM documents d
            JOIN sessions s ON s.id = d.session_id
            WHERE d.id = ?1 AND d.session_id = ?2 AND s.expires_at > ?3
            "#,
        )
        .bind(document_id)
        .bind(session_id.to_string())
        .bind(now.timestamp_millis())
        .fetch_optional(&self.pool)
        .await?;
        row.map(DocumentRow::to_document).transpose()
    }

    /// All documents of a live session, newest first.
    #[tracing::instrument(skip(self), fields(db.table = "documents", session_id = %session_id))]
    pub async fn list_for_live_session(
        &self,
        session_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Vec<Document>, AppError> {
        let rows: Vec<DocumentRow> = sqlx::query_as::<Sqlite, DocumentRow>(
            r#"
            SELECT d.id, d.session_id, d.file_name, d.storage_key, d.file_type, d.uploaded_at
            FROM documents d
            JOIN sessions s ON s.id = d.session_id
            WHERE d.session_id = ?1 AND s.expires_at > ?2
            ORDER BY d.uploaded_at DESC, d.id DESC
            "#,
        )
        .bind(session_id.to_string())
        .bind(now.timestamp_millis())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(DocumentRow::to_document).collect()
    }

    /// Most recent document of a live session.
    #[tracing::instrument(skip(self), fields(db.table = "documents", session_id = %session_id))]
    pub async fn latest_for_live_session(
        &self,
        session_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<Document>, AppError> {
        let row: Option<DocumentRow> = sqlx::query_as::<Sqlite, DocumentRow>(
            r#"
            SELECT d.id, d.session_id, d.file_name, d.storage_key, d.file_type, d.uploaded_at
            FROM documents d
            JOIN sessions s ON s.id = d.session_id
            WHERE d.session_id = ?1 AND s.expires_at > ?2
            ORDER BY d.uploaded_at DESC, d.id DESC
            LIMIT 1
            "#,
        )
        .bind(session_id.to_string())
        .bind(now.timestamp_millis())
        .fetch_optional(&self.pool)
        .await?;
        row.map(DocumentRow::to_document).transpose()
    }

    /// Delete a document owned by a live session and return its storage key.
    ///
    /// `None` when the session is not live or does not own the document.
    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "delete", db.record_id = document_id))]
    pub async fn delete_for_live_session(
        &self,
        session_id: Uuid,
        document_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, AppError> {
        let mut tx = TransactionGuard::begin(&self.pool).await?;

        let storage_key: Option<String> = sqlx::query_scalar::<Sqlite, String>(
            r#"
            DELETE FROM documents
            WHERE id = ?1
              AND session_id = ?2
              AND EXISTS (SELECT 1 FROM sessions s WHERE s.id = ?2 AND s.expires_at > ?3)
            RETURNING storage_key
            "#,
        )
        .bind(document_id)
        .bind(session_id.to_string())
        .bind(now.timestamp_millis())
        .fetch_optional(&mut **tx)
        .await?;

        tx.commit().await?;
        Ok(storage_key)
    }

    /// Every storage key referenced by any row, live session or not.
    #[tracing::instrument(skip(self), fields(db.table = "documents"))]
    pub async fn list_storage_keys(&self) -> Result<Vec<String>, AppError> {
        let keys = sqlx::query_scalar::<Sqlite, String>("SELECT storage_key FROM documents")
            .fetch_all(&self.pool)
            .await?;
        Ok(keys)
    }

    /// Number of rows owned by a session, live or not.
    #[cfg(test)]
    #[tracing::instrument(skip(self), fields(db.table = "documents", session_id = %session_id))]
    pub async fn count_for_session(&self, session_id: Uuid) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<Sqlite, i64>(
            "SELECT COUNT(*) FROM documents WHERE session_id = ?1",
        )
        .bind(session_id.to_string())
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
