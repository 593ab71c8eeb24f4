//! Document store: binds blob writes to metadata rows.
//!
//! Upload writes the blob before inserting its row and removes the blob again
//! if the insert fails. Delete removes the row before the blob. A crash in
//! either protocol leaves at worst an unreferenced blob, which the orphan sweep
//! in [`crate::reconciliation`] collects once it is older than the grace window.

use bytes::Bytes;
use chrono::{DateTime, TimeDelta, Utc};
use docvault_core::models::{
    classify_file_type, Document, DocumentHandle, FileType, NewDocument, Session,
};
use docvault_core::{
    AppError, Clock, RetrievalUrl, RetrievalUrlBuilder, StoreSettings, UploadValidator,
};
use docvault_db::{DocumentRepository, SessionRepository, SqlitePool};
use docvault_storage::{generate_storage_key, BlobMeta, Storage};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

#[derive(Clone)]
pub struct DocumentStore {
    pool: SqlitePool,
    sessions: SessionRepository,
    documents: DocumentRepository,
    storage: Arc<dyn Storage>,
    clock: Arc<dyn Clock>,
    settings: StoreSettings,
    validator: UploadValidator,
    urls: RetrievalUrlBuilder,
}

impl DocumentStore {
    pub fn new(
        pool: SqlitePool,
        storage: Arc<dyn Storage>,
        clock: Arc<dyn Clock>,
        settings: StoreSettings,
    ) -> Self {
        Self {
            sessions: SessionRepository::new(pool.clone()),
            documents: DocumentRepository::new(pool.clone()),
            pool,
            storage,
            clock,
            validator: UploadValidator::new(settings.max_file_size_bytes),
            urls: RetrievalUrlBuilder::new(settings.retrieval_base_path.clone()),
            settings,
        }
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    /// Current time according to the injected clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Store a PDF under a live session.
    ///
    /// A missing or non-live `session_id` gets a fresh session with the
    /// default TTL. `file_type` overrides the filename heuristic when given.
    /// Nothing is written unless `data` passes the size and signature checks.
    #[tracing::instrument(skip(self, data), fields(file_name = %file_name, size = data.len()))]
    pub async fn upload(
        &self,
        session_id: Option<Uuid>,
        file_name: &str,
        file_type: Option<FileType>,
        data: Bytes,
    ) -> Result<DocumentHandle, AppError> {
        self.validator.validate(&data)?;

        let now = self.clock.now();
        let session_id = self.resolve_session(session_id, now).await?;
        let file_type = file_type.unwrap_or_else(|| classify_file_type(file_name));

        let storage_key = generate_storage_key();
        self.storage.upload_with_key(&storage_key, data).await?;

        let new_document = NewDocument {
            session_id,
            file_name: file_name.to_string(),
            storage_key: storage_key.clone(),
            file_type,
            uploaded_at: now,
        };

        let document = match self.documents.create(&new_document).await {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    storage_key = %storage_key,
                    "Document insert failed, removing uploaded blob"
                );
                if let Err(delete_err) = self.storage.delete(&storage_key).await {
                    tracing::error!(
                        error = %delete_err,
                        storage_key = %storage_key,
                        "Failed to remove blob after insert failure, leaving it to the orphan sweep"
                    );
                }
                return Err(e);
            }
        };

        tracing::info!(
            document_id = document.id,
            session_id = %document.session_id,
            file_type = %document.file_type,
            "Document uploaded"
        );

        Ok(self.handle(&document))
    }

    /// Blob bytes of a document owned by a live session.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_blob(&self, session_id: Uuid, document_id: i64) -> Result<Bytes, AppError> {
        let document = self
            .documents
            .get_for_live_session(session_id, document_id, self.clock.now())
            .await?
            .ok_or_else(|| document_not_found(session_id, document_id))?;

        Ok(self.storage.download(document.storage_key()).await?)
    }

    /// Resolve a retrieval URL and fetch the blob it names.
    pub async fn fetch_by_url(&self, url: &str) -> Result<Bytes, AppError> {
        let RetrievalUrl {
            session_id,
            document_id,
        } = self.parse_retrieval_url(url)?;
        self.fetch_blob(session_id, document_id).await
    }

    /// Most recently uploaded document of a live session.
    #[tracing::instrument(skip(self))]
    pub async fn latest_document(&self, session_id: Uuid) -> Result<DocumentHandle, AppError> {
        let document = self
            .documents
            .latest_for_live_session(session_id, self.clock.now())
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("No documents for session {}", session_id))
            })?;

        Ok(self.handle(&document))
    }

    /// All documents of a live session, newest first. Empty for an unknown or
    /// expired session.
    #[tracing::instrument(skip(self))]
    pub async fn list_documents(&self, session_id: Uuid) -> Result<Vec<DocumentHandle>, AppError> {
        let documents = self
            .documents
            .list_for_live_session(session_id, self.clock.now())
            .await?;

        Ok(documents.iter().map(|d| self.handle(d)).collect())
    }

    /// Delete a document: row first, then blob.
    ///
    /// A failed blob delete is logged and otherwise ignored; the blob is then
    /// an orphan.
    #[tracing::instrument(skip(self))]
    pub async fn delete_document(&self, session_id: Uuid, document_id: i64) -> Result<(), AppError> {
        let storage_key = self
            .documents
            .delete_for_live_session(session_id, document_id, self.clock.now())
            .await?
            .ok_or_else(|| document_not_found(session_id, document_id))?;

        match self.storage.delete(&storage_key).await {
            Ok(()) => {
                tracing::info!(document_id, storage_key = %storage_key, "Document deleted");
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    document_id,
                    storage_key = %storage_key,
                    "Document row deleted but blob delete failed, leaving it to the orphan sweep"
                );
            }
        }

        Ok(())
    }

    /// Resolve a retrieval URL and delete the document it names.
    pub async fn delete_by_url(&self, url: &str) -> Result<(), AppError> {
        let RetrievalUrl {
            session_id,
            document_id,
        } = self.parse_retrieval_url(url)?;
        self.delete_document(session_id, document_id).await
    }

    /// Create an empty session expiring `ttl` from now.
    #[tracing::instrument(skip(self))]
    pub async fn create_session(&self, ttl: Duration) -> Result<Uuid, AppError> {
        self.create_session_at(self.clock.now(), ttl).await
    }

    /// False for unknown sessions as well as expired ones.
    pub async fn is_live(&self, session_id: Uuid) -> Result<bool, AppError> {
        let now = self.clock.now();
        Ok(self
            .sessions
            .get_by_id(session_id)
            .await?
            .is_some_and(|session| session.is_live_at(now)))
    }

    /// Hard-delete a session with its documents and blobs, live or not.
    ///
    /// Returns the number of documents removed.
    #[tracing::instrument(skip(self))]
    pub async fn expire_session(&self, session_id: Uuid) -> Result<usize, AppError> {
        self.cascade_session(session_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Session {} not found", session_id)))
    }

    /// Metadata store round trip plus blob backend probe.
    pub async fn health(&self) -> Result<(), AppError> {
        docvault_db::health_check(&self.pool).await?;
        self.storage.health_check().await?;
        Ok(())
    }

    pub fn parse_retrieval_url(&self, url: &str) -> Result<RetrievalUrl, AppError> {
        self.urls.parse(url)
    }

    /// Every blob in the blob directory, referenced or not.
    pub async fn list_blobs(&self) -> Result<Vec<BlobMeta>, AppError> {
        Ok(self.storage.list_blobs().await?)
    }

    /// Storage keys of every document row, including rows of expired sessions
    /// not yet reaped.
    pub async fn list_referenced_keys(&self) -> Result<HashSet<String>, AppError> {
        Ok(self
            .documents
            .list_storage_keys()
            .await?
            .into_iter()
            .collect())
    }

    /// Delete a blob without touching metadata.
    pub async fn raw_delete_blob(&self, storage_key: &str) -> Result<(), AppError> {
        Ok(self.storage.delete(storage_key).await?)
    }

    /// Sessions whose expiry is strictly before `now`.
    pub async fn expired_sessions(&self, now: DateTime<Utc>) -> Result<Vec<Session>, AppError> {
        self.sessions.get_expired(now).await
    }

    /// Delete a session's rows in one transaction, then its blobs.
    ///
    /// `None` if the session does not exist. Blob delete failures are logged;
    /// the blobs become orphans.
    pub(crate) async fn cascade_session(&self, session_id: Uuid) -> Result<Option<usize>, AppError> {
        let Some(storage_keys) = self.sessions.delete_with_documents(session_id).await? else {
            return Ok(None);
        };

        for storage_key in &storage_keys {
            if let Err(e) = self.storage.delete(storage_key).await {
                tracing::warn!(
                    error = %e,
                    session_id = %session_id,
                    storage_key = %storage_key,
                    "Failed to delete blob of removed session, leaving it to the orphan sweep"
                );
            }
        }

        tracing::info!(
            session_id = %session_id,
            documents = storage_keys.len(),
            "Session removed"
        );

        Ok(Some(storage_keys.len()))
    }

    async fn resolve_session(
        &self,
        session_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<Uuid, AppError> {
        if let Some(id) = session_id {
            if self.sessions.get_live(id, now).await?.is_some() {
                return Ok(id);
            }
            tracing::debug!(session_id = %id, "Session not live, starting a new one");
        }
        self.create_session_at(now, self.settings.session_ttl).await
    }

    async fn create_session_at(&self, now: DateTime<Utc>, ttl: Duration) -> Result<Uuid, AppError> {
        let expires_at = TimeDelta::from_std(ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| AppError::InvalidInput(format!("Session TTL out of range: {:?}", ttl)))?;

        let session = Session {
            id: Uuid::new_v4(),
            created_at: now,
            expires_at,
        };
        self.sessions.create(&session).await?;

        tracing::debug!(session_id = %session.id, expires_at = %session.expires_at, "Session created");
        Ok(session.id)
    }

    fn handle(&self, document: &Document) -> DocumentHandle {
        DocumentHandle {
            document_id: document.id,
            session_id: document.session_id,
            file_name: document.file_name.clone(),
            file_type: document.file_type,
            uploaded_at: document.uploaded_at,
            url: self.urls.build(document.session_id, document.id),
        }
    }
}

fn document_not_found(session_id: Uuid, document_id: i64) -> AppError {
    AppError::NotFound(format!(
        "Document {} not found in session {}",
        document_id, session_id
    ))
}
