//! Test helpers: a document store over a temp-dir SQLite database and a
//! temp-dir blob directory, driven by a manual clock.
//!
//! Run from workspace root: `cargo test -p docvault-services`.

#![allow(dead_code)]

pub mod storage;

use bytes::Bytes;
use chrono::Utc;
use docvault_core::{Clock, ManualClock, ReconciliationSettings, StoreSettings};
use docvault_services::{DocumentStore, LocalStorage, ReconciliationService, Storage};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Size ceiling used by every test store.
pub const TEST_MAX_FILE_SIZE: usize = 4096;

/// One hour sweep interval; grace window is twice that.
pub const TEST_SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

/// Test store: service handles plus owned temp dirs.
pub struct TestStore {
    pub store: Arc<DocumentStore>,
    pub reconciliation: Arc<ReconciliationService>,
    pub clock: Arc<ManualClock>,
    pub storage: Arc<dyn Storage>,
    pub local: LocalStorage,
    pub pool: SqlitePool,
    pub _db_dir: TempDir,
    pub _blob_dir: TempDir,
}

impl TestStore {
    pub fn now(&self) -> chrono::DateTime<Utc> {
        self.clock.now()
    }

    /// Keys currently present in the blob directory.
    pub async fn blob_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .local
            .list_blobs()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.key)
            .collect();
        keys.sort();
        keys
    }

    pub async fn session_count(&self) -> i64 {
        sqlx::query_scalar::<sqlx::Sqlite, i64>("SELECT COUNT(*) FROM sessions")
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    pub async fn document_count(&self) -> i64 {
        sqlx::query_scalar::<sqlx::Sqlite, i64>("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    /// Make every subsequent document insert fail.
    pub async fn fail_document_inserts(&self) {
        sqlx::query(
            r#"
            CREATE TRIGGER fail_document_insert BEFORE INSERT ON documents
            BEGIN
                SELECT RAISE(ABORT, 'forced insert failure');
            END;
            "#,
        )
        .execute(&self.pool)
        .await
        .unwrap();
    }
}

/// Store over plain local storage.
pub async fn setup_test_store() -> TestStore {
    setup_test_store_with(|local| Arc::new(local) as Arc<dyn Storage>).await
}

/// Store whose blob backend is built from the local storage by `wrap`, for
/// injecting failures.
pub async fn setup_test_store_with<F>(wrap: F) -> TestStore
where
    F: FnOnce(LocalStorage) -> Arc<dyn Storage>,
{
    let db_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let blob_dir = tempfile::tempdir().expect("Failed to create temp directory");

    let url = format!("sqlite://{}", db_dir.path().join("docvault.db").display());
    let pool = docvault_db::connect(&url, 4, Duration::from_secs(5))
        .await
        .expect("Failed to open test database");

    let local = LocalStorage::new(blob_dir.path())
        .await
        .expect("Failed to create local storage");
    let storage = wrap(local.clone());

    let clock = Arc::new(ManualClock::new(Utc::now()));
    let settings = StoreSettings {
        max_file_size_bytes: TEST_MAX_FILE_SIZE,
        ..StoreSettings::default()
    };

    let store = Arc::new(DocumentStore::new(
        pool.clone(),
        storage.clone(),
        clock.clone(),
        settings,
    ));
    let reconciliation = Arc::new(ReconciliationService::new(
        store.clone(),
        ReconciliationSettings::from_interval(TEST_SWEEP_INTERVAL, 2.0),
    ));

    TestStore {
        store,
        reconciliation,
        clock,
        storage,
        local,
        pool,
        _db_dir: db_dir,
        _blob_dir: blob_dir,
    }
}

/// A PDF-looking payload of exactly `len` bytes.
pub fn pdf_bytes(len: usize) -> Bytes {
    let mut data = b"%PDF-1.4\n".to_vec();
    data.resize(len, b'x');
    data.truncate(len);
    Bytes::from(data)
}
