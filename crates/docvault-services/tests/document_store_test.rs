//! Document store integration tests: upload, fetch, latest, delete and
//! session lifecycle against SQLite and local storage.

mod helpers;

use chrono::TimeDelta;
use docvault_core::{AppError, FileType, ValidationError};
use docvault_services::Storage;
use helpers::storage::FlakyDeleteStorage;
use helpers::{pdf_bytes, setup_test_store, setup_test_store_with, TEST_MAX_FILE_SIZE};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_upload_fetch_delete_round_trip() {
    let t = setup_test_store().await;
    let data = pdf_bytes(1024);
    assert!(data.starts_with(b"%PDF-1.4"));

    let handle = t
        .store
        .upload(None, "payslip.pdf", None, data.clone())
        .await
        .unwrap();
    assert_eq!(handle.document_id, 1);
    assert_eq!(handle.file_name, "payslip.pdf");
    assert_eq!(handle.file_type, FileType::PaySlip);
    assert_eq!(
        handle.url,
        format!("/documents/{}/{}", handle.session_id, handle.document_id)
    );

    let fetched = t
        .store
        .fetch_blob(handle.session_id, handle.document_id)
        .await
        .unwrap();
    assert_eq!(fetched, data);

    t.store
        .delete_document(handle.session_id, handle.document_id)
        .await
        .unwrap();

    let err = t
        .store
        .fetch_blob(handle.session_id, handle.document_id)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(t.blob_keys().await.is_empty());
}

#[tokio::test]
async fn test_upload_creates_session_when_absent_or_expired() {
    let t = setup_test_store().await;

    let first = t
        .store
        .upload(None, "a.pdf", None, pdf_bytes(64))
        .await
        .unwrap();
    assert!(t.store.is_live(first.session_id).await.unwrap());

    let second = t
        .store
        .upload(Some(first.session_id), "b.pdf", None, pdf_bytes(64))
        .await
        .unwrap();
    assert_eq!(second.session_id, first.session_id);

    t.clock.advance(TimeDelta::hours(25));
    assert!(!t.store.is_live(first.session_id).await.unwrap());

    let third = t
        .store
        .upload(Some(first.session_id), "c.pdf", None, pdf_bytes(64))
        .await
        .unwrap();
    assert_ne!(third.session_id, first.session_id);
    assert!(t.store.is_live(third.session_id).await.unwrap());
}

#[tokio::test]
async fn test_upload_classifies_file_type() {
    let t = setup_test_store().await;

    let form16 = t
        .store
        .upload(None, "Form-16_2024.pdf", None, pdf_bytes(64))
        .await
        .unwrap();
    assert_eq!(form16.file_type, FileType::Form16);

    let salary = t
        .store
        .upload(Some(form16.session_id), "March Salary.pdf", None, pdf_bytes(64))
        .await
        .unwrap();
    assert_eq!(salary.file_type, FileType::SalarySlip);

    let hinted = t
        .store
        .upload(
            Some(form16.session_id),
            "scan.pdf",
            Some(FileType::Form16),
            pdf_bytes(64),
        )
        .await
        .unwrap();
    assert_eq!(hinted.file_type, FileType::Form16);
}

#[tokio::test]
async fn test_upload_over_ceiling_is_rejected_without_side_effects() {
    let t = setup_test_store().await;

    let err = t
        .store
        .upload(None, "big.pdf", None, pdf_bytes(TEST_MAX_FILE_SIZE + 1))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Validation(ValidationError::FileTooLarge { .. })
    ));
    assert!(t.blob_keys().await.is_empty());
    assert_eq!(t.session_count().await, 0);
    assert_eq!(t.document_count().await, 0);

    t.store
        .upload(None, "exact.pdf", None, pdf_bytes(TEST_MAX_FILE_SIZE))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_upload_rejects_non_pdf() {
    let t = setup_test_store().await;

    let err = t
        .store
        .upload(None, "image.pdf", None, bytes::Bytes::from_static(b"\x89PNG\r\n"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Validation(ValidationError::InvalidSignature)
    ));

    let err = t
        .store
        .upload(None, "empty.pdf", None, bytes::Bytes::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(ValidationError::EmptyFile)));

    assert!(t.blob_keys().await.is_empty());
    assert_eq!(t.session_count().await, 0);
}

#[tokio::test]
async fn test_failed_insert_removes_blob() {
    let t = setup_test_store().await;
    let session_id = t.store.create_session(Duration::from_secs(3600)).await.unwrap();
    t.fail_document_inserts().await;

    let result = t
        .store
        .upload(Some(session_id), "a.pdf", None, pdf_bytes(128))
        .await;
    assert!(matches!(result, Err(AppError::Database(_))));
    assert!(t.blob_keys().await.is_empty());
    assert_eq!(t.document_count().await, 0);
}

#[tokio::test]
async fn test_fetch_is_scoped_to_live_owner() {
    let t = setup_test_store().await;
    let handle = t
        .store
        .upload(None, "a.pdf", None, pdf_bytes(128))
        .await
        .unwrap();
    let other = t.store.create_session(Duration::from_secs(3600)).await.unwrap();

    assert!(t
        .store
        .fetch_blob(other, handle.document_id)
        .await
        .unwrap_err()
        .is_not_found());
    assert!(t
        .store
        .fetch_blob(handle.session_id, handle.document_id + 1)
        .await
        .unwrap_err()
        .is_not_found());

    t.clock.advance(TimeDelta::hours(24));
    assert!(t
        .store
        .fetch_blob(handle.session_id, handle.document_id)
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
async fn test_fetch_missing_blob_is_not_found() {
    let t = setup_test_store().await;
    let handle = t
        .store
        .upload(None, "a.pdf", None, pdf_bytes(128))
        .await
        .unwrap();

    for key in t.blob_keys().await {
        t.store.raw_delete_blob(&key).await.unwrap();
    }

    let err = t
        .store
        .fetch_blob(handle.session_id, handle.document_id)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_delete_twice_is_not_found_the_second_time() {
    let t = setup_test_store().await;
    let handle = t
        .store
        .upload(None, "a.pdf", None, pdf_bytes(128))
        .await
        .unwrap();

    t.store
        .delete_document(handle.session_id, handle.document_id)
        .await
        .unwrap();
    let err = t
        .store
        .delete_document(handle.session_id, handle.document_id)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_delete_tolerates_blob_failure() {
    let t = setup_test_store_with(|local| {
        Arc::new(FlakyDeleteStorage::new(local, 1)) as Arc<dyn Storage>
    })
    .await;
    let handle = t
        .store
        .upload(None, "a.pdf", None, pdf_bytes(128))
        .await
        .unwrap();

    t.store
        .delete_document(handle.session_id, handle.document_id)
        .await
        .unwrap();

    assert_eq!(t.document_count().await, 0);
    assert_eq!(t.blob_keys().await.len(), 1);
}

#[tokio::test]
async fn test_latest_and_list_documents() {
    let t = setup_test_store().await;
    let first = t
        .store
        .upload(None, "first.pdf", None, pdf_bytes(64))
        .await
        .unwrap();

    t.clock.advance(TimeDelta::minutes(5));
    let second = t
        .store
        .upload(Some(first.session_id), "second.pdf", None, pdf_bytes(64))
        .await
        .unwrap();

    let latest = t.store.latest_document(first.session_id).await.unwrap();
    assert_eq!(latest, second);

    let ids: Vec<i64> = t
        .store
        .list_documents(first.session_id)
        .await
        .unwrap()
        .into_iter()
        .map(|h| h.document_id)
        .collect();
    assert_eq!(ids, vec![second.document_id, first.document_id]);

    let empty = t.store.create_session(Duration::from_secs(60)).await.unwrap();
    assert!(t
        .store
        .latest_document(empty)
        .await
        .unwrap_err()
        .is_not_found());
    assert!(t.store.list_documents(empty).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_expire_session_removes_rows_and_blobs() {
    let t = setup_test_store().await;
    let handle = t
        .store
        .upload(None, "a.pdf", None, pdf_bytes(64))
        .await
        .unwrap();
    t.store
        .upload(Some(handle.session_id), "b.pdf", None, pdf_bytes(64))
        .await
        .unwrap();

    let removed = t.store.expire_session(handle.session_id).await.unwrap();
    assert_eq!(removed, 2);
    assert!(!t.store.is_live(handle.session_id).await.unwrap());
    assert_eq!(t.document_count().await, 0);
    assert!(t.blob_keys().await.is_empty());

    assert!(t
        .store
        .expire_session(handle.session_id)
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
async fn test_create_session_liveness() {
    let t = setup_test_store().await;
    let session_id = t.store.create_session(Duration::from_secs(60)).await.unwrap();

    assert!(t.store.is_live(session_id).await.unwrap());
    t.clock.advance(TimeDelta::seconds(59));
    assert!(t.store.is_live(session_id).await.unwrap());
    t.clock.advance(TimeDelta::seconds(1));
    assert!(!t.store.is_live(session_id).await.unwrap());

    assert!(!t.store.is_live(uuid::Uuid::new_v4()).await.unwrap());
}

#[tokio::test]
async fn test_url_round_trip() {
    let t = setup_test_store().await;
    let data = pdf_bytes(256);
    let handle = t
        .store
        .upload(None, "a.pdf", None, data.clone())
        .await
        .unwrap();

    assert_eq!(t.store.fetch_by_url(&handle.url).await.unwrap(), data);
    t.store.delete_by_url(&handle.url).await.unwrap();
    assert!(t
        .store
        .fetch_by_url(&handle.url)
        .await
        .unwrap_err()
        .is_not_found());

    let err = t.store.fetch_by_url("/elsewhere/1/2").await.unwrap_err();
    assert!(matches!(err, AppError::InvalidInput(_)));
}

#[tokio::test]
async fn test_concurrent_uploads_to_one_session() {
    let t = setup_test_store().await;
    let session_id = t.store.create_session(Duration::from_secs(3600)).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = t.store.clone();
        handles.push(tokio::spawn(async move {
            store
                .upload(Some(session_id), &format!("doc-{i}.pdf"), None, pdf_bytes(256))
                .await
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        let uploaded = handle.await.unwrap().unwrap();
        assert_eq!(uploaded.session_id, session_id);
        ids.push(uploaded.document_id);
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 8);
    assert_eq!(t.blob_keys().await.len(), 8);
    assert_eq!(t.session_count().await, 1);
}

#[tokio::test]
async fn test_health() {
    let t = setup_test_store().await;
    t.store.health().await.unwrap();
}
