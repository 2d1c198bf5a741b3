//! Integration tests for SqlitePrimaryStore
//!
//! Uses an in-memory database with the primary schema. Malformed rows are
//! inserted with raw SQL to mimic other writers of the shared tables.

use chrono::{Duration, Utc};

use vaultsync_cache::{DatabasePool, SqlitePrimaryStore};
use vaultsync_core::domain::{BackupDetails, PrimaryRecord, RecordStatus, RestoreRecord};
use vaultsync_core::ports::IPrimaryStore;

async fn setup() -> (DatabasePool, SqlitePrimaryStore) {
    let pool = DatabasePool::in_memory_primary()
        .await
        .expect("Failed to create in-memory primary database");
    let store = SqlitePrimaryStore::new(pool.pool().clone());
    (pool, store)
}

#[tokio::test]
async fn test_upsert_then_fetch_assigns_row_id() {
    let (_pool, store) = setup().await;
    let details = BackupDetails {
        file_path: Some("physical/bk-1.tar.gz".into()),
        file_size: Some(512),
        checksum: Some("abc".into()),
        ..BackupDetails::default()
    };
    let row = PrimaryRecord::new("bk-1", RecordStatus::Completed)
        .with_details(details.clone())
        .with_timestamps(Some(Utc::now() - Duration::minutes(2)), Some(Utc::now()));

    store.upsert_backup(&row).await.unwrap();

    let fetched = store.fetch_backups().await.unwrap();
    assert_eq!(fetched.len(), 1);
    assert!(fetched[0].row_id.is_some());
    assert!(fetched[0].same_content(&row));
    assert_eq!(fetched[0].details, details);
}

#[tokio::test]
async fn test_upsert_updates_in_place() {
    let (_pool, store) = setup().await;
    store
        .upsert_backup(&PrimaryRecord::new("bk-1", RecordStatus::Running))
        .await
        .unwrap();
    let first_id = store.get_backup("bk-1").await.unwrap().unwrap().row_id;

    let mut updated = PrimaryRecord::new("bk-1", RecordStatus::Failed);
    updated.details.error_message = Some("disk full".into());
    store.upsert_backup(&updated).await.unwrap();

    let fetched = store.fetch_backups().await.unwrap();
    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].row_id, first_id);
    assert_eq!(fetched[0].status.as_deref(), Some("failed"));
    assert_eq!(fetched[0].details.error_message.as_deref(), Some("disk full"));
}

#[tokio::test]
async fn test_upsert_rejects_missing_id() {
    let (_pool, store) = setup().await;
    let row = PrimaryRecord::default();
    assert!(store.upsert_backup(&row).await.is_err());
}

#[tokio::test]
async fn test_fetch_passes_malformed_rows_through() {
    let (pool, store) = setup().await;
    sqlx::query("INSERT INTO backup_records (backup_id, status) VALUES (NULL, 'completed')")
        .execute(pool.pool())
        .await
        .unwrap();
    sqlx::query("INSERT INTO backup_records (backup_id, status) VALUES ('bk-x', 'exploded')")
        .execute(pool.pool())
        .await
        .unwrap();

    let rows = store.fetch_backups().await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].require_id().is_err());
    assert!(rows[1].parsed_status().is_err());
}

#[tokio::test]
async fn test_get_backup_not_found() {
    let (_pool, store) = setup().await;
    assert!(store.get_backup("nope").await.unwrap().is_none());
}

#[tokio::test]
async fn test_restore_upsert_and_get() {
    let (_pool, store) = setup().await;
    let record = RestoreRecord::new("rs-1")
        .unwrap()
        .with_backup_id("bk-1")
        .with_status(RecordStatus::Completed)
        .with_progress(100)
        .with_restored_databases_count(3);

    store.upsert_restore(&record).await.unwrap();
    let fetched = store.get_restore("rs-1").await.unwrap().unwrap();
    assert!(fetched.same_content(&record));
    assert!(fetched.primary_row_id().is_some());

    let failed = record.clone().with_status(RecordStatus::Failed);
    store.upsert_restore(&failed).await.unwrap();
    let fetched = store.get_restore("rs-1").await.unwrap().unwrap();
    assert_eq!(fetched.status(), RecordStatus::Failed);
}
