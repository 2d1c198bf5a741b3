//! Integration test: SyncLogger / StatisticsCollector -> SQLite -> query back
//!
//! Uses a real in-memory SQLite database to verify the full flow:
//! the logger builds entries, `ILocalStore` persists them, and the
//! statistics collector aggregates what was written.

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use vaultsync_audit::{ReasonCode, StatisticsCollector, SyncLogger};
use vaultsync_cache::{DatabasePool, SqliteLocalStore};
use vaultsync_core::{
    domain::{BackupRecord, RecordStatus, RecordType, RestoreRecord, SyncOperation, SyncStatus},
    ports::{FileCheck, ILocalStore},
};

async fn make_store() -> Arc<SqliteLocalStore> {
    let pool = DatabasePool::in_memory()
        .await
        .expect("Failed to create in-memory database");
    Arc::new(SqliteLocalStore::new(pool.pool().clone()))
}

#[tokio::test]
async fn test_logger_entries_persist_with_cycle_id() {
    let store = make_store().await;
    let cycle = Uuid::new_v4();
    let logger = SyncLogger::new(Arc::clone(&store) as Arc<dyn ILocalStore>).for_cycle(cycle);

    let mut record = BackupRecord::new("bk-1", RecordStatus::Completed).unwrap();
    let now = Utc::now();
    record
        .transition_sync(SyncStatus::Conflict, Some("status mismatch".into()), now)
        .unwrap();
    let entry = logger.detect_conflict_entry(
        "bk-1",
        RecordStatus::Completed,
        RecordStatus::Running,
        &FileCheck::Present,
        "status mismatch",
    );
    store.save_backup_with_log(&record, &entry).await.unwrap();

    logger
        .log_sync_to_primary(
            RecordType::Backup,
            "bk-1",
            RecordStatus::Completed,
            ReasonCode::PrimaryStale,
        )
        .await;

    let trail = store.get_log_for_record("bk-1").await.unwrap();
    assert_eq!(trail.len(), 2);
    assert_eq!(trail[0].operation(), SyncOperation::DetectConflict);
    assert_eq!(trail[0].file_exists(), Some(true));
    assert_eq!(trail[1].operation(), SyncOperation::SyncToPrimary);
    assert!(trail.iter().all(|e| e.cycle_id() == Some(cycle)));
}

#[tokio::test]
async fn test_statistics_on_empty_store() {
    let store = make_store().await;
    let stats = StatisticsCollector::new(store)
        .collect(Utc::now())
        .await
        .unwrap();

    assert_eq!(stats.total_records, 0);
    assert_eq!(stats.success_rate, 0.0);
    assert!(stats.last_sync_at.is_none());
    assert_eq!(stats.sync_status.len(), 4);
    assert!(stats.sync_status.values().all(|&n| n == 0));
    assert_eq!(stats.operations_24h.len(), SyncOperation::all().len());
    assert!(stats.operations_24h.values().all(|&n| n == 0));
}

#[tokio::test]
async fn test_statistics_aggregate_records_and_log() {
    let store = make_store().await;
    let now = Utc::now();
    let logger = SyncLogger::new(Arc::clone(&store) as Arc<dyn ILocalStore>);

    for (id, status) in [
        ("bk-1", RecordStatus::Completed),
        ("bk-2", RecordStatus::Completed),
        ("bk-3", RecordStatus::Failed),
        ("bk-4", RecordStatus::Running),
    ] {
        let mut record = BackupRecord::new(id, status).unwrap();
        record.transition_sync(SyncStatus::Synced, None, now).unwrap();
        let entry = logger.created_entry(id, status);
        store.save_backup_with_log(&record, &entry).await.unwrap();
    }
    let mut conflicted = BackupRecord::new("bk-5", RecordStatus::Running).unwrap();
    conflicted
        .transition_sync(SyncStatus::Conflict, Some("x".into()), now)
        .unwrap();
    conflicted.mark_file_verified(now);
    store.save_backup(&conflicted).await.unwrap();
    store
        .save_restore(&RestoreRecord::new("rs-1").unwrap())
        .await
        .unwrap();

    // Outside the 24h window
    let old = logger
        .created_entry("bk-old", RecordStatus::Completed)
        .with_created_at(now - Duration::hours(30));
    store.append_log(&old).await.unwrap();

    let stats = StatisticsCollector::new(store).collect(now).await.unwrap();

    assert_eq!(stats.total_records, 5);
    assert_eq!(stats.completed, 2);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.conflict_records, 1);
    assert_eq!(stats.restore_records, 1);
    assert_eq!(stats.file_verified_count, 1);
    assert_eq!(stats.sync_status["synced"], 4);
    assert_eq!(stats.sync_status["conflict"], 1);
    assert_eq!(stats.sync_status["pending"], 0);
    assert_eq!(stats.operations_24h["sync_backup"], 4);
    assert_eq!(stats.operations_24h["resolve_conflict"], 0);
    assert!((stats.success_rate - 0.4).abs() < f64::EPSILON);
    assert_eq!(stats.last_sync_at, Some(now));
    assert_eq!(stats.window_start, now - Duration::hours(24));
}
