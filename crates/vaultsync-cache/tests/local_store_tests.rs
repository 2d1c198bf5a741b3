//! Integration tests for SqliteLocalStore
//!
//! These tests verify all ILocalStore methods using an in-memory
//! SQLite database. Each test function creates a fresh database to
//! ensure test isolation.

use chrono::{Duration, Utc};
use uuid::Uuid;

use vaultsync_cache::{DatabasePool, SqliteLocalStore};
use vaultsync_core::domain::{
    BackupDetails, BackupRecord, RecordStatus, RecordType, RestoreRecord, SyncDirection,
    SyncLogEntry, SyncOperation, SyncStatus,
};
use vaultsync_core::ports::{ILocalStore, RecordFilter};

// ============================================================================
// Test helpers
// ============================================================================

/// Create a fresh in-memory store for each test
async fn setup() -> SqliteLocalStore {
    let pool = DatabasePool::in_memory()
        .await
        .expect("Failed to create in-memory database");
    SqliteLocalStore::new(pool.pool().clone())
}

fn backup(id: &str, status: RecordStatus) -> BackupRecord {
    BackupRecord::new(id, status).unwrap()
}

fn full_details() -> BackupDetails {
    BackupDetails {
        backup_type: "logical".to_string(),
        file_path: Some("/srv/backups/physical/bk-1.tar.gz".to_string()),
        file_size: Some(10_485_760),
        compressed_size: Some(2_097_152),
        compression_ratio: Some(0.2),
        checksum: Some("sha256:abc123".to_string()),
        databases_count: 3,
        encryption_enabled: true,
        error_message: None,
        extra_data: Some(serde_json::json!({"host": "db-01", "tags": ["nightly"]})),
    }
}

// ============================================================================
// Backup record tests
// ============================================================================

#[tokio::test]
async fn test_save_and_get_backup() {
    let store = setup().await;
    let started = Utc::now() - Duration::minutes(5);
    let record = backup("bk-1", RecordStatus::Completed)
        .with_details(full_details())
        .with_started_at(Some(started))
        .with_completed_at(Some(Utc::now()))
        .with_primary_row_id(Some(17));

    store.save_backup(&record).await.unwrap();

    let retrieved = store.get_backup("bk-1").await.unwrap().unwrap();
    assert_eq!(retrieved, record);
    assert_eq!(retrieved.details().extra_data.as_ref().unwrap()["host"], "db-01");
}

#[tokio::test]
async fn test_get_backup_not_found() {
    let store = setup().await;
    assert!(store.get_backup("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_save_backup_replaces_existing() {
    let store = setup().await;
    let mut record = backup("bk-1", RecordStatus::Running);
    store.save_backup(&record).await.unwrap();

    record.set_status(RecordStatus::Completed);
    record
        .transition_sync(SyncStatus::Conflict, Some("status mismatch".into()), Utc::now())
        .unwrap();
    store.save_backup(&record).await.unwrap();

    let retrieved = store.get_backup("bk-1").await.unwrap().unwrap();
    assert_eq!(retrieved.status(), RecordStatus::Completed);
    assert_eq!(retrieved.sync_status(), SyncStatus::Conflict);
    assert_eq!(retrieved.conflict_reason(), Some("status mismatch"));

    let all = store.query_backups(&RecordFilter::new()).await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn test_query_backups_by_sync_status_and_status() {
    let store = setup().await;
    let now = Utc::now();

    let mut a = backup("a", RecordStatus::Completed).with_created_at(now - Duration::hours(3));
    a.transition_sync(SyncStatus::Conflict, Some("x".into()), now)
        .unwrap();
    let mut b = backup("b", RecordStatus::Running).with_created_at(now - Duration::hours(2));
    b.transition_sync(SyncStatus::Conflict, Some("y".into()), now)
        .unwrap();
    let c = backup("c", RecordStatus::Completed).with_created_at(now - Duration::hours(1));

    for r in [&c, &b, &a] {
        store.save_backup(r).await.unwrap();
    }

    let conflicts = store
        .query_backups(&RecordFilter::new().with_sync_status(SyncStatus::Conflict))
        .await
        .unwrap();
    let ids: Vec<_> = conflicts.iter().map(|r| r.backup_id()).collect();
    assert_eq!(ids, vec!["a", "b"]);

    let completed_conflicts = store
        .query_backups(
            &RecordFilter::new()
                .with_sync_status(SyncStatus::Conflict)
                .with_status(RecordStatus::Completed),
        )
        .await
        .unwrap();
    assert_eq!(completed_conflicts.len(), 1);
    assert_eq!(completed_conflicts[0].backup_id(), "a");

    let limited = store
        .query_backups(&RecordFilter::new().with_limit(2))
        .await
        .unwrap();
    assert_eq!(limited.len(), 2);
    assert_eq!(limited[0].backup_id(), "a");
}

#[tokio::test]
async fn test_count_backups() {
    let store = setup().await;
    let now = Utc::now();

    let mut synced = backup("s", RecordStatus::Completed);
    synced.transition_sync(SyncStatus::Synced, None, now).unwrap();
    synced.mark_file_verified(now);
    let mut conflict = backup("c", RecordStatus::Failed);
    conflict
        .transition_sync(SyncStatus::Conflict, Some("x".into()), now)
        .unwrap();
    let pending = backup("p", RecordStatus::Completed);

    for r in [&synced, &conflict, &pending] {
        store.save_backup(r).await.unwrap();
    }

    let by_sync = store.count_backups_by_sync_status().await.unwrap();
    assert_eq!(by_sync.get(&SyncStatus::Synced), Some(&1));
    assert_eq!(by_sync.get(&SyncStatus::Conflict), Some(&1));
    assert_eq!(by_sync.get(&SyncStatus::Pending), Some(&1));
    assert_eq!(by_sync.get(&SyncStatus::Verified), None);

    let by_status = store.count_backups_by_status().await.unwrap();
    assert_eq!(by_status.get(&RecordStatus::Completed), Some(&2));
    assert_eq!(by_status.get(&RecordStatus::Failed), Some(&1));

    assert_eq!(store.count_file_verified().await.unwrap(), 1);
}

#[tokio::test]
async fn test_latest_sync_at() {
    let store = setup().await;
    assert!(store.latest_sync_at().await.unwrap().is_none());

    let now = Utc::now();
    let mut older = backup("old", RecordStatus::Completed);
    older.touch_sync(now - Duration::days(1));
    let mut newer = backup("new", RecordStatus::Completed);
    newer.touch_sync(now);
    store.save_backup(&older).await.unwrap();
    store.save_backup(&newer).await.unwrap();
    store
        .save_backup(&backup("never", RecordStatus::Pending))
        .await
        .unwrap();

    assert_eq!(store.latest_sync_at().await.unwrap(), Some(now));
}

// ============================================================================
// Transactional save tests
// ============================================================================

#[tokio::test]
async fn test_save_backup_with_log_writes_both() {
    let store = setup().await;
    let mut record = backup("bk-1", RecordStatus::Running);
    record
        .transition_sync(SyncStatus::Conflict, Some("status mismatch".into()), Utc::now())
        .unwrap();
    let entry = SyncLogEntry::new(SyncOperation::DetectConflict, RecordType::Backup, "bk-1")
        .with_statuses(Some(RecordStatus::Running), Some(RecordStatus::Completed))
        .with_file_exists(Some(false));

    let id = store.save_backup_with_log(&record, &entry).await.unwrap();
    assert!(id > 0);

    assert_eq!(
        store.get_backup("bk-1").await.unwrap().unwrap().sync_status(),
        SyncStatus::Conflict
    );
    let log = store.get_log_for_record("bk-1").await.unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].id(), Some(id));
    assert_eq!(log[0].operation(), SyncOperation::DetectConflict);
    assert_eq!(log[0].file_exists(), Some(false));
}

// ============================================================================
// Restore record tests
// ============================================================================

#[tokio::test]
async fn test_save_and_get_restore() {
    let store = setup().await;
    let mut record = RestoreRecord::new("rs-1")
        .unwrap()
        .with_backup_id("bk-1")
        .with_status(RecordStatus::Running)
        .with_progress(40)
        .with_messages(Some("copying".into()), None)
        .with_restore_options(Some(serde_json::json!({"target": "staging"})))
        .with_requested_by("ops")
        .with_restored_databases_count(2)
        .with_primary_row_id(Some(4));
    record.mark_pushed(Utc::now());

    store.save_restore(&record).await.unwrap();

    let retrieved = store.get_restore("rs-1").await.unwrap().unwrap();
    assert_eq!(retrieved, record);
    assert_eq!(retrieved.sync_status(), SyncStatus::Synced);
    assert!(store.get_restore("rs-2").await.unwrap().is_none());
}

#[tokio::test]
async fn test_list_restores_ordered_by_creation() {
    let store = setup().await;
    let now = Utc::now();
    let later = RestoreRecord::new("later")
        .unwrap()
        .with_timestamps(now, None, None);
    let earlier = RestoreRecord::new("earlier")
        .unwrap()
        .with_timestamps(now - Duration::minutes(10), None, None);

    store.save_restore(&later).await.unwrap();
    store.save_restore(&earlier).await.unwrap();

    let all = store.list_restores().await.unwrap();
    let ids: Vec<_> = all.iter().map(|r| r.restore_id()).collect();
    assert_eq!(ids, vec!["earlier", "later"]);
}

// ============================================================================
// Sync log tests
// ============================================================================

#[tokio::test]
async fn test_append_log_roundtrip() {
    let store = setup().await;
    let cycle = Uuid::new_v4();
    let entry = SyncLogEntry::new(SyncOperation::ResolveConflict, RecordType::Backup, "bk-1")
        .with_statuses(Some(RecordStatus::Running), Some(RecordStatus::Completed))
        .with_direction(SyncDirection::PrimaryToLocal)
        .with_conflict_resolved(true)
        .with_file_exists(Some(true))
        .with_cycle_id(Some(cycle))
        .with_details(serde_json::json!({"outcome": "fixed_to_completed"}));

    let id = store.append_log(&entry).await.unwrap();

    let log = store.get_log_for_record("bk-1").await.unwrap();
    assert_eq!(log, vec![entry.with_id(id)]);
}

#[tokio::test]
async fn test_log_entries_are_never_overwritten() {
    let store = setup().await;
    let first = SyncLogEntry::new(SyncOperation::SyncBackup, RecordType::Backup, "bk-1");
    let second = SyncLogEntry::new(SyncOperation::DetectConflict, RecordType::Backup, "bk-1")
        .with_created_at(first.created_at() + Duration::seconds(1));

    let a = store.append_log(&first).await.unwrap();
    let b = store.append_log(&second).await.unwrap();
    assert_ne!(a, b);

    let log = store.get_log_for_record("bk-1").await.unwrap();
    let ops: Vec<_> = log.iter().map(|e| e.operation()).collect();
    assert_eq!(ops, vec![SyncOperation::SyncBackup, SyncOperation::DetectConflict]);
}

#[tokio::test]
async fn test_get_log_since_newest_first_with_limit() {
    let store = setup().await;
    let now = Utc::now();

    for (i, hours_ago) in [30i64, 3, 2, 1].iter().enumerate() {
        let entry = SyncLogEntry::new(
            SyncOperation::SyncBackup,
            RecordType::Backup,
            format!("bk-{i}"),
        )
        .with_created_at(now - Duration::hours(*hours_ago));
        store.append_log(&entry).await.unwrap();
    }

    let since = now - Duration::hours(24);
    let recent = store.get_log_since(since, 10).await.unwrap();
    let ids: Vec<_> = recent.iter().map(|e| e.record_id()).collect();
    assert_eq!(ids, vec!["bk-3", "bk-2", "bk-1"]);

    let limited = store.get_log_since(since, 2).await.unwrap();
    assert_eq!(limited.len(), 2);
    assert_eq!(limited[0].record_id(), "bk-3");
}

#[tokio::test]
async fn test_count_log_by_operation_since() {
    let store = setup().await;
    let now = Utc::now();

    let ops = [
        (SyncOperation::SyncBackup, 1),
        (SyncOperation::SyncBackup, 2),
        (SyncOperation::DetectConflict, 3),
        (SyncOperation::SyncToPrimary, 48),
    ];
    for (op, hours_ago) in ops {
        let entry = SyncLogEntry::new(op, RecordType::Backup, "bk")
            .with_created_at(now - Duration::hours(hours_ago));
        store.append_log(&entry).await.unwrap();
    }

    let counts = store
        .count_log_by_operation_since(now - Duration::hours(24))
        .await
        .unwrap();
    assert_eq!(counts.get(&SyncOperation::SyncBackup), Some(&2));
    assert_eq!(counts.get(&SyncOperation::DetectConflict), Some(&1));
    assert_eq!(counts.get(&SyncOperation::SyncToPrimary), None);
}
