//! SQLite implementation of ILocalStore
//!
//! This module provides the concrete SQLite-based implementation of the
//! local store port defined in vaultsync-core. Column conversions live in
//! the private `convert` module and are shared with the primary adapter.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool};

use vaultsync_core::domain::{
    BackupRecord, RecordStatus, RestoreRecord, SyncLogEntry, SyncOperation, SyncStatus,
};
use vaultsync_core::ports::{ILocalStore, RecordFilter};

use crate::convert::{
    details_from_row, format_datetime, format_optional_datetime, parse_datetime,
    parse_optional_datetime, restore_from_row, to_json_text, DetailColumns,
};
use crate::CacheError;

/// SQLite-based implementation of the local store port
///
/// All operations are performed through a connection pool for concurrency.
pub struct SqliteLocalStore {
    pool: SqlitePool,
}

impl SqliteLocalStore {
    /// Creates a new store instance with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

// ============================================================================
// Row mapping functions
// ============================================================================

/// Reconstruct a BackupRecord from a database row
fn backup_from_row(row: &SqliteRow) -> Result<BackupRecord, CacheError> {
    let backup_id: String = row.get("backup_id");
    let status_str: String = row.get("status");
    let sync_status_str: String = row.get("sync_status");
    let created_at_str: String = row.get("created_at");
    let updated_at_str: String = row.get("updated_at");

    let status: RecordStatus = status_str.parse()?;
    let sync_status: SyncStatus = sync_status_str.parse()?;

    let record = BackupRecord::new(backup_id, status)?
        .with_details(details_from_row(row)?)
        .with_created_at(parse_datetime(&created_at_str)?)
        .with_started_at(parse_optional_datetime(row.get("started_at"))?)
        .with_completed_at(parse_optional_datetime(row.get("completed_at"))?)
        .with_primary_row_id(row.get("primary_row_id"))
        .with_sync_state(
            sync_status,
            row.get("conflict_reason"),
            parse_optional_datetime(row.get("last_sync_at"))?,
        )
        .with_file_verified_at(parse_optional_datetime(row.get("file_verified_at"))?)
        .with_updated_at(parse_datetime(&updated_at_str)?);

    Ok(record)
}

/// Reconstruct a local RestoreRecord, including its sync bookkeeping
fn local_restore_from_row(row: &SqliteRow) -> Result<RestoreRecord, CacheError> {
    let sync_status_str: String = row.get("sync_status");
    let updated_at_str: String = row.get("updated_at");

    let record = restore_from_row(row)?
        .with_primary_row_id(row.get("primary_row_id"))
        .with_sync_state(
            sync_status_str.parse()?,
            parse_optional_datetime(row.get("last_sync_at"))?,
            parse_datetime(&updated_at_str)?,
        );
    Ok(record)
}

/// Reconstruct a SyncLogEntry from a database row
fn log_entry_from_row(row: &SqliteRow) -> Result<SyncLogEntry, CacheError> {
    let id: i64 = row.get("id");
    let operation_str: String = row.get("operation");
    let record_type_str: String = row.get("record_type");
    let record_id: String = row.get("record_id");
    let old_status: Option<String> = row.get("old_status");
    let new_status: Option<String> = row.get("new_status");
    let direction_str: String = row.get("sync_direction");
    let conflict_resolved: bool = row.get("conflict_resolved");
    let file_exists: Option<bool> = row.get("file_exists");
    let details_str: String = row.get("details");
    let cycle_id: Option<String> = row.get("cycle_id");
    let created_at_str: String = row.get("created_at");

    let details: serde_json::Value = serde_json::from_str(&details_str).map_err(|e| {
        CacheError::SerializationError(format!("Invalid sync log details: {}", e))
    })?;
    let cycle_id = cycle_id
        .map(|s| {
            s.parse::<uuid::Uuid>().map_err(|e| {
                CacheError::SerializationError(format!("Invalid cycle id '{}': {}", s, e))
            })
        })
        .transpose()?;

    let entry = SyncLogEntry::new(
        operation_str.parse::<SyncOperation>()?,
        record_type_str.parse()?,
        record_id,
    )
    .with_id(id)
    .with_statuses(
        old_status.map(|s| s.parse()).transpose()?,
        new_status.map(|s| s.parse()).transpose()?,
    )
    .with_direction(direction_str.parse()?)
    .with_conflict_resolved(conflict_resolved)
    .with_file_exists(file_exists)
    .with_details(details)
    .with_cycle_id(cycle_id)
    .with_created_at(parse_datetime(&created_at_str)?);

    Ok(entry)
}

// ============================================================================
// Write helpers (generic over pool or transaction)
// ============================================================================

async fn upsert_backup<'e, E>(executor: E, record: &BackupRecord) -> Result<(), CacheError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let d = DetailColumns::from_details(record.details())?;

    sqlx::query(
        "INSERT OR REPLACE INTO backup_records \
         (backup_id, status, backup_type, file_path, file_size, compressed_size, \
          compression_ratio, checksum, databases_count, encryption_enabled, \
          error_message, extra_data, created_at, started_at, completed_at, \
          primary_row_id, sync_status, conflict_reason, last_sync_at, \
          file_verified_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(record.backup_id())
    .bind(record.status().as_str())
    .bind(&d.backup_type)
    .bind(&d.file_path)
    .bind(d.file_size)
    .bind(d.compressed_size)
    .bind(d.compression_ratio)
    .bind(&d.checksum)
    .bind(d.databases_count)
    .bind(d.encryption_enabled)
    .bind(&d.error_message)
    .bind(&d.extra_data)
    .bind(format_datetime(record.created_at()))
    .bind(format_optional_datetime(record.started_at()))
    .bind(format_optional_datetime(record.completed_at()))
    .bind(record.primary_row_id())
    .bind(record.sync_status().as_str())
    .bind(record.conflict_reason())
    .bind(format_optional_datetime(record.last_sync_at()))
    .bind(format_optional_datetime(record.file_verified_at()))
    .bind(format_datetime(record.updated_at()))
    .execute(executor)
    .await?;

    Ok(())
}

async fn insert_log<'e, E>(executor: E, entry: &SyncLogEntry) -> Result<i64, CacheError>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let details = to_json_text(Some(entry.details()))?.unwrap_or_else(|| "null".to_string());

    let result = sqlx::query(
        "INSERT INTO sync_log \
         (operation, record_type, record_id, old_status, new_status, sync_direction, \
          conflict_resolved, file_exists, details, cycle_id, created_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(entry.operation().as_str())
    .bind(entry.record_type().as_str())
    .bind(entry.record_id())
    .bind(entry.old_status().map(|s| s.as_str()))
    .bind(entry.new_status().map(|s| s.as_str()))
    .bind(entry.sync_direction().as_str())
    .bind(entry.conflict_resolved())
    .bind(entry.file_exists())
    .bind(details)
    .bind(entry.cycle_id().map(|id| id.to_string()))
    .bind(format_datetime(entry.created_at()))
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}

// ============================================================================
// ILocalStore implementation
// ============================================================================

#[async_trait::async_trait]
impl ILocalStore for SqliteLocalStore {
    // --- Backup records ---

    async fn get_backup(&self, backup_id: &str) -> anyhow::Result<Option<BackupRecord>> {
        let row = sqlx::query("SELECT * FROM backup_records WHERE backup_id = ?")
            .bind(backup_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(backup_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn save_backup(&self, record: &BackupRecord) -> anyhow::Result<()> {
        upsert_backup(&self.pool, record).await?;
        tracing::trace!(backup_id = %record.backup_id(), "Saved backup record");
        Ok(())
    }

    async fn save_backup_with_log(
        &self,
        record: &BackupRecord,
        entry: &SyncLogEntry,
    ) -> anyhow::Result<i64> {
        let mut tx = self.pool.begin().await?;
        upsert_backup(&mut *tx, record).await?;
        let id = insert_log(&mut *tx, entry).await?;
        tx.commit().await?;

        tracing::trace!(
            backup_id = %record.backup_id(),
            operation = %entry.operation(),
            log_id = id,
            "Saved backup record with log entry"
        );
        Ok(id)
    }

    async fn query_backups(&self, filter: &RecordFilter) -> anyhow::Result<Vec<BackupRecord>> {
        let mut sql = String::from("SELECT * FROM backup_records WHERE 1=1");
        let mut binds: Vec<&'static str> = Vec::new();

        if let Some(sync_status) = filter.sync_status {
            sql.push_str(" AND sync_status = ?");
            binds.push(sync_status.as_str());
        }

        if let Some(status) = filter.status {
            sql.push_str(" AND status = ?");
            binds.push(status.as_str());
        }

        sql.push_str(" ORDER BY created_at ASC, backup_id ASC");

        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let mut query = sqlx::query(&sql);
        for bind in &binds {
            query = query.bind(*bind);
        }

        let rows = query.fetch_all(&self.pool).await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            records.push(backup_from_row(row)?);
        }

        Ok(records)
    }

    async fn count_backups_by_sync_status(&self) -> anyhow::Result<HashMap<SyncStatus, u64>> {
        let rows = sqlx::query(
            "SELECT sync_status, COUNT(*) as count FROM backup_records GROUP BY sync_status",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut counts = HashMap::new();
        for row in &rows {
            let status_str: String = row.get("sync_status");
            let count: i64 = row.get("count");
            let status: SyncStatus = status_str.parse().map_err(CacheError::from)?;
            counts.insert(status, count as u64);
        }

        Ok(counts)
    }

    async fn count_backups_by_status(&self) -> anyhow::Result<HashMap<RecordStatus, u64>> {
        let rows =
            sqlx::query("SELECT status, COUNT(*) as count FROM backup_records GROUP BY status")
                .fetch_all(&self.pool)
                .await?;

        let mut counts = HashMap::new();
        for row in &rows {
            let status_str: String = row.get("status");
            let count: i64 = row.get("count");
            let status: RecordStatus = status_str.parse().map_err(CacheError::from)?;
            counts.insert(status, count as u64);
        }

        Ok(counts)
    }

    async fn latest_sync_at(&self) -> anyhow::Result<Option<DateTime<Utc>>> {
        let latest: Option<String> =
            sqlx::query_scalar("SELECT MAX(last_sync_at) FROM backup_records")
                .fetch_one(&self.pool)
                .await?;

        Ok(parse_optional_datetime(latest)?)
    }

    async fn count_file_verified(&self) -> anyhow::Result<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM backup_records WHERE file_verified_at IS NOT NULL",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(count as u64)
    }

    // --- Restore records ---

    async fn get_restore(&self, restore_id: &str) -> anyhow::Result<Option<RestoreRecord>> {
        let row = sqlx::query("SELECT * FROM restore_records WHERE restore_id = ?")
            .bind(restore_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(local_restore_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn save_restore(&self, record: &RestoreRecord) -> anyhow::Result<()> {
        let restore_options = to_json_text(record.restore_options())?;

        sqlx::query(
            "INSERT OR REPLACE INTO restore_records \
             (restore_id, backup_id, restore_type, status, progress, status_message, \
              error_message, restore_options, requested_by, restored_databases_count, \
              created_at, started_at, completed_at, primary_row_id, sync_status, \
              last_sync_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.restore_id())
        .bind(record.backup_id())
        .bind(record.restore_type())
        .bind(record.status().as_str())
        .bind(i64::from(record.progress()))
        .bind(record.status_message())
        .bind(record.error_message())
        .bind(&restore_options)
        .bind(record.requested_by())
        .bind(i64::from(record.restored_databases_count()))
        .bind(format_datetime(record.created_at()))
        .bind(format_optional_datetime(record.started_at()))
        .bind(format_optional_datetime(record.completed_at()))
        .bind(record.primary_row_id())
        .bind(record.sync_status().as_str())
        .bind(format_optional_datetime(record.last_sync_at()))
        .bind(format_datetime(record.updated_at()))
        .execute(&self.pool)
        .await?;

        tracing::trace!(restore_id = %record.restore_id(), "Saved restore record");
        Ok(())
    }

    async fn list_restores(&self) -> anyhow::Result<Vec<RestoreRecord>> {
        let rows =
            sqlx::query("SELECT * FROM restore_records ORDER BY created_at ASC, restore_id ASC")
                .fetch_all(&self.pool)
                .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            records.push(local_restore_from_row(row)?);
        }

        Ok(records)
    }

    // --- Sync log ---

    async fn append_log(&self, entry: &SyncLogEntry) -> anyhow::Result<i64> {
        let id = insert_log(&self.pool, entry).await?;
        tracing::trace!(operation = %entry.operation(), log_id = id, "Appended sync log entry");
        Ok(id)
    }

    async fn get_log_for_record(&self, record_id: &str) -> anyhow::Result<Vec<SyncLogEntry>> {
        let rows = sqlx::query(
            "SELECT * FROM sync_log WHERE record_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(record_id)
        .fetch_all(&self.pool)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            entries.push(log_entry_from_row(row)?);
        }

        Ok(entries)
    }

    async fn get_log_since(
        &self,
        since: DateTime<Utc>,
        limit: u32,
    ) -> anyhow::Result<Vec<SyncLogEntry>> {
        let rows = sqlx::query(
            "SELECT * FROM sync_log WHERE created_at > ? \
             ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(format_datetime(since))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in &rows {
            entries.push(log_entry_from_row(row)?);
        }

        Ok(entries)
    }

    async fn count_log_by_operation_since(
        &self,
        since: DateTime<Utc>,
    ) -> anyhow::Result<HashMap<SyncOperation, u64>> {
        let rows = sqlx::query(
            "SELECT operation, COUNT(*) as count FROM sync_log \
             WHERE created_at > ? GROUP BY operation",
        )
        .bind(format_datetime(since))
        .fetch_all(&self.pool)
        .await?;

        let mut counts = HashMap::new();
        for row in &rows {
            let op_str: String = row.get("operation");
            let count: i64 = row.get("count");
            let op: SyncOperation = op_str.parse().map_err(CacheError::from)?;
            counts.insert(op, count as u64);
        }

        Ok(counts)
    }
}
