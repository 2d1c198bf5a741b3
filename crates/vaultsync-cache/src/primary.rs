//! SQLite implementation of IPrimaryStore
//!
//! Reads and writes the application's own backup and restore tables. Only
//! columns the primary schema declares are touched; sync bookkeeping on
//! the domain types is dropped on write and left at defaults on read.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use vaultsync_core::domain::{PrimaryRecord, RestoreRecord};
use vaultsync_core::ports::IPrimaryStore;

use crate::convert::{
    details_from_row, format_datetime, format_optional_datetime, parse_optional_datetime,
    restore_from_row, to_json_text, DetailColumns,
};
use crate::CacheError;

/// SQLite-based implementation of the primary store port
pub struct SqlitePrimaryStore {
    pool: SqlitePool,
}

impl SqlitePrimaryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// Reconstruct a PrimaryRecord from a database row
///
/// `backup_id` and `status` are passed through unchecked so the reconciler
/// can reject malformed rows one at a time.
fn primary_from_row(row: &SqliteRow) -> Result<PrimaryRecord, CacheError> {
    Ok(PrimaryRecord {
        row_id: Some(row.get("id")),
        backup_id: row.get("backup_id"),
        status: row.get("status"),
        details: details_from_row(row)?,
        created_at: parse_optional_datetime(row.get("created_at"))?,
        started_at: parse_optional_datetime(row.get("started_at"))?,
        completed_at: parse_optional_datetime(row.get("completed_at"))?,
    })
}

fn primary_restore_from_row(row: &SqliteRow) -> Result<RestoreRecord, CacheError> {
    Ok(restore_from_row(row)?.with_primary_row_id(Some(row.get("id"))))
}

#[async_trait::async_trait]
impl IPrimaryStore for SqlitePrimaryStore {
    async fn fetch_backups(&self) -> anyhow::Result<Vec<PrimaryRecord>> {
        let rows = sqlx::query("SELECT * FROM backup_records ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            records.push(primary_from_row(row)?);
        }

        tracing::debug!(count = records.len(), "Fetched primary backup rows");
        Ok(records)
    }

    async fn get_backup(&self, backup_id: &str) -> anyhow::Result<Option<PrimaryRecord>> {
        let row = sqlx::query("SELECT * FROM backup_records WHERE backup_id = ?")
            .bind(backup_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(primary_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn upsert_backup(&self, record: &PrimaryRecord) -> anyhow::Result<()> {
        let backup_id = record.require_id()?;
        let d = DetailColumns::from_details(&record.details)?;

        sqlx::query(
            "INSERT INTO backup_records \
             (backup_id, status, backup_type, file_path, file_size, compressed_size, \
              compression_ratio, checksum, databases_count, encryption_enabled, \
              error_message, extra_data, created_at, started_at, completed_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(backup_id) DO UPDATE SET \
              status = excluded.status, \
              backup_type = excluded.backup_type, \
              file_path = excluded.file_path, \
              file_size = excluded.file_size, \
              compressed_size = excluded.compressed_size, \
              compression_ratio = excluded.compression_ratio, \
              checksum = excluded.checksum, \
              databases_count = excluded.databases_count, \
              encryption_enabled = excluded.encryption_enabled, \
              error_message = excluded.error_message, \
              extra_data = excluded.extra_data, \
              created_at = COALESCE(backup_records.created_at, excluded.created_at), \
              started_at = excluded.started_at, \
              completed_at = excluded.completed_at",
        )
        .bind(backup_id)
        .bind(record.status.as_deref())
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
        .bind(format_optional_datetime(record.created_at))
        .bind(format_optional_datetime(record.started_at))
        .bind(format_optional_datetime(record.completed_at))
        .execute(&self.pool)
        .await?;

        tracing::trace!(backup_id = %backup_id, "Upserted primary backup row");
        Ok(())
    }

    async fn get_restore(&self, restore_id: &str) -> anyhow::Result<Option<RestoreRecord>> {
        let row = sqlx::query("SELECT * FROM restore_records WHERE restore_id = ?")
            .bind(restore_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(primary_restore_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn upsert_restore(&self, record: &RestoreRecord) -> anyhow::Result<()> {
        let restore_options = to_json_text(record.restore_options())?;

        sqlx::query(
            "INSERT INTO restore_records \
             (restore_id, backup_id, restore_type, status, progress, status_message, \
              error_message, restore_options, requested_by, restored_databases_count, \
              created_at, started_at, completed_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(restore_id) DO UPDATE SET \
              backup_id = excluded.backup_id, \
              restore_type = excluded.restore_type, \
              status = excluded.status, \
              progress = excluded.progress, \
              status_message = excluded.status_message, \
              error_message = excluded.error_message, \
              restore_options = excluded.restore_options, \
              requested_by = excluded.requested_by, \
              restored_databases_count = excluded.restored_databases_count, \
              started_at = excluded.started_at, \
              completed_at = excluded.completed_at",
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
        .execute(&self.pool)
        .await?;

        tracing::trace!(restore_id = %record.restore_id(), "Upserted primary restore row");
        Ok(())
    }
}
