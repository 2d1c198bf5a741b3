//! Backup registry - direct writes from the backup/restore executor
//!
//! The executor records new backups and progress updates here instead of
//! going through a reconciliation cycle. New backups start in `pending`
//! sync status and reach the primary store on the next push. Every write
//! leaves a `create_record` / `update_record` entry with direction `manual`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::{debug, info};

use vaultsync_audit::SyncLogger;
use vaultsync_core::domain::{
    BackupRecord, RecordStatus, RecordType, RestoreRecord, SyncOperation, SyncStatus,
};
use vaultsync_core::ports::{ILocalStore, RecordFilter};

use crate::ReconcileError;

/// Fields the executor may change on an existing backup
///
/// `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackupUpdate {
    pub status: Option<RecordStatus>,
    pub file_path: Option<String>,
    pub file_size: Option<u64>,
    pub compressed_size: Option<u64>,
    pub compression_ratio: Option<f64>,
    pub checksum: Option<String>,
    pub error_message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub extra_data: Option<Value>,
}

impl BackupUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: RecordStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn file_path(mut self, path: impl Into<String>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    pub fn file_size(mut self, size: u64) -> Self {
        self.file_size = Some(size);
        self
    }

    pub fn checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }

    pub fn error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn completed_at(mut self, at: DateTime<Utc>) -> Self {
        self.completed_at = Some(at);
        self
    }

    /// Applies the update and returns the names of the fields it set
    fn apply(self, record: &mut BackupRecord) -> Vec<&'static str> {
        let mut fields = Vec::new();
        let mut details = record.details().clone();

        if let Some(status) = self.status {
            record.set_status(status);
            fields.push("status");
        }
        if let Some(path) = self.file_path {
            details.file_path = Some(path);
            fields.push("file_path");
        }
        if let Some(size) = self.file_size {
            details.file_size = Some(size);
            fields.push("file_size");
        }
        if let Some(size) = self.compressed_size {
            details.compressed_size = Some(size);
            fields.push("compressed_size");
        }
        if let Some(ratio) = self.compression_ratio {
            details.compression_ratio = Some(ratio);
            fields.push("compression_ratio");
        }
        if let Some(checksum) = self.checksum {
            details.checksum = Some(checksum);
            fields.push("checksum");
        }
        if let Some(message) = self.error_message {
            details.error_message = Some(message);
            fields.push("error_message");
        }
        if let Some(extra) = self.extra_data {
            details.extra_data = Some(extra);
            fields.push("extra_data");
        }
        record.set_details(details);

        if let Some(at) = self.started_at {
            record.set_started_at(Some(at));
            fields.push("started_at");
        }
        if let Some(at) = self.completed_at {
            record.set_completed_at(Some(at));
            fields.push("completed_at");
        }
        fields
    }
}

/// Executor-facing access to local backup and restore records
#[derive(Clone)]
pub struct BackupRegistry {
    local: Arc<dyn ILocalStore>,
    logger: SyncLogger,
}

impl BackupRegistry {
    pub fn new(local: Arc<dyn ILocalStore>) -> Self {
        Self {
            logger: SyncLogger::new(Arc::clone(&local)),
            local,
        }
    }

    /// Registers a brand-new backup
    ///
    /// # Errors
    ///
    /// `InvalidRecord` if a record with the same id exists or the record is
    /// not in `pending` sync status.
    pub async fn create_backup(&self, record: BackupRecord) -> Result<BackupRecord, ReconcileError> {
        if record.sync_status() != SyncStatus::Pending {
            return Err(ReconcileError::InvalidRecord(format!(
                "new backup '{}' must start in pending sync status",
                record.backup_id()
            )));
        }
        if self
            .local
            .get_backup(record.backup_id())
            .await
            .map_err(ReconcileError::LocalStore)?
            .is_some()
        {
            return Err(ReconcileError::InvalidRecord(format!(
                "backup '{}' already exists",
                record.backup_id()
            )));
        }

        self.local
            .save_backup(&record)
            .await
            .map_err(ReconcileError::LocalStore)?;
        self.logger
            .log_executor_write(
                SyncOperation::CreateRecord,
                RecordType::Backup,
                record.backup_id(),
                None,
                record.status(),
                json!({ "backup_type": record.details().backup_type }),
            )
            .await;

        info!(backup_id = %record.backup_id(), status = %record.status(), "Backup registered");
        Ok(record)
    }

    /// Applies an executor update to an existing backup
    pub async fn update_backup(
        &self,
        backup_id: &str,
        update: BackupUpdate,
    ) -> Result<BackupRecord, ReconcileError> {
        let mut record = self
            .local
            .get_backup(backup_id)
            .await
            .map_err(ReconcileError::LocalStore)?
            .ok_or_else(|| ReconcileError::InvalidRecord(format!("backup '{backup_id}' not found")))?;

        let old_status = record.status();
        let fields = update.apply(&mut record);
        if fields.is_empty() {
            return Ok(record);
        }

        self.local
            .save_backup(&record)
            .await
            .map_err(ReconcileError::LocalStore)?;
        self.logger
            .log_executor_write(
                SyncOperation::UpdateRecord,
                RecordType::Backup,
                backup_id,
                Some(old_status),
                record.status(),
                json!({ "fields": fields }),
            )
            .await;

        debug!(backup_id, ?fields, "Backup updated");
        Ok(record)
    }

    pub async fn get_backup(&self, backup_id: &str) -> Result<Option<BackupRecord>, ReconcileError> {
        self.local
            .get_backup(backup_id)
            .await
            .map_err(ReconcileError::LocalStore)
    }

    /// Records currently awaiting conflict resolution
    pub async fn find_conflicts(&self, limit: Option<u32>) -> Result<Vec<BackupRecord>, ReconcileError> {
        let mut filter = RecordFilter::new().with_sync_status(SyncStatus::Conflict);
        if let Some(limit) = limit {
            filter = filter.with_limit(limit);
        }
        self.local
            .query_backups(&filter)
            .await
            .map_err(ReconcileError::LocalStore)
    }

    pub async fn conflict_count(&self) -> Result<u64, ReconcileError> {
        let counts = self
            .local
            .count_backups_by_sync_status()
            .await
            .map_err(ReconcileError::LocalStore)?;
        Ok(counts.get(&SyncStatus::Conflict).copied().unwrap_or(0))
    }

    /// Creates or updates a restore record
    pub async fn save_restore(&self, record: &RestoreRecord) -> Result<(), ReconcileError> {
        let existing = self
            .local
            .get_restore(record.restore_id())
            .await
            .map_err(ReconcileError::LocalStore)?;
        self.local
            .save_restore(record)
            .await
            .map_err(ReconcileError::LocalStore)?;

        let (operation, old_status) = match existing {
            Some(previous) => (SyncOperation::UpdateRecord, Some(previous.status())),
            None => (SyncOperation::CreateRecord, None),
        };
        self.logger
            .log_executor_write(
                operation,
                RecordType::Restore,
                record.restore_id(),
                old_status,
                record.status(),
                json!({ "progress": record.progress() }),
            )
            .await;
        Ok(())
    }

    pub async fn get_restore(&self, restore_id: &str) -> Result<Option<RestoreRecord>, ReconcileError> {
        self.local
            .get_restore(restore_id)
            .await
            .map_err(ReconcileError::LocalStore)
    }
}
