//! Local store port (driven/secondary port)
//!
//! This module defines the interface for the embedded store that survives
//! restores of the primary store. It holds backup and restore records with
//! their sync bookkeeping, plus the append-only sync log.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific
//!   and are classified by the reconciler, not by the port.
//! - Each write is committed on its own so a failure on one record never
//!   rolls back records processed before it.
//! - [`ILocalStore::save_backup_with_log`] commits a record change and the
//!   log entry explaining it atomically; conflict detection and resolution
//!   rely on it so no record changes state without its audit entry.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::domain::{
    BackupRecord, RecordStatus, RestoreRecord, SyncLogEntry, SyncOperation, SyncStatus,
};

/// Filter criteria for querying backup records
///
/// All fields are optional; when `None`, no filtering is applied for that field.
/// Multiple filters are combined with AND logic.
///
/// # Example
///
/// ```
/// use vaultsync_core::domain::SyncStatus;
/// use vaultsync_core::ports::RecordFilter;
///
/// let conflicts = RecordFilter::new().with_sync_status(SyncStatus::Conflict);
/// assert_eq!(conflicts.sync_status, Some(SyncStatus::Conflict));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    /// Filter by reconciliation state
    pub sync_status: Option<SyncStatus>,
    /// Filter by operation status
    pub status: Option<RecordStatus>,
    /// Maximum number of records to return
    pub limit: Option<u32>,
}

impl RecordFilter {
    /// Creates a new empty filter (matches all records)
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sync_status(mut self, sync_status: SyncStatus) -> Self {
        self.sync_status = Some(sync_status);
        self
    }

    pub fn with_status(mut self, status: RecordStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Persistence operations on the local store
#[async_trait::async_trait]
pub trait ILocalStore: Send + Sync {
    // --- Backup records ---

    /// Looks up a backup by its join key
    async fn get_backup(&self, backup_id: &str) -> anyhow::Result<Option<BackupRecord>>;

    /// Inserts or replaces the record keyed by `backup_id`
    async fn save_backup(&self, record: &BackupRecord) -> anyhow::Result<()>;

    /// Saves the record and appends `entry` in one transaction
    ///
    /// Returns the id assigned to the log entry.
    async fn save_backup_with_log(
        &self,
        record: &BackupRecord,
        entry: &SyncLogEntry,
    ) -> anyhow::Result<i64>;

    /// Returns records matching the filter, ordered by `created_at`
    async fn query_backups(&self, filter: &RecordFilter) -> anyhow::Result<Vec<BackupRecord>>;

    /// Counts backup records per sync status (absent statuses are omitted)
    async fn count_backups_by_sync_status(&self) -> anyhow::Result<HashMap<SyncStatus, u64>>;

    /// Counts backup records per operation status
    async fn count_backups_by_status(&self) -> anyhow::Result<HashMap<RecordStatus, u64>>;

    /// Most recent `last_sync_at` over all backup records
    async fn latest_sync_at(&self) -> anyhow::Result<Option<DateTime<Utc>>>;

    /// Number of backups whose artifact has been confirmed at least once
    async fn count_file_verified(&self) -> anyhow::Result<u64>;

    // --- Restore records ---

    async fn get_restore(&self, restore_id: &str) -> anyhow::Result<Option<RestoreRecord>>;

    async fn save_restore(&self, record: &RestoreRecord) -> anyhow::Result<()>;

    async fn list_restores(&self) -> anyhow::Result<Vec<RestoreRecord>>;

    // --- Sync log ---

    /// Appends a log entry and returns its assigned id
    async fn append_log(&self, entry: &SyncLogEntry) -> anyhow::Result<i64>;

    /// All entries for one record, oldest first
    async fn get_log_for_record(&self, record_id: &str) -> anyhow::Result<Vec<SyncLogEntry>>;

    /// Entries newer than `since`, newest first
    async fn get_log_since(
        &self,
        since: DateTime<Utc>,
        limit: u32,
    ) -> anyhow::Result<Vec<SyncLogEntry>>;

    /// Counts entries per operation newer than `since`
    async fn count_log_by_operation_since(
        &self,
        since: DateTime<Utc>,
    ) -> anyhow::Result<HashMap<SyncOperation, u64>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_builder_combines_fields() {
        let filter = RecordFilter::new()
            .with_sync_status(SyncStatus::Verified)
            .with_status(RecordStatus::Completed)
            .with_limit(10);
        assert_eq!(filter.sync_status, Some(SyncStatus::Verified));
        assert_eq!(filter.status, Some(RecordStatus::Completed));
        assert_eq!(filter.limit, Some(10));
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = RecordFilter::new();
        assert!(filter.sync_status.is_none());
        assert!(filter.status.is_none());
        assert!(filter.limit.is_none());
    }
}
