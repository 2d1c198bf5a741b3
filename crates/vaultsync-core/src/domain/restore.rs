//! Restore record domain entity
//!
//! Restore records share the backup lifecycle and sync bookkeeping. They are
//! written by the restore executor into the local store first, because the
//! primary store is being overwritten while a restore runs, and are pushed to
//! the primary store afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::DomainError;
use super::status::{RecordStatus, SyncStatus};

/// A restore operation's metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestoreRecord {
    restore_id: String,
    /// Backup this restore was taken from, if known
    backup_id: Option<String>,
    restore_type: String,
    status: RecordStatus,
    /// Completion percentage, 0-100
    progress: u8,
    status_message: Option<String>,
    error_message: Option<String>,
    restore_options: Option<Value>,
    requested_by: String,
    restored_databases_count: u32,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    primary_row_id: Option<i64>,
    sync_status: SyncStatus,
    last_sync_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl RestoreRecord {
    /// Creates a new `pending` restore in `pending` sync status
    pub fn new(restore_id: impl Into<String>) -> Result<Self, DomainError> {
        let restore_id = restore_id.into();
        if restore_id.trim().is_empty() {
            return Err(DomainError::MissingId("restore_id".to_string()));
        }
        let now = Utc::now();
        Ok(Self {
            restore_id,
            backup_id: None,
            restore_type: "full".to_string(),
            status: RecordStatus::Pending,
            progress: 0,
            status_message: None,
            error_message: None,
            restore_options: None,
            requested_by: "unknown".to_string(),
            restored_databases_count: 0,
            created_at: now,
            started_at: None,
            completed_at: None,
            primary_row_id: None,
            sync_status: SyncStatus::Pending,
            last_sync_at: None,
            updated_at: now,
        })
    }

    pub fn with_backup_id(mut self, backup_id: impl Into<String>) -> Self {
        self.backup_id = Some(backup_id.into());
        self
    }

    pub fn with_restore_type(mut self, restore_type: impl Into<String>) -> Self {
        self.restore_type = restore_type.into();
        self
    }

    pub fn with_status(mut self, status: RecordStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets progress, clamped to 100
    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = progress.min(100);
        self
    }

    pub fn with_messages(
        mut self,
        status_message: Option<String>,
        error_message: Option<String>,
    ) -> Self {
        self.status_message = status_message;
        self.error_message = error_message;
        self
    }

    pub fn with_restore_options(mut self, options: Option<Value>) -> Self {
        self.restore_options = options;
        self
    }

    pub fn with_requested_by(mut self, requested_by: impl Into<String>) -> Self {
        self.requested_by = requested_by.into();
        self
    }

    pub fn with_restored_databases_count(mut self, count: u32) -> Self {
        self.restored_databases_count = count;
        self
    }

    pub fn with_timestamps(
        mut self,
        created_at: DateTime<Utc>,
        started_at: Option<DateTime<Utc>>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Self {
        self.created_at = created_at;
        self.started_at = started_at;
        self.completed_at = completed_at;
        self
    }

    pub fn with_primary_row_id(mut self, id: Option<i64>) -> Self {
        self.primary_row_id = id;
        self
    }

    /// Restores persisted sync bookkeeping (used by store adapters)
    pub fn with_sync_state(
        mut self,
        sync_status: SyncStatus,
        last_sync_at: Option<DateTime<Utc>>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        self.sync_status = sync_status;
        self.last_sync_at = last_sync_at;
        self.updated_at = updated_at;
        self
    }

    pub fn restore_id(&self) -> &str {
        &self.restore_id
    }

    pub fn backup_id(&self) -> Option<&str> {
        self.backup_id.as_deref()
    }

    pub fn restore_type(&self) -> &str {
        &self.restore_type
    }

    pub fn status(&self) -> RecordStatus {
        self.status
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn restore_options(&self) -> Option<&Value> {
        self.restore_options.as_ref()
    }

    pub fn requested_by(&self) -> &str {
        &self.requested_by
    }

    pub fn restored_databases_count(&self) -> u32 {
        self.restored_databases_count
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn primary_row_id(&self) -> Option<i64> {
        self.primary_row_id
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.sync_status
    }

    pub fn last_sync_at(&self) -> Option<DateTime<Utc>> {
        self.last_sync_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// True when every field shared with the primary store is equal
    pub fn same_content(&self, other: &RestoreRecord) -> bool {
        self.restore_id == other.restore_id
            && self.backup_id == other.backup_id
            && self.restore_type == other.restore_type
            && self.status == other.status
            && self.progress == other.progress
            && self.status_message == other.status_message
            && self.error_message == other.error_message
            && self.restore_options == other.restore_options
            && self.requested_by == other.requested_by
            && self.restored_databases_count == other.restored_databases_count
            && self.started_at == other.started_at
            && self.completed_at == other.completed_at
    }

    /// Marks the record as pushed to the primary store
    pub fn mark_pushed(&mut self, now: DateTime<Utc>) {
        if self.sync_status == SyncStatus::Pending {
            self.sync_status = SyncStatus::Synced;
            self.updated_at = now;
        }
        self.last_sync_at = Some(match self.last_sync_at {
            Some(previous) if previous > now => previous,
            _ => now,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_blank_id() {
        assert!(RestoreRecord::new("").is_err());
    }

    #[test]
    fn progress_is_clamped() {
        let r = RestoreRecord::new("rs-1").unwrap().with_progress(250);
        assert_eq!(r.progress(), 100);
    }

    #[test]
    fn mark_pushed_promotes_pending_only() {
        let now = Utc::now();
        let mut r = RestoreRecord::new("rs-1").unwrap();
        r.mark_pushed(now);
        assert_eq!(r.sync_status(), SyncStatus::Synced);
        assert_eq!(r.last_sync_at(), Some(now));

        let mut verified = RestoreRecord::new("rs-2")
            .unwrap()
            .with_sync_state(SyncStatus::Verified, None, now);
        verified.mark_pushed(now);
        assert_eq!(verified.sync_status(), SyncStatus::Verified);
    }

    #[test]
    fn same_content_ignores_sync_bookkeeping() {
        let a = RestoreRecord::new("rs-1").unwrap().with_backup_id("bk-1");
        let mut b = a.clone();
        b.mark_pushed(Utc::now());
        assert!(a.same_content(&b));

        let c = a.clone().with_progress(50);
        assert!(!a.same_content(&c));
    }
}
