//! Backup record domain entity
//!
//! A [`BackupRecord`] is the local store's copy of one backup's metadata plus
//! the reconciliation bookkeeping that only the local store keeps
//! (`sync_status`, `conflict_reason`, `last_sync_at`, `file_verified_at`).
//! The `backup_id` is the join key between the two stores and never changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::DomainError;
use super::status::{RecordStatus, SyncStatus};

/// Default backup type for records created without one
pub const DEFAULT_BACKUP_TYPE: &str = "physical";

/// Descriptive attributes copied verbatim between the two stores
///
/// These never take part in conflict detection. When both stores hold a
/// value the configured field precedence decides which one is kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupDetails {
    /// Kind of backup, e.g. `physical` or `logical`
    pub backup_type: String,
    /// Location of the backup artifact (absolute, or relative to the backup root)
    pub file_path: Option<String>,
    /// Artifact size in bytes
    pub file_size: Option<u64>,
    /// Compressed artifact size in bytes
    pub compressed_size: Option<u64>,
    pub compression_ratio: Option<f64>,
    pub checksum: Option<String>,
    pub databases_count: u32,
    pub encryption_enabled: bool,
    pub error_message: Option<String>,
    /// Opaque key/value payload, never inspected
    pub extra_data: Option<Value>,
}

impl Default for BackupDetails {
    fn default() -> Self {
        Self {
            backup_type: DEFAULT_BACKUP_TYPE.to_string(),
            file_path: None,
            file_size: None,
            compressed_size: None,
            compression_ratio: None,
            checksum: None,
            databases_count: 1,
            encryption_enabled: false,
            error_message: None,
            extra_data: None,
        }
    }
}

/// The local store's view of a backup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupRecord {
    backup_id: String,
    status: RecordStatus,
    details: BackupDetails,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    /// Row id of the matching primary-store row, refreshed on every pull
    primary_row_id: Option<i64>,
    sync_status: SyncStatus,
    conflict_reason: Option<String>,
    last_sync_at: Option<DateTime<Utc>>,
    file_verified_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl BackupRecord {
    /// Creates a new record in `pending` sync status
    ///
    /// # Errors
    ///
    /// Returns `DomainError::MissingId` if `backup_id` is blank.
    ///
    /// # Example
    ///
    /// ```
    /// use vaultsync_core::domain::{BackupRecord, RecordStatus, SyncStatus};
    ///
    /// let record = BackupRecord::new("bk-001", RecordStatus::Running).unwrap();
    /// assert_eq!(record.sync_status(), SyncStatus::Pending);
    /// assert!(record.last_sync_at().is_none());
    /// ```
    pub fn new(backup_id: impl Into<String>, status: RecordStatus) -> Result<Self, DomainError> {
        let backup_id = backup_id.into();
        if backup_id.trim().is_empty() {
            return Err(DomainError::MissingId("backup_id".to_string()));
        }
        let now = Utc::now();
        Ok(Self {
            backup_id,
            status,
            details: BackupDetails::default(),
            created_at: now,
            started_at: None,
            completed_at: None,
            primary_row_id: None,
            sync_status: SyncStatus::Pending,
            conflict_reason: None,
            last_sync_at: None,
            file_verified_at: None,
            updated_at: now,
        })
    }

    // --- builders ---

    pub fn with_details(mut self, details: BackupDetails) -> Self {
        self.details = details;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn with_started_at(mut self, started_at: Option<DateTime<Utc>>) -> Self {
        self.started_at = started_at;
        self
    }

    pub fn with_completed_at(mut self, completed_at: Option<DateTime<Utc>>) -> Self {
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
        conflict_reason: Option<String>,
        last_sync_at: Option<DateTime<Utc>>,
    ) -> Self {
        self.sync_status = sync_status;
        self.conflict_reason = conflict_reason;
        self.last_sync_at = last_sync_at;
        self
    }

    pub fn with_file_verified_at(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.file_verified_at = at;
        self
    }

    pub fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = updated_at;
        self
    }

    // --- accessors ---

    pub fn backup_id(&self) -> &str {
        &self.backup_id
    }

    pub fn status(&self) -> RecordStatus {
        self.status
    }

    pub fn details(&self) -> &BackupDetails {
        &self.details
    }

    pub fn file_path(&self) -> Option<&str> {
        self.details.file_path.as_deref()
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

    pub fn conflict_reason(&self) -> Option<&str> {
        self.conflict_reason.as_deref()
    }

    pub fn last_sync_at(&self) -> Option<DateTime<Utc>> {
        self.last_sync_at
    }

    pub fn file_verified_at(&self) -> Option<DateTime<Utc>> {
        self.file_verified_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Wall-clock duration of the backup, when both ends are known
    pub fn duration(&self) -> Option<chrono::Duration> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }

    // --- mutation ---

    /// Sets the operation status
    pub fn set_status(&mut self, status: RecordStatus) {
        if self.status != status {
            self.status = status;
            self.updated_at = Utc::now();
        }
    }

    /// Replaces the descriptive fields
    pub fn set_details(&mut self, details: BackupDetails) {
        if self.details != details {
            self.details = details;
            self.updated_at = Utc::now();
        }
    }

    pub fn set_error_message(&mut self, message: Option<String>) {
        self.details.error_message = message;
        self.updated_at = Utc::now();
    }

    pub fn set_started_at(&mut self, at: Option<DateTime<Utc>>) {
        self.started_at = at;
        self.updated_at = Utc::now();
    }

    pub fn set_completed_at(&mut self, at: Option<DateTime<Utc>>) {
        self.completed_at = at;
        self.updated_at = Utc::now();
    }

    pub fn set_primary_row_id(&mut self, id: Option<i64>) {
        if id.is_some() {
            self.primary_row_id = id;
        }
    }

    /// Advances `last_sync_at`, never moving it backwards
    pub fn touch_sync(&mut self, now: DateTime<Utc>) {
        self.last_sync_at = Some(match self.last_sync_at {
            Some(previous) if previous > now => previous,
            _ => now,
        });
    }

    /// Records that the artifact was confirmed on disk
    pub fn mark_file_verified(&mut self, now: DateTime<Utc>) {
        self.file_verified_at = Some(now);
    }

    /// Moves the record to `target` sync status
    ///
    /// `conflict_reason` is set when entering `conflict` and cleared for
    /// every other target. `last_sync_at` is touched.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidState` for an illegal transition.
    pub fn transition_sync(
        &mut self,
        target: SyncStatus,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if !self.sync_status.can_transition_to(target) {
            return Err(DomainError::InvalidState {
                from: self.sync_status.to_string(),
                to: target.to_string(),
            });
        }

        self.conflict_reason = match target {
            SyncStatus::Conflict => reason,
            _ => None,
        };
        if self.sync_status != target {
            self.updated_at = now;
        }
        self.sync_status = target;
        self.touch_sync(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn record() -> BackupRecord {
        BackupRecord::new("bk-1", RecordStatus::Running).unwrap()
    }

    #[test]
    fn new_rejects_blank_id() {
        assert_eq!(
            BackupRecord::new("  ", RecordStatus::Pending),
            Err(DomainError::MissingId("backup_id".to_string()))
        );
    }

    #[test]
    fn new_defaults() {
        let r = record();
        assert_eq!(r.backup_id(), "bk-1");
        assert_eq!(r.sync_status(), SyncStatus::Pending);
        assert_eq!(r.details().backup_type, DEFAULT_BACKUP_TYPE);
        assert_eq!(r.details().databases_count, 1);
        assert!(r.conflict_reason().is_none());
    }

    #[test]
    fn touch_sync_is_monotonic() {
        let mut r = record();
        let later = Utc::now();
        let earlier = later - Duration::hours(1);

        r.touch_sync(later);
        r.touch_sync(earlier);
        assert_eq!(r.last_sync_at(), Some(later));
    }

    #[test]
    fn entering_conflict_sets_reason_and_resolution_clears_it() {
        let mut r = record();
        let now = Utc::now();
        r.transition_sync(SyncStatus::Synced, None, now).unwrap();
        r.transition_sync(SyncStatus::Conflict, Some("status mismatch".into()), now)
            .unwrap();
        assert_eq!(r.conflict_reason(), Some("status mismatch"));

        r.transition_sync(SyncStatus::Verified, None, now).unwrap();
        assert!(r.conflict_reason().is_none());
        assert_eq!(r.sync_status(), SyncStatus::Verified);
    }

    #[test]
    fn illegal_transition_is_rejected() {
        let mut r = record();
        let err = r
            .transition_sync(SyncStatus::Verified, None, Utc::now())
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidState { .. }));
        assert_eq!(r.sync_status(), SyncStatus::Pending);
    }

    #[test]
    fn duration_requires_both_timestamps() {
        let start = Utc::now();
        let r = record().with_started_at(Some(start));
        assert!(r.duration().is_none());

        let r = r.with_completed_at(Some(start + Duration::seconds(90)));
        assert_eq!(r.duration(), Some(Duration::seconds(90)));
    }

    #[test]
    fn set_primary_row_id_ignores_none() {
        let mut r = record().with_primary_row_id(Some(7));
        r.set_primary_row_id(None);
        assert_eq!(r.primary_row_id(), Some(7));
    }
}
