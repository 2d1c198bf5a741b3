//! Primary-store row representation
//!
//! A [`PrimaryRecord`] is a backup row exactly as the primary store hands it
//! over. The join key and status are optional so that malformed rows can be
//! carried into the sync engine and rejected one at a time instead of failing
//! the whole batch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::backup::{BackupDetails, BackupRecord};
use super::errors::DomainError;
use super::status::RecordStatus;

/// A backup row read from (or written to) the primary store
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PrimaryRecord {
    /// The primary store's own row id
    pub row_id: Option<i64>,
    pub backup_id: Option<String>,
    /// Raw status text, validated on ingest
    pub status: Option<String>,
    #[serde(flatten)]
    pub details: BackupDetails,
    pub created_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl PrimaryRecord {
    /// Starts a well-formed row for `backup_id`
    pub fn new(backup_id: impl Into<String>, status: RecordStatus) -> Self {
        Self {
            backup_id: Some(backup_id.into()),
            status: Some(status.as_str().to_string()),
            ..Self::default()
        }
    }

    pub fn with_details(mut self, details: BackupDetails) -> Self {
        self.details = details;
        self
    }

    pub fn with_row_id(mut self, row_id: i64) -> Self {
        self.row_id = Some(row_id);
        self
    }

    pub fn with_timestamps(
        mut self,
        started_at: Option<DateTime<Utc>>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Self {
        self.started_at = started_at;
        self.completed_at = completed_at;
        self
    }

    /// Returns the join key, or an error when it is absent or blank
    pub fn require_id(&self) -> Result<&str, DomainError> {
        match self.backup_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => Ok(id),
            _ => Err(DomainError::MissingId("backup_id".to_string())),
        }
    }

    /// Returns the parsed status, or an error when absent or unknown
    pub fn parsed_status(&self) -> Result<RecordStatus, DomainError> {
        match self.status.as_deref() {
            Some(raw) => raw.parse(),
            None => Err(DomainError::InvalidStatus("<missing>".to_string())),
        }
    }

    /// Builds the local record for a first sighting of this row
    ///
    /// The returned record is still in `pending` sync status; the caller
    /// decides how it enters the state machine.
    pub fn to_backup_record(&self) -> Result<BackupRecord, DomainError> {
        let id = self.require_id()?;
        let status = self.parsed_status()?;

        let mut record = BackupRecord::new(id, status)?
            .with_details(self.details.clone())
            .with_started_at(self.started_at)
            .with_completed_at(self.completed_at)
            .with_primary_row_id(self.row_id);
        if let Some(created_at) = self.created_at {
            record = record.with_created_at(created_at);
        }
        Ok(record)
    }

    /// Projects a local record onto the primary schema
    ///
    /// Local-only fields (`sync_status`, `conflict_reason`, `last_sync_at`,
    /// `file_verified_at`) are dropped.
    pub fn from_backup_record(record: &BackupRecord) -> Self {
        Self {
            row_id: record.primary_row_id(),
            backup_id: Some(record.backup_id().to_string()),
            status: Some(record.status().as_str().to_string()),
            details: record.details().clone(),
            created_at: Some(record.created_at()),
            started_at: record.started_at(),
            completed_at: record.completed_at(),
        }
    }

    /// True when every field shared by both stores is equal
    ///
    /// The primary row id is ignored since it is only known to one side
    /// until the first pull.
    pub fn same_content(&self, other: &PrimaryRecord) -> bool {
        self.backup_id == other.backup_id
            && self.status == other.status
            && self.details == other.details
            && self.started_at == other.started_at
            && self.completed_at == other.completed_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_blank_id_is_rejected() {
        let row = PrimaryRecord::default();
        assert!(row.require_id().is_err());

        let row = PrimaryRecord {
            backup_id: Some("   ".into()),
            ..PrimaryRecord::default()
        };
        assert!(row.require_id().is_err());
    }

    #[test]
    fn unknown_status_is_rejected() {
        let mut row = PrimaryRecord::new("bk", RecordStatus::Running);
        row.status = Some("exploded".into());
        assert!(matches!(
            row.to_backup_record(),
            Err(DomainError::InvalidStatus(_))
        ));
    }

    #[test]
    fn to_backup_record_copies_fields() {
        let details = BackupDetails {
            file_path: Some("/b/bk.tar.gz".into()),
            file_size: Some(42),
            checksum: Some("abc".into()),
            ..BackupDetails::default()
        };
        let row = PrimaryRecord::new("bk", RecordStatus::Completed)
            .with_row_id(9)
            .with_details(details.clone());

        let record = row.to_backup_record().unwrap();
        assert_eq!(record.backup_id(), "bk");
        assert_eq!(record.status(), RecordStatus::Completed);
        assert_eq!(record.details(), &details);
        assert_eq!(record.primary_row_id(), Some(9));
    }

    #[test]
    fn projection_ignores_local_only_fields() {
        let record = PrimaryRecord::new("bk", RecordStatus::Failed)
            .to_backup_record()
            .unwrap();
        let mut conflicted = record.clone();
        conflicted
            .transition_sync(
                crate::domain::SyncStatus::Conflict,
                Some("x".into()),
                Utc::now(),
            )
            .unwrap();

        let a = PrimaryRecord::from_backup_record(&record);
        let b = PrimaryRecord::from_backup_record(&conflicted);
        assert!(a.same_content(&b));
    }

    #[test]
    fn deserializes_flat_json_row() {
        let json = serde_json::json!({
            "row_id": 3,
            "backup_id": "bk-9",
            "status": "running",
            "backup_type": "logical",
            "file_path": null,
            "file_size": null,
            "compressed_size": null,
            "compression_ratio": null,
            "checksum": null,
            "databases_count": 2,
            "encryption_enabled": true,
            "error_message": null,
            "extra_data": {"requested_by": "ops"},
            "created_at": null,
            "started_at": null,
            "completed_at": null
        });
        let row: PrimaryRecord = serde_json::from_value(json).unwrap();
        assert_eq!(row.require_id().unwrap(), "bk-9");
        assert_eq!(row.details.databases_count, 2);
        assert!(row.details.encryption_enabled);
    }
}
