//! Sync-log domain entities
//!
//! Every decision the reconciler makes is recorded as a [`SyncLogEntry`].
//! The log is append-only: entries are never updated, which makes it the
//! audit trail for reconstructing why a record ended up in its current state.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::errors::DomainError;
use super::status::RecordStatus;

/// Operations recorded in the sync log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOperation {
    /// A primary row was pulled into the local store
    SyncBackup,
    /// A status disagreement was detected during a pull
    DetectConflict,
    /// A conflict was settled (or deferred) by the resolver
    ResolveConflict,
    /// A local record was pushed to the primary store
    SyncToPrimary,
    /// The executor registered a new record
    CreateRecord,
    /// The executor updated an existing record
    UpdateRecord,
}

impl SyncOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncOperation::SyncBackup => "sync_backup",
            SyncOperation::DetectConflict => "detect_conflict",
            SyncOperation::ResolveConflict => "resolve_conflict",
            SyncOperation::SyncToPrimary => "sync_to_primary",
            SyncOperation::CreateRecord => "create_record",
            SyncOperation::UpdateRecord => "update_record",
        }
    }

    pub fn all() -> [SyncOperation; 6] {
        [
            SyncOperation::SyncBackup,
            SyncOperation::DetectConflict,
            SyncOperation::ResolveConflict,
            SyncOperation::SyncToPrimary,
            SyncOperation::CreateRecord,
            SyncOperation::UpdateRecord,
        ]
    }
}

impl fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncOperation {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sync_backup" => Ok(SyncOperation::SyncBackup),
            "detect_conflict" => Ok(SyncOperation::DetectConflict),
            "resolve_conflict" => Ok(SyncOperation::ResolveConflict),
            "sync_to_primary" => Ok(SyncOperation::SyncToPrimary),
            "create_record" => Ok(SyncOperation::CreateRecord),
            "update_record" => Ok(SyncOperation::UpdateRecord),
            other => Err(DomainError::InvalidLogField(format!("operation '{other}'"))),
        }
    }
}

/// Which way data moved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDirection {
    PrimaryToLocal,
    LocalToPrimary,
    /// Written by the executor, not by a reconciliation cycle
    Manual,
}

impl SyncDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncDirection::PrimaryToLocal => "primary_to_local",
            SyncDirection::LocalToPrimary => "local_to_primary",
            SyncDirection::Manual => "manual",
        }
    }
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncDirection {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary_to_local" => Ok(SyncDirection::PrimaryToLocal),
            "local_to_primary" => Ok(SyncDirection::LocalToPrimary),
            "manual" => Ok(SyncDirection::Manual),
            other => Err(DomainError::InvalidLogField(format!("direction '{other}'"))),
        }
    }
}

/// Kind of record a log entry refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    Backup,
    Restore,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Backup => "backup",
            RecordType::Restore => "restore",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "backup" => Ok(RecordType::Backup),
            "restore" => Ok(RecordType::Restore),
            other => Err(DomainError::InvalidLogField(format!("record type '{other}'"))),
        }
    }
}

/// One append-only sync-log row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncLogEntry {
    /// Assigned by the store on insert
    id: Option<i64>,
    operation: SyncOperation,
    record_type: RecordType,
    record_id: String,
    old_status: Option<RecordStatus>,
    new_status: Option<RecordStatus>,
    sync_direction: SyncDirection,
    conflict_resolved: bool,
    /// Oracle answer observed while making the decision, if consulted
    file_exists: Option<bool>,
    details: Value,
    /// Reconciliation cycle that produced the entry
    cycle_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl SyncLogEntry {
    /// Creates an entry timestamped now, direction `primary_to_local`
    ///
    /// # Example
    ///
    /// ```
    /// use vaultsync_core::domain::{RecordType, SyncLogEntry, SyncOperation};
    ///
    /// let entry = SyncLogEntry::new(SyncOperation::SyncBackup, RecordType::Backup, "bk-1");
    /// assert!(entry.id().is_none());
    /// assert!(!entry.conflict_resolved());
    /// ```
    pub fn new(
        operation: SyncOperation,
        record_type: RecordType,
        record_id: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            operation,
            record_type,
            record_id: record_id.into(),
            old_status: None,
            new_status: None,
            sync_direction: SyncDirection::PrimaryToLocal,
            conflict_resolved: false,
            file_exists: None,
            details: Value::Null,
            cycle_id: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_statuses(
        mut self,
        old_status: Option<RecordStatus>,
        new_status: Option<RecordStatus>,
    ) -> Self {
        self.old_status = old_status;
        self.new_status = new_status;
        self
    }

    pub fn with_direction(mut self, direction: SyncDirection) -> Self {
        self.sync_direction = direction;
        self
    }

    pub fn with_conflict_resolved(mut self, resolved: bool) -> Self {
        self.conflict_resolved = resolved;
        self
    }

    pub fn with_file_exists(mut self, exists: Option<bool>) -> Self {
        self.file_exists = exists;
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    pub fn with_cycle_id(mut self, cycle_id: Option<Uuid>) -> Self {
        self.cycle_id = cycle_id;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn operation(&self) -> SyncOperation {
        self.operation
    }

    pub fn record_type(&self) -> RecordType {
        self.record_type
    }

    pub fn record_id(&self) -> &str {
        &self.record_id
    }

    pub fn old_status(&self) -> Option<RecordStatus> {
        self.old_status
    }

    pub fn new_status(&self) -> Option<RecordStatus> {
        self.new_status
    }

    pub fn sync_direction(&self) -> SyncDirection {
        self.sync_direction
    }

    pub fn conflict_resolved(&self) -> bool {
        self.conflict_resolved
    }

    pub fn file_exists(&self) -> Option<bool> {
        self.file_exists
    }

    pub fn details(&self) -> &Value {
        &self.details
    }

    pub fn cycle_id(&self) -> Option<Uuid> {
        self.cycle_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
