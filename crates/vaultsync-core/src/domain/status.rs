//! Lifecycle enums shared by backup and restore records
//!
//! [`RecordStatus`] is the operation's own lifecycle, written by the
//! backup/restore executor and copied between stores. [`SyncStatus`] is the
//! reconciliation lifecycle and only ever exists in the local store.
//!
//! ## Sync status state machine
//!
//! ```text
//! pending ──→ synced ──→ conflict ──→ verified
//!    │                      ↑            │
//!    └──────────────────────┴────────────┘
//! ```
//!
//! `verified` is not terminal: a later pull that detects fresh divergence
//! moves the record back to `conflict`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;

/// Status of a backup or restore operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl RecordStatus {
    /// Returns the stored string form
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Pending => "pending",
            RecordStatus::Running => "running",
            RecordStatus::Completed => "completed",
            RecordStatus::Failed => "failed",
        }
    }

    /// Returns true while the operation has not finished
    pub fn is_in_flight(&self) -> bool {
        matches!(self, RecordStatus::Pending | RecordStatus::Running)
    }

    /// All statuses in lifecycle order
    pub fn all() -> [RecordStatus; 4] {
        [
            RecordStatus::Pending,
            RecordStatus::Running,
            RecordStatus::Completed,
            RecordStatus::Failed,
        ]
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending" => Ok(RecordStatus::Pending),
            "running" => Ok(RecordStatus::Running),
            "completed" => Ok(RecordStatus::Completed),
            "failed" => Ok(RecordStatus::Failed),
            other => Err(DomainError::InvalidStatus(other.to_string())),
        }
    }
}

/// Reconciliation state of a locally stored record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Written locally, never reconciled with the primary store
    Pending,
    /// Last pull or push found both stores in agreement
    Synced,
    /// The stores disagree on the record's status
    Conflict,
    /// A conflict was settled using the artifact as ground truth
    Verified,
}

impl SyncStatus {
    /// Returns the stored string form
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "pending",
            SyncStatus::Synced => "synced",
            SyncStatus::Conflict => "conflict",
            SyncStatus::Verified => "verified",
        }
    }

    /// All sync statuses, in state machine order
    pub fn all() -> [SyncStatus; 4] {
        [
            SyncStatus::Pending,
            SyncStatus::Synced,
            SyncStatus::Conflict,
            SyncStatus::Verified,
        ]
    }

    /// Checks whether moving from `self` to `target` is a legal transition
    pub fn can_transition_to(&self, target: SyncStatus) -> bool {
        match (self, target) {
            (SyncStatus::Pending, SyncStatus::Pending) => true,
            (SyncStatus::Pending, SyncStatus::Synced) => true,
            (SyncStatus::Pending, SyncStatus::Conflict) => true,

            (SyncStatus::Synced, SyncStatus::Synced) => true,
            (SyncStatus::Synced, SyncStatus::Conflict) => true,

            // Re-detection refreshes the reason; resolution verifies; a pull
            // that finds both stores agreeing again clears the conflict
            (SyncStatus::Conflict, SyncStatus::Conflict) => true,
            (SyncStatus::Conflict, SyncStatus::Verified) => true,
            (SyncStatus::Conflict, SyncStatus::Synced) => true,

            (SyncStatus::Verified, SyncStatus::Verified) => true,
            (SyncStatus::Verified, SyncStatus::Synced) => true,
            (SyncStatus::Verified, SyncStatus::Conflict) => true,

            _ => false,
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending" => Ok(SyncStatus::Pending),
            "synced" => Ok(SyncStatus::Synced),
            "conflict" => Ok(SyncStatus::Conflict),
            "verified" => Ok(SyncStatus::Verified),
            other => Err(DomainError::InvalidSyncStatus(other.to_string())),
        }
    }
}
