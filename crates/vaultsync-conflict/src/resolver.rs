//! Conflict resolution rule
//!
//! A conflict means the operation is no longer in flight, so a record is
//! always resolved toward the state the artifact supports:
//! - artifact present: `completed`
//! - artifact absent: `failed`, with a fixed diagnostic message
//!
//! Never toward `running` or `pending`.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use vaultsync_core::domain::{BackupRecord, RecordStatus, SyncStatus};
use vaultsync_core::ports::FileCheck;

use crate::error::ConflictError;
use crate::policy::OracleFailurePolicy;

/// Diagnostic written to `error_message` when a record is corrected to failed
pub const MISSING_ARTIFACT_MESSAGE: &str = "backup artifact missing, status corrected to failed";

/// What a successful resolution did to the record's status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionOutcome {
    /// Status moved to `completed`
    FixedToCompleted,
    /// Status moved to `failed`
    FixedToFailed,
    /// Status already matched the artifact; only the sync status changed
    VerifiedConsistent,
}

impl ResolutionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionOutcome::FixedToCompleted => "fixed_to_completed",
            ResolutionOutcome::FixedToFailed => "fixed_to_failed",
            ResolutionOutcome::VerifiedConsistent => "verified_consistent",
        }
    }
}

impl std::fmt::Display for ResolutionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision for one conflicting record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved {
        outcome: ResolutionOutcome,
        old_status: RecordStatus,
        new_status: RecordStatus,
        /// The oracle answer the decision was based on
        file_exists: bool,
    },
    /// The oracle failed and policy says to wait for a later cycle
    Deferred { reason: String },
}

/// Applies the deterministic resolution rule
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictResolver {
    oracle_failure: OracleFailurePolicy,
}

impl ConflictResolver {
    pub fn new(oracle_failure: OracleFailurePolicy) -> Self {
        Self { oracle_failure }
    }

    /// Decides the resolution without touching the record
    pub fn decide(&self, current: RecordStatus, check: &FileCheck) -> Resolution {
        if check.is_oracle_failure() && self.oracle_failure == OracleFailurePolicy::Defer {
            return Resolution::Deferred {
                reason: format!("file check failed: {check}"),
            };
        }

        let file_exists = check.is_present();
        let new_status = if file_exists {
            RecordStatus::Completed
        } else {
            RecordStatus::Failed
        };
        let outcome = match (current == new_status, new_status) {
            (true, _) => ResolutionOutcome::VerifiedConsistent,
            (false, RecordStatus::Completed) => ResolutionOutcome::FixedToCompleted,
            (false, _) => ResolutionOutcome::FixedToFailed,
        };

        Resolution::Resolved {
            outcome,
            old_status: current,
            new_status,
            file_exists,
        }
    }

    /// Resolves `record` in place and returns the decision
    ///
    /// A deferred decision leaves the record untouched.
    ///
    /// # Errors
    ///
    /// `ConflictError::NotInConflict` if the record is not in `conflict`.
    pub fn apply(
        &self,
        record: &mut BackupRecord,
        check: &FileCheck,
        now: DateTime<Utc>,
    ) -> Result<Resolution, ConflictError> {
        if record.sync_status() != SyncStatus::Conflict {
            return Err(ConflictError::NotInConflict(record.backup_id().to_string()));
        }

        let resolution = self.decide(record.status(), check);
        let (outcome, new_status, file_exists) = match resolution {
            Resolution::Resolved {
                outcome,
                new_status,
                file_exists,
                ..
            } => (outcome, new_status, file_exists),
            Resolution::Deferred { .. } => {
                debug!(backup_id = %record.backup_id(), check = %check, "Resolution deferred");
                return Ok(resolution);
            }
        };

        match outcome {
            ResolutionOutcome::FixedToCompleted => {
                record.set_status(RecordStatus::Completed);
                if record.completed_at().is_none() {
                    record.set_completed_at(Some(now));
                }
            }
            ResolutionOutcome::FixedToFailed => {
                record.set_status(RecordStatus::Failed);
                record.set_error_message(Some(MISSING_ARTIFACT_MESSAGE.to_string()));
            }
            ResolutionOutcome::VerifiedConsistent => {}
        }
        if file_exists {
            record.mark_file_verified(now);
        }
        record.transition_sync(SyncStatus::Verified, None, now)?;

        info!(
            backup_id = %record.backup_id(),
            outcome = %outcome,
            new_status = %new_status,
            file_exists,
            "Conflict resolved"
        );
        Ok(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conflicted(status: RecordStatus) -> BackupRecord {
        let mut record = BackupRecord::new("bk-1", status).unwrap();
        record
            .transition_sync(SyncStatus::Conflict, Some("status mismatch".into()), Utc::now())
            .unwrap();
        record
    }

    #[test]
    fn test_present_artifact_resolves_to_completed() {
        let resolver = ConflictResolver::default();
        let mut record = conflicted(RecordStatus::Running);
        let now = Utc::now();

        let resolution = resolver.apply(&mut record, &FileCheck::Present, now).unwrap();

        assert!(matches!(
            resolution,
            Resolution::Resolved {
                outcome: ResolutionOutcome::FixedToCompleted,
                old_status: RecordStatus::Running,
                file_exists: true,
                ..
            }
        ));
        assert_eq!(record.status(), RecordStatus::Completed);
        assert_eq!(record.completed_at(), Some(now));
        assert_eq!(record.sync_status(), SyncStatus::Verified);
        assert!(record.conflict_reason().is_none());
        assert_eq!(record.file_verified_at(), Some(now));
    }

    #[test]
    fn test_existing_completed_at_is_kept() {
        let earlier = Utc::now() - chrono::Duration::hours(1);
        let mut record = conflicted(RecordStatus::Pending).with_completed_at(Some(earlier));
        ConflictResolver::default()
            .apply(&mut record, &FileCheck::Present, Utc::now())
            .unwrap();
        assert_eq!(record.completed_at(), Some(earlier));
    }

    #[test]
    fn test_missing_artifact_resolves_to_failed() {
        let mut record = conflicted(RecordStatus::Completed);
        let resolution = ConflictResolver::default()
            .apply(&mut record, &FileCheck::Missing, Utc::now())
            .unwrap();

        assert!(matches!(
            resolution,
            Resolution::Resolved {
                outcome: ResolutionOutcome::FixedToFailed,
                file_exists: false,
                ..
            }
        ));
        assert_eq!(record.status(), RecordStatus::Failed);
        assert_eq!(
            record.details().error_message.as_deref(),
            Some(MISSING_ARTIFACT_MESSAGE)
        );
        assert_eq!(record.sync_status(), SyncStatus::Verified);
        assert!(record.file_verified_at().is_none());
    }

    #[test]
    fn test_empty_artifact_counts_as_missing() {
        let mut record = conflicted(RecordStatus::Running);
        ConflictResolver::default()
            .apply(&mut record, &FileCheck::Empty, Utc::now())
            .unwrap();
        assert_eq!(record.status(), RecordStatus::Failed);
    }

    #[test]
    fn test_consistent_status_is_only_verified() {
        let mut record = conflicted(RecordStatus::Completed);
        let resolution = ConflictResolver::default()
            .apply(&mut record, &FileCheck::Present, Utc::now())
            .unwrap();
        assert!(matches!(
            resolution,
            Resolution::Resolved {
                outcome: ResolutionOutcome::VerifiedConsistent,
                ..
            }
        ));
        assert_eq!(record.status(), RecordStatus::Completed);
        assert_eq!(record.sync_status(), SyncStatus::Verified);
    }

    #[test]
    fn test_oracle_failure_fail_closed() {
        let mut record = conflicted(RecordStatus::Completed);
        ConflictResolver::new(OracleFailurePolicy::FailClosed)
            .apply(&mut record, &FileCheck::TimedOut, Utc::now())
            .unwrap();
        assert_eq!(record.status(), RecordStatus::Failed);
        assert_eq!(record.sync_status(), SyncStatus::Verified);
    }

    #[test]
    fn test_oracle_failure_deferred() {
        let mut record = conflicted(RecordStatus::Completed);
        let before = record.clone();
        let resolution = ConflictResolver::new(OracleFailurePolicy::Defer)
            .apply(
                &mut record,
                &FileCheck::Unreadable("permission denied".into()),
                Utc::now(),
            )
            .unwrap();

        assert_eq!(
            resolution,
            Resolution::Deferred {
                reason: "file check failed: unreadable (permission denied)".into()
            }
        );
        assert_eq!(record, before);
    }

    #[test]
    fn test_defer_policy_still_resolves_plain_absence() {
        let mut record = conflicted(RecordStatus::Completed);
        ConflictResolver::new(OracleFailurePolicy::Defer)
            .apply(&mut record, &FileCheck::Missing, Utc::now())
            .unwrap();
        assert_eq!(record.status(), RecordStatus::Failed);
    }

    #[test]
    fn test_record_not_in_conflict_is_rejected() {
        let mut record = BackupRecord::new("bk-2", RecordStatus::Completed).unwrap();
        let err = ConflictResolver::default()
            .apply(&mut record, &FileCheck::Present, Utc::now())
            .unwrap_err();
        assert!(matches!(err, ConflictError::NotInConflict(id) if id == "bk-2"));
    }

    #[test]
    fn test_resolution_never_targets_in_flight_status() {
        let resolver = ConflictResolver::default();
        for status in RecordStatus::all() {
            for check in [FileCheck::Present, FileCheck::Missing, FileCheck::TimedOut] {
                if let Resolution::Resolved { new_status, .. } = resolver.decide(status, &check) {
                    assert!(!new_status.is_in_flight());
                }
            }
        }
    }
}
