//! Conflict detection logic
//!
//! Decides whether a primary-store row disagrees materially with the local
//! record. Only `status` takes part; descriptive fields are merged, never
//! conflicted.

use tracing::{debug, info};

use vaultsync_core::domain::RecordStatus;

use crate::policy::DetectionMode;

/// Result of conflict detection check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectionResult {
    /// Both stores report the same status
    InSync,
    /// Statuses differ but the artifact corroborates the primary store;
    /// the local record adopts the primary status
    AdoptPrimary(RecordStatus),
    /// The stores disagree and the record must go through resolution
    Conflicted { reason: String },
}

impl DetectionResult {
    pub fn is_conflict(&self) -> bool {
        matches!(self, DetectionResult::Conflicted { .. })
    }
}

/// Detects status disagreements between the two stores
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictDetector {
    mode: DetectionMode,
}

impl ConflictDetector {
    pub fn new(mode: DetectionMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> DetectionMode {
        self.mode
    }

    /// True when detection needs the oracle's answer for this pair
    ///
    /// Equal statuses never consult the filesystem.
    pub fn needs_file_check(local: RecordStatus, primary: RecordStatus) -> bool {
        local != primary
    }

    /// Classifies one local/primary pair
    ///
    /// `file_exists` is the oracle's answer for the record's artifact; it is
    /// ignored when the statuses agree.
    pub fn detect(
        &self,
        local: RecordStatus,
        primary: RecordStatus,
        file_exists: bool,
    ) -> DetectionResult {
        if local == primary {
            return DetectionResult::InSync;
        }

        let conflicted = match self.mode {
            DetectionMode::Strict => true,
            DetectionMode::FileAware => Self::artifact_contradicts(local, primary, file_exists),
        };

        if conflicted {
            let reason = conflict_reason(local, primary, file_exists);
            info!(
                local = %local,
                primary = %primary,
                file_exists,
                mode = %self.mode,
                "Conflict detected: stores disagree on status"
            );
            DetectionResult::Conflicted { reason }
        } else {
            debug!(
                local = %local,
                primary = %primary,
                file_exists,
                "Status difference corroborated by artifact, adopting primary"
            );
            DetectionResult::AdoptPrimary(primary)
        }
    }

    /// The file-aware rule: a disagreement is a conflict when either side's
    /// claim is contradicted by the artifact
    fn artifact_contradicts(local: RecordStatus, primary: RecordStatus, file_exists: bool) -> bool {
        let local_done = local == RecordStatus::Completed;
        let primary_done = primary == RecordStatus::Completed;

        // Primary rolled back while the artifact still exists
        if local_done && primary.is_in_flight() && file_exists {
            return true;
        }
        // Primary claims completion the local side never saw, without proof
        if local.is_in_flight() && primary_done && !file_exists {
            return true;
        }
        if primary_done && !file_exists {
            return true;
        }
        if primary.is_in_flight() && file_exists {
            return true;
        }
        false
    }
}

/// Human-readable explanation stored in `conflict_reason`
pub fn conflict_reason(local: RecordStatus, primary: RecordStatus, file_exists: bool) -> String {
    format!(
        "status mismatch: local={} primary={} (artifact {})",
        local,
        primary,
        if file_exists { "present" } else { "absent" }
    )
}
