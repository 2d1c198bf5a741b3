//! Reason codes for sync-log entries
//!
//! Provides structured codes for categorizing why a record was flagged,
//! how it was resolved, or why it was pushed. Stored under
//! `details.reason_code` so the audit trail can be filtered without parsing
//! free text.

use std::fmt;

use serde::{Deserialize, Serialize};

use vaultsync_core::ports::FileCheck;

/// Structured reason codes for reconciliation decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    /// The two stores report different operation statuses
    StatusMismatch,
    /// The artifact was found, readable and non-empty
    ArtifactPresent,
    /// Nothing exists at the artifact path
    ArtifactMissing,
    /// The artifact exists but is empty
    ArtifactEmpty,
    /// The file check did not finish in time
    OracleTimeout,
    /// The file check failed (permissions, traversal, I/O)
    OracleUnreadable,
    /// The record has no artifact path and no fallback location matched
    NoArtifactPath,
    /// The primary store has no row for this record
    PrimaryMissing,
    /// The primary store's row differs from the local record
    PrimaryStale,
}

impl ReasonCode {
    /// Maps an oracle answer to the code explaining it
    pub fn from_file_check(check: &FileCheck) -> Self {
        match check {
            FileCheck::Present => ReasonCode::ArtifactPresent,
            FileCheck::Missing => ReasonCode::ArtifactMissing,
            FileCheck::Empty => ReasonCode::ArtifactEmpty,
            FileCheck::Unreadable(_) => ReasonCode::OracleUnreadable,
            FileCheck::TimedOut => ReasonCode::OracleTimeout,
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReasonCode::StatusMismatch => "status_mismatch",
            ReasonCode::ArtifactPresent => "artifact_present",
            ReasonCode::ArtifactMissing => "artifact_missing",
            ReasonCode::ArtifactEmpty => "artifact_empty",
            ReasonCode::OracleTimeout => "oracle_timeout",
            ReasonCode::OracleUnreadable => "oracle_unreadable",
            ReasonCode::NoArtifactPath => "no_artifact_path",
            ReasonCode::PrimaryMissing => "primary_missing",
            ReasonCode::PrimaryStale => "primary_stale",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_code_display() {
        assert_eq!(ReasonCode::StatusMismatch.to_string(), "status_mismatch");
        assert_eq!(ReasonCode::OracleTimeout.to_string(), "oracle_timeout");
        assert_eq!(ReasonCode::NoArtifactPath.to_string(), "no_artifact_path");
        assert_eq!(ReasonCode::PrimaryStale.to_string(), "primary_stale");
    }

    #[test]
    fn reason_code_serialization() {
        let code = ReasonCode::ArtifactMissing;
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, "\"artifact_missing\"");

        let deserialized: ReasonCode = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, code);
    }

    #[test]
    fn display_matches_serde_form() {
        for code in [
            ReasonCode::ArtifactPresent,
            ReasonCode::ArtifactEmpty,
            ReasonCode::OracleUnreadable,
            ReasonCode::PrimaryMissing,
        ] {
            let json = serde_json::to_value(code).unwrap();
            assert_eq!(json.as_str(), Some(code.to_string().as_str()));
        }
    }

    #[test]
    fn from_file_check_covers_every_answer() {
        assert_eq!(
            ReasonCode::from_file_check(&FileCheck::Present),
            ReasonCode::ArtifactPresent
        );
        assert_eq!(
            ReasonCode::from_file_check(&FileCheck::Unreadable("denied".into())),
            ReasonCode::OracleUnreadable
        );
        assert_eq!(
            ReasonCode::from_file_check(&FileCheck::TimedOut),
            ReasonCode::OracleTimeout
        );
    }
}
