//! Reconciliation policy
//!
//! Turns the `reconcile.*` configuration strings into typed policy values and
//! implements the field-precedence merge of descriptive attributes.

use std::fmt;

use tracing::{debug, warn};

use vaultsync_core::config::ReconcileConfig;
use vaultsync_core::domain::BackupDetails;

use crate::error::ConflictError;

/// Which status disagreements count as conflicts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetectionMode {
    /// Any `status` disagreement is a conflict
    #[default]
    Strict,
    /// Disagreements the artifact corroborates are accepted from the primary
    FileAware,
}

/// Which store wins when both hold a value for a descriptive field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldPrecedence {
    #[default]
    Primary,
    Local,
}

/// How the resolver treats an oracle failure (unreadable or timed out check)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OracleFailurePolicy {
    /// Treat the artifact as absent
    #[default]
    FailClosed,
    /// Leave the record in conflict and log why
    Defer,
}

impl fmt::Display for DetectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DetectionMode::Strict => "strict",
            DetectionMode::FileAware => "file_aware",
        })
    }
}

impl fmt::Display for FieldPrecedence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FieldPrecedence::Primary => "primary",
            FieldPrecedence::Local => "local",
        })
    }
}

impl fmt::Display for OracleFailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OracleFailurePolicy::FailClosed => "fail_closed",
            OracleFailurePolicy::Defer => "defer",
        })
    }
}

/// Parses a `reconcile.detection` value
pub fn parse_detection_mode(s: &str) -> Option<DetectionMode> {
    match s {
        "strict" => Some(DetectionMode::Strict),
        "file_aware" => Some(DetectionMode::FileAware),
        _ => None,
    }
}

/// Parses a `reconcile.field_precedence` value
pub fn parse_field_precedence(s: &str) -> Option<FieldPrecedence> {
    match s {
        "primary" => Some(FieldPrecedence::Primary),
        "local" => Some(FieldPrecedence::Local),
        _ => None,
    }
}

/// Parses a `reconcile.oracle_failure` value
pub fn parse_oracle_failure(s: &str) -> Option<OracleFailurePolicy> {
    match s {
        "fail_closed" => Some(OracleFailurePolicy::FailClosed),
        "defer" => Some(OracleFailurePolicy::Defer),
        _ => None,
    }
}

/// The three policy knobs the reconciler consults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReconcilePolicy {
    pub detection: DetectionMode,
    pub field_precedence: FieldPrecedence,
    pub oracle_failure: OracleFailurePolicy,
}

impl ReconcilePolicy {
    /// Builds the policy from configuration, rejecting unknown values
    pub fn try_from_config(config: &ReconcileConfig) -> Result<Self, ConflictError> {
        let detection = parse_detection_mode(&config.detection).ok_or_else(|| {
            ConflictError::InvalidPolicy {
                setting: "reconcile.detection",
                value: config.detection.clone(),
                valid: "strict, file_aware",
            }
        })?;
        let field_precedence =
            parse_field_precedence(&config.field_precedence).ok_or_else(|| {
                ConflictError::InvalidPolicy {
                    setting: "reconcile.field_precedence",
                    value: config.field_precedence.clone(),
                    valid: "primary, local",
                }
            })?;
        let oracle_failure = parse_oracle_failure(&config.oracle_failure).ok_or_else(|| {
            ConflictError::InvalidPolicy {
                setting: "reconcile.oracle_failure",
                value: config.oracle_failure.clone(),
                valid: "fail_closed, defer",
            }
        })?;

        Ok(Self {
            detection,
            field_precedence,
            oracle_failure,
        })
    }

    /// Builds the policy from configuration
    ///
    /// Unknown values are logged and replaced by the defaults.
    pub fn from_config(config: &ReconcileConfig) -> Self {
        let policy = match Self::try_from_config(config) {
            Ok(policy) => policy,
            Err(e) => {
                warn!(error = %e, "Invalid reconcile policy, falling back to defaults");
                Self {
                    detection: parse_detection_mode(&config.detection).unwrap_or_default(),
                    field_precedence: parse_field_precedence(&config.field_precedence)
                        .unwrap_or_default(),
                    oracle_failure: parse_oracle_failure(&config.oracle_failure)
                        .unwrap_or_default(),
                }
            }
        };

        debug!(
            detection = %policy.detection,
            field_precedence = %policy.field_precedence,
            oracle_failure = %policy.oracle_failure,
            "Reconcile policy initialized"
        );
        policy
    }

    /// Merges descriptive fields of both stores
    ///
    /// Optional fields take the winning side's value and fall back to the
    /// other side when the winner holds none. Non-optional fields always take
    /// the winning side.
    pub fn merge_details(&self, local: &BackupDetails, primary: &BackupDetails) -> BackupDetails {
        let (winner, other) = match self.field_precedence {
            FieldPrecedence::Primary => (primary, local),
            FieldPrecedence::Local => (local, primary),
        };

        BackupDetails {
            backup_type: winner.backup_type.clone(),
            file_path: winner.file_path.clone().or_else(|| other.file_path.clone()),
            file_size: winner.file_size.or(other.file_size),
            compressed_size: winner.compressed_size.or(other.compressed_size),
            compression_ratio: winner.compression_ratio.or(other.compression_ratio),
            checksum: winner.checksum.clone().or_else(|| other.checksum.clone()),
            databases_count: winner.databases_count,
            encryption_enabled: winner.encryption_enabled,
            error_message: winner
                .error_message
                .clone()
                .or_else(|| other.error_message.clone()),
            extra_data: winner.extra_data.clone().or_else(|| other.extra_data.clone()),
        }
    }
}
