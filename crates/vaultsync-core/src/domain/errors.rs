//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! including validation failures, invalid state transitions and
//! unparseable enum values coming from either store.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A record arrived without its join key
    #[error("Missing record identifier: {0}")]
    MissingId(String),

    /// Unknown backup/restore status value
    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    /// Unknown sync status value
    #[error("Invalid sync status: {0}")]
    InvalidSyncStatus(String),

    /// Unknown sync-log operation, direction or record type
    #[error("Invalid log field: {0}")]
    InvalidLogField(String),

    /// Invalid state transition attempt
    #[error("Invalid state transition from {from} to {to}")]
    InvalidState {
        /// The current state
        from: String,
        /// The attempted target state
        to: String,
    },

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DomainError::MissingId("backup_id".to_string());
        assert_eq!(err.to_string(), "Missing record identifier: backup_id");

        let err = DomainError::InvalidStatus("exploded".to_string());
        assert_eq!(err.to_string(), "Invalid status: exploded");

        let err = DomainError::InvalidState {
            from: "pending".to_string(),
            to: "verified".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid state transition from pending to verified"
        );
    }

    #[test]
    fn test_error_equality() {
        let err1 = DomainError::InvalidSyncStatus("x".to_string());
        let err2 = DomainError::InvalidSyncStatus("x".to_string());
        let err3 = DomainError::InvalidSyncStatus("y".to_string());

        assert_eq!(err1, err2);
        assert_ne!(err1, err3);
    }
}
