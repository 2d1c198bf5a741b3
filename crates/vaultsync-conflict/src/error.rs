//! Error types for the conflict engine

use thiserror::Error;

use vaultsync_core::domain::DomainError;

/// Errors that can occur during conflict detection and resolution
#[derive(Debug, Error)]
pub enum ConflictError {
    /// A policy string from configuration is not recognised
    #[error("invalid {setting}: '{value}'; valid: {valid}")]
    InvalidPolicy {
        setting: &'static str,
        value: String,
        valid: &'static str,
    },

    /// The record handed to the resolver is not in conflict
    #[error("record is not in conflict: {0}")]
    NotInConflict(String),

    /// Applying the resolution violated a domain invariant
    #[error(transparent)]
    Domain(#[from] DomainError),
}
