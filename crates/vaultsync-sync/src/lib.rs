//! vaultsync Sync - Backup metadata reconciliation engine
//!
//! Provides:
//! - The [`Reconciler`](engine::Reconciler): pull from the primary store,
//!   conflict resolution, push back, statistics and the full cycle
//! - A filesystem File Verifier with per-check timeout
//! - The executor-facing backup registry
//! - A scheduler running serialized cycles
//!
//! ## Modules
//!
//! - [`engine`] - Reconciler orchestrating the four phases
//! - [`verifier`] - Filesystem adapter for the artifact existence oracle
//! - [`registry`] - Direct record writes made by the backup/restore executor
//! - [`scheduler`] - Periodic cycle runner with backoff

pub mod engine;
pub mod registry;
pub mod scheduler;
pub mod verifier;

use thiserror::Error;

use vaultsync_core::domain::DomainError;

pub use engine::{CycleReport, PushSummary, Reconciler, ResolveSummary, SyncSummary};
pub use registry::{BackupRegistry, BackupUpdate};
pub use scheduler::CycleScheduler;
pub use verifier::FsFileVerifier;

/// Coarse classification of a [`ReconcileError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A malformed record; skipped, the batch continues
    Input,
    /// The file check failed; informational
    Oracle,
    /// A store was unreachable; fatal to the phase, retry next cycle
    Store,
    /// A record in a state the rules cannot represent
    Logic,
    /// Another cycle holds the reconciler
    Busy,
}

/// Errors that can occur during reconciliation
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A primary-store row or executor write that cannot be accepted
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// The artifact existence check failed or timed out
    #[error("file check failed for {path}: {reason}")]
    Oracle { path: String, reason: String },

    /// The local store could not be read or written
    #[error("local store error: {0:#}")]
    LocalStore(anyhow::Error),

    /// The primary store could not be read or written
    #[error("primary store error: {0:#}")]
    PrimaryStore(anyhow::Error),

    /// A record ended up in a state the rules cannot represent
    #[error("inconsistent record {backup_id}: {reason}")]
    Inconsistent { backup_id: String, reason: String },

    /// A cycle or phase is already running on this reconciler
    #[error("a reconciliation cycle is already in progress")]
    CycleInProgress,

    /// A domain rule rejected the change
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl ReconcileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReconcileError::InvalidRecord(_) => ErrorKind::Input,
            ReconcileError::Oracle { .. } => ErrorKind::Oracle,
            ReconcileError::LocalStore(_) | ReconcileError::PrimaryStore(_) => ErrorKind::Store,
            ReconcileError::Inconsistent { .. } | ReconcileError::Domain(_) => ErrorKind::Logic,
            ReconcileError::CycleInProgress => ErrorKind::Busy,
        }
    }

    /// True for store errors the caller should retry on the next cycle
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Store
    }
}

/// Milliseconds in `duration`, saturating at `u64::MAX`
pub(crate) fn saturating_millis(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
