//! Domain entities and business rules
//!
//! This module contains the record model shared by both stores:
//! - Backup and restore records with their local-only sync bookkeeping
//! - The primary-store row representation
//! - Sync-log entries forming the append-only audit trail
//! - The operation and sync status enums with the sync state machine
//! - Domain-specific error types

pub mod backup;
pub mod errors;
pub mod primary;
pub mod restore;
pub mod status;
pub mod sync_log;

// Re-export commonly used types
pub use backup::{BackupDetails, BackupRecord, DEFAULT_BACKUP_TYPE};
pub use errors::DomainError;
pub use primary::PrimaryRecord;
pub use restore::RestoreRecord;
pub use status::{RecordStatus, SyncStatus};
pub use sync_log::{RecordType, SyncDirection, SyncLogEntry, SyncOperation};
