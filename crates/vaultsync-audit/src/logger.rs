//! SyncLogger - high-level sync-log service
//!
//! Two kinds of helpers live here:
//! - `*_entry` builders return a [`SyncLogEntry`] for callers that must
//!   commit it together with a record change (`ILocalStore::save_backup_with_log`).
//! - `log_*` methods append a standalone entry. These are non-fatal: errors
//!   in log persistence are logged via `tracing::warn!` but never propagated.
//!
//! Every entry is stamped with the logger's cycle id, if any.

use std::sync::Arc;

use serde_json::{json, Value};
use uuid::Uuid;

use vaultsync_core::{
    domain::{RecordStatus, RecordType, SyncDirection, SyncLogEntry, SyncOperation},
    ports::{FileCheck, ILocalStore},
};

use crate::reason::ReasonCode;

/// High-level sync-log writer backed by the local store.
#[derive(Clone)]
pub struct SyncLogger {
    store: Arc<dyn ILocalStore>,
    cycle_id: Option<Uuid>,
}

impl SyncLogger {
    /// Creates a logger whose entries carry no cycle id (executor writes).
    pub fn new(store: Arc<dyn ILocalStore>) -> Self {
        Self {
            store,
            cycle_id: None,
        }
    }

    /// Returns a logger sharing the same store, stamping `cycle_id`.
    pub fn for_cycle(&self, cycle_id: Uuid) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cycle_id: Some(cycle_id),
        }
    }

    pub fn cycle_id(&self) -> Option<Uuid> {
        self.cycle_id
    }

    fn entry(&self, operation: SyncOperation, record_type: RecordType, id: &str) -> SyncLogEntry {
        SyncLogEntry::new(operation, record_type, id).with_cycle_id(self.cycle_id)
    }

    /// Persist an entry, swallowing errors with a tracing warning.
    async fn save(&self, entry: &SyncLogEntry) {
        if let Err(e) = self.store.append_log(entry).await {
            tracing::warn!(
                error = %e,
                operation = %entry.operation(),
                record_id = %entry.record_id(),
                "Failed to save sync log entry"
            );
        }
    }

    // ========================================================================
    // Pull (primary -> local)
    // ========================================================================

    /// Entry for a record seen for the first time.
    pub fn created_entry(&self, backup_id: &str, status: RecordStatus) -> SyncLogEntry {
        self.entry(SyncOperation::SyncBackup, RecordType::Backup, backup_id)
            .with_statuses(None, Some(status))
            .with_details(json!({ "action": "created" }))
    }

    /// Entry for a clean update that changed at least one field.
    pub fn updated_entry(
        &self,
        backup_id: &str,
        old_status: RecordStatus,
        new_status: RecordStatus,
        changed_fields: &[&str],
    ) -> SyncLogEntry {
        self.entry(SyncOperation::SyncBackup, RecordType::Backup, backup_id)
            .with_statuses(Some(old_status), Some(new_status))
            .with_details(json!({
                "action": "updated",
                "changed_fields": changed_fields,
            }))
    }

    /// Entry explaining why a record was flagged as conflicting.
    pub fn detect_conflict_entry(
        &self,
        backup_id: &str,
        local_status: RecordStatus,
        primary_status: RecordStatus,
        check: &FileCheck,
        reason: &str,
    ) -> SyncLogEntry {
        self.entry(SyncOperation::DetectConflict, RecordType::Backup, backup_id)
            .with_statuses(Some(local_status), Some(primary_status))
            .with_file_exists(Some(check.is_present()))
            .with_details(json!({
                "reason_code": ReasonCode::StatusMismatch,
                "reason": reason,
                "local_status": local_status,
                "primary_status": primary_status,
                "file_check": check.name(),
            }))
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Entry for a completed resolution.
    ///
    /// `reason_code` overrides the code derived from `check`, e.g. when the
    /// record had no artifact path at all.
    pub fn resolve_conflict_entry(
        &self,
        backup_id: &str,
        old_status: RecordStatus,
        new_status: RecordStatus,
        outcome: &str,
        check: &FileCheck,
        reason_code: Option<ReasonCode>,
    ) -> SyncLogEntry {
        let code = reason_code.unwrap_or_else(|| ReasonCode::from_file_check(check));
        self.entry(SyncOperation::ResolveConflict, RecordType::Backup, backup_id)
            .with_statuses(Some(old_status), Some(new_status))
            .with_conflict_resolved(true)
            .with_file_exists(Some(check.is_present()))
            .with_details(json!({
                "outcome": outcome,
                "reason_code": code,
                "file_check": check.to_string(),
            }))
    }

    /// Log that a conflict was left unresolved because the oracle failed.
    pub async fn log_resolution_deferred(
        &self,
        backup_id: &str,
        status: RecordStatus,
        check: &FileCheck,
        reason: &str,
    ) {
        let entry = self
            .entry(SyncOperation::ResolveConflict, RecordType::Backup, backup_id)
            .with_statuses(Some(status), Some(status))
            .with_conflict_resolved(false)
            .with_file_exists(None)
            .with_details(json!({
                "outcome": "deferred",
                "reason_code": ReasonCode::from_file_check(check),
                "reason": reason,
            }));
        self.save(&entry).await;
    }

    // ========================================================================
    // Push (local -> primary)
    // ========================================================================

    /// Log a record written to the primary store.
    pub async fn log_sync_to_primary(
        &self,
        record_type: RecordType,
        record_id: &str,
        status: RecordStatus,
        reason: ReasonCode,
    ) {
        let entry = self
            .entry(SyncOperation::SyncToPrimary, record_type, record_id)
            .with_statuses(None, Some(status))
            .with_direction(SyncDirection::LocalToPrimary)
            .with_details(json!({ "reason_code": reason }));
        self.save(&entry).await;
    }

    // ========================================================================
    // Executor writes
    // ========================================================================

    /// Log a record created or updated directly by the backup/restore executor.
    pub async fn log_executor_write(
        &self,
        operation: SyncOperation,
        record_type: RecordType,
        record_id: &str,
        old_status: Option<RecordStatus>,
        new_status: RecordStatus,
        details: Value,
    ) {
        let entry = self
            .entry(operation, record_type, record_id)
            .with_statuses(old_status, Some(new_status))
            .with_direction(SyncDirection::Manual)
            .with_details(details);
        self.save(&entry).await;
    }
}

// ============================================================================
// Unit tests
// ============================================================================
