//! Primary store port (driven/secondary port)
//!
//! The primary store is the relational database shared with the rest of the
//! application. It knows nothing about sync bookkeeping: adapters must never
//! persist `sync_status`, `conflict_reason` or `last_sync_at` there.
//!
//! Writes through this port are best-effort. The reconciler does not retry
//! them; a failure is surfaced to the caller, which retries on the next
//! scheduled cycle.

use crate::domain::{PrimaryRecord, RestoreRecord};

/// Read/write access to the primary store's backup and restore tables
#[async_trait::async_trait]
pub trait IPrimaryStore: Send + Sync {
    /// Reads every backup row
    async fn fetch_backups(&self) -> anyhow::Result<Vec<PrimaryRecord>>;

    /// Looks up one backup row by its join key
    async fn get_backup(&self, backup_id: &str) -> anyhow::Result<Option<PrimaryRecord>>;

    /// Inserts the row, or updates the row with the same `backup_id`
    async fn upsert_backup(&self, record: &PrimaryRecord) -> anyhow::Result<()>;

    /// Looks up one restore row by its join key
    ///
    /// Sync bookkeeping on the returned record is meaningless and left at
    /// its defaults.
    async fn get_restore(&self, restore_id: &str) -> anyhow::Result<Option<RestoreRecord>>;

    /// Inserts or updates the restore row, ignoring local-only fields
    async fn upsert_restore(&self, record: &RestoreRecord) -> anyhow::Result<()>;
}
