//! Read-only statistics over the local store
//!
//! Used purely for observability. Every count is present even when zero so
//! consumers never have to guess whether a missing key means "none".

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use vaultsync_core::{
    domain::{RecordStatus, SyncOperation, SyncStatus},
    ports::ILocalStore,
};

/// Length of the trailing window for log activity counts
pub const ACTIVITY_WINDOW_HOURS: i64 = 24;

/// Snapshot returned by `get_statistics`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncStatistics {
    /// Backup records per sync status (all four keys present)
    pub sync_status: BTreeMap<String, u64>,
    /// Log entries per operation inside the trailing window
    pub operations_24h: BTreeMap<String, u64>,
    pub total_records: u64,
    pub completed: u64,
    pub failed: u64,
    pub conflict_records: u64,
    pub restore_records: u64,
    /// `completed / total_records`, `0.0` on an empty store
    pub success_rate: f64,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub file_verified_count: u64,
    pub window_start: DateTime<Utc>,
}

/// Aggregates [`SyncStatistics`] from the local store
#[derive(Clone)]
pub struct StatisticsCollector {
    store: Arc<dyn ILocalStore>,
}

impl StatisticsCollector {
    pub fn new(store: Arc<dyn ILocalStore>) -> Self {
        Self { store }
    }

    /// Collects a snapshot as of `now`
    pub async fn collect(&self, now: DateTime<Utc>) -> anyhow::Result<SyncStatistics> {
        let window_start = now - Duration::hours(ACTIVITY_WINDOW_HOURS);

        let by_sync = self.store.count_backups_by_sync_status().await?;
        let by_status = self.store.count_backups_by_status().await?;
        let by_operation = self.store.count_log_by_operation_since(window_start).await?;

        let sync_status: BTreeMap<String, u64> = SyncStatus::all()
            .into_iter()
            .map(|s| (s.to_string(), by_sync.get(&s).copied().unwrap_or(0)))
            .collect();
        let operations_24h: BTreeMap<String, u64> = SyncOperation::all()
            .into_iter()
            .map(|op| (op.to_string(), by_operation.get(&op).copied().unwrap_or(0)))
            .collect();

        let total_records: u64 = by_status.values().sum();
        let completed = by_status.get(&RecordStatus::Completed).copied().unwrap_or(0);
        let failed = by_status.get(&RecordStatus::Failed).copied().unwrap_or(0);

        Ok(SyncStatistics {
            conflict_records: by_sync.get(&SyncStatus::Conflict).copied().unwrap_or(0),
            sync_status,
            operations_24h,
            total_records,
            completed,
            failed,
            restore_records: self.store.list_restores().await?.len() as u64,
            success_rate: success_rate(completed, total_records),
            last_sync_at: self.store.latest_sync_at().await?,
            file_verified_count: self.store.count_file_verified().await?,
            window_start,
        })
    }
}

fn success_rate(completed: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        completed as f64 / total as f64
    }
}
