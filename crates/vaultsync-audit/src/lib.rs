//! vaultsync Audit - Sync log and statistics
//!
//! Provides:
//! - `SyncLogger`: High-level service for writing sync-log entries
//! - `ReasonCode`: Structured reason codes stored in entry details
//! - `StatisticsCollector`: Read-only aggregation over the local store

pub mod logger;
pub mod reason;
pub mod stats;

pub use logger::SyncLogger;
pub use reason::ReasonCode;
pub use stats::{StatisticsCollector, SyncStatistics, ACTIVITY_WINDOW_HOURS};
