//! Stats command - reconciliation health at a glance
//!
//! Reads the local store only; nothing is written and the primary store is
//! not contacted.

use anyhow::{Context, Result};
use clap::Args;

use vaultsync_audit::{SyncStatistics, ACTIVITY_WINDOW_HOURS};

use crate::context::CliContext;
use crate::output::OutputFormatter;

/// Show record counts, success rate and recent sync activity
#[derive(Debug, Args)]
pub struct StatsCommand {}

impl StatsCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config = ctx.load_config()?;
        let stores = ctx.open_stores(&config).await?;

        let stats = stores
            .reconciler(&config)
            .get_statistics()
            .await
            .context("Failed to collect statistics")?;
        stores.close().await;

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::to_value(&stats)?);
        } else {
            print_statistics(&*formatter, &stats);
        }
        Ok(())
    }
}

pub fn print_statistics(formatter: &dyn OutputFormatter, stats: &SyncStatistics) {
    formatter.success(&format!(
        "{} backups, {} restores",
        stats.total_records, stats.restore_records
    ));
    formatter.info(&format!(
        "Success rate: {:.1}% ({} completed, {} failed)",
        stats.success_rate * 100.0,
        stats.completed,
        stats.failed
    ));
    formatter.info(&format!(
        "Artifacts verified: {}",
        stats.file_verified_count
    ));
    formatter.info(&format!(
        "Last sync: {}",
        stats
            .last_sync_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "never".to_string())
    ));

    formatter.info("");
    formatter.info("Sync status:");
    for (status, count) in &stats.sync_status {
        formatter.info(&format!("  {:<10} {}", status, count));
    }
    if stats.conflict_records > 0 {
        formatter.warn(&format!(
            "{} records await resolution; run 'vaultsync resolve'",
            stats.conflict_records
        ));
    }

    formatter.info("");
    formatter.info(&format!("Activity (last {}h):", ACTIVITY_WINDOW_HOURS));
    for (operation, count) in &stats.operations_24h {
        formatter.info(&format!("  {:<18} {}", operation, count));
    }
}
