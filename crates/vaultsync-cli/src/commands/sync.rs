//! Reconciliation commands
//!
//! `vaultsync cycle` runs the full pull, resolve, push sequence once.
//! `pull`, `resolve` and `push` run a single phase, which is mostly useful
//! when investigating a divergence by hand.

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use vaultsync_sync::{PushSummary, ReconcileError, ResolveSummary, SyncSummary};

use crate::commands::stats::print_statistics;
use crate::context::CliContext;
use crate::output::{plural, OutputFormatter};

/// Run one full reconciliation cycle
#[derive(Debug, Args)]
pub struct CycleCommand {
    /// Skip the statistics section of the report
    #[arg(long)]
    pub no_stats: bool,
}

impl CycleCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config = ctx.load_config()?;
        let stores = ctx.open_stores(&config).await?;
        let reconciler = stores.reconciler(&config);

        info!("Running reconciliation cycle");
        let report = reconciler.run_cycle().await.map_err(phase_error)?;
        stores.close().await;

        if ctx.format.is_json() {
            let json = serde_json::to_value(&report).context("Failed to serialize cycle report")?;
            formatter.print_json(&json);
            return Ok(());
        }

        formatter.success(&format!(
            "Cycle {} finished in {} ms",
            report.cycle_id, report.duration_ms
        ));
        if report.cancelled() {
            formatter.warn("Cycle was cancelled before all records were processed");
        }
        formatter.info("");
        print_pull(&*formatter, &report.sync);
        print_resolve(&*formatter, &report.resolve);
        print_push(&*formatter, &report.push);
        if !self.no_stats {
            formatter.info("");
            print_statistics(&*formatter, &report.statistics);
        }
        Ok(())
    }
}

/// Merge primary-store rows into the local store
#[derive(Debug, Args)]
pub struct PullCommand {}

impl PullCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config = ctx.load_config()?;
        let stores = ctx.open_stores(&config).await?;
        let reconciler = stores.reconciler(&config);

        let rows = stores
            .primary
            .fetch_backups()
            .await
            .context("Failed to read primary backup rows")?;
        info!(rows = rows.len(), "Pulling from primary store");

        let summary = reconciler
            .sync_from_primary(&rows)
            .await
            .map_err(phase_error)?;
        stores.close().await;

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::to_value(&summary)?);
        } else {
            formatter.success("Pull complete");
            print_pull(&*formatter, &summary);
        }
        Ok(())
    }
}

/// Resolve every record currently in conflict
#[derive(Debug, Args)]
pub struct ResolveCommand {}

impl ResolveCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config = ctx.load_config()?;
        let stores = ctx.open_stores(&config).await?;
        let reconciler = stores.reconciler(&config);

        let summary = reconciler
            .resolve_all_conflicts()
            .await
            .map_err(phase_error)?;
        stores.close().await;

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::to_value(&summary)?);
        } else {
            formatter.success("Resolution complete");
            print_resolve(&*formatter, &summary);
        }
        Ok(())
    }
}

/// Write the local view back to the primary store
#[derive(Debug, Args)]
pub struct PushCommand {}

impl PushCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config = ctx.load_config()?;
        let stores = ctx.open_stores(&config).await?;
        let reconciler = stores.reconciler(&config);

        let summary = reconciler.sync_to_primary().await.map_err(phase_error)?;
        stores.close().await;

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::to_value(&summary)?);
        } else {
            formatter.success("Push complete");
            print_push(&*formatter, &summary);
        }
        Ok(())
    }
}

/// Adds a hint for errors a later run may clear
fn phase_error(err: ReconcileError) -> anyhow::Error {
    let retry = err.is_retryable();
    let err = anyhow::Error::new(err);
    if retry {
        err.context("Reconciliation failed; the next run will retry")
    } else {
        err.context("Reconciliation failed")
    }
}

fn print_pull(formatter: &dyn OutputFormatter, summary: &SyncSummary) {
    formatter.info(&format!(
        "Pull:    {} processed, {} created, {} updated, {}",
        summary.total_processed,
        summary.created,
        summary.updated,
        plural(summary.conflicts as usize, "conflict")
    ));
    for error in &summary.errors {
        formatter.warn(&format!("Skipped row: {}", error));
    }
    if summary.oracle_failures > 0 {
        formatter.warn(&format!(
            "{} during pull",
            plural(summary.oracle_failures as usize, "failed file check")
        ));
    }
}

fn print_resolve(formatter: &dyn OutputFormatter, summary: &ResolveSummary) {
    formatter.info(&format!(
        "Resolve: {} of {} resolved ({} to completed, {} to failed, {} consistent)",
        summary.resolved,
        summary.total_conflicts,
        summary.fixed_to_completed,
        summary.fixed_to_failed,
        summary.verified_consistent
    ));
    if summary.still_conflicted > 0 {
        formatter.warn(&format!(
            "{} still in conflict because file checks failed",
            plural(summary.still_conflicted as usize, "record")
        ));
    }
}

fn print_push(formatter: &dyn OutputFormatter, summary: &PushSummary) {
    formatter.info(&format!(
        "Push:    {} backups, {} restores written, {} skipped",
        summary.backups_pushed,
        summary.restores_pushed,
        plural(summary.skipped_conflicts as usize, "conflict")
    ));
}
