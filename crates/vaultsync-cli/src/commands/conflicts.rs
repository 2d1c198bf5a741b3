//! Conflicts command - Inspect records awaiting resolution
//!
//! Provides the `vaultsync conflicts` CLI command which:
//! 1. Lists records currently in `conflict` sync status
//! 2. Shows one record with its primary-store counterpart and log trail
//!
//! Resolution itself is automatic (`vaultsync resolve`); there is no manual
//! override.

use anyhow::{Context, Result};
use clap::Subcommand;
use tracing::info;

use vaultsync_core::domain::BackupRecord;
use vaultsync_sync::BackupRegistry;

use crate::commands::audit::{entry_json, entry_line};
use crate::context::CliContext;
use crate::output::plural;

#[derive(Debug, Subcommand)]
pub enum ConflictsCommand {
    /// List records in conflict
    List {
        /// Maximum number of records to show
        #[arg(long)]
        limit: Option<u32>,
    },
    /// Show one record, its primary row and its sync log
    Show {
        /// Backup id
        backup_id: String,
    },
}

impl ConflictsCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        match self {
            ConflictsCommand::List { limit } => self.execute_list(ctx, *limit).await,
            ConflictsCommand::Show { backup_id } => self.execute_show(ctx, backup_id).await,
        }
    }

    async fn execute_list(&self, ctx: &CliContext, limit: Option<u32>) -> Result<()> {
        let formatter = ctx.formatter();
        let config = ctx.load_config()?;
        let stores = ctx.open_stores(&config).await?;
        let registry = BackupRegistry::new(stores.local.clone());

        let conflicts = registry
            .find_conflicts(limit)
            .await
            .context("Failed to query conflicts")?;
        stores.close().await;

        info!(count = conflicts.len(), "Retrieved conflicts");

        if ctx.format.is_json() {
            let json = serde_json::json!({
                "count": conflicts.len(),
                "conflicts": conflicts.iter().map(record_json).collect::<Vec<_>>(),
            });
            formatter.print_json(&json);
            return Ok(());
        }

        if conflicts.is_empty() {
            formatter.success("No records in conflict");
            return Ok(());
        }

        formatter.success(&format!("{} in conflict", plural(conflicts.len(), "record")));
        formatter.info("");
        formatter.info("  Backup ID            Status     Since                Reason");
        formatter.info("  -------------------- ---------- -------------------- ------------------");
        for record in &conflicts {
            formatter.info(&format!(
                "  {:<20} {:<10} {} {}",
                record.backup_id(),
                record.status(),
                record.updated_at().format("%Y-%m-%d %H:%M:%S"),
                record.conflict_reason().unwrap_or("-")
            ));
        }
        formatter.info("");
        formatter.info("Use 'vaultsync conflicts show <backup_id>' for details.");
        formatter.info("Use 'vaultsync resolve' to resolve them against the backup artifacts.");
        Ok(())
    }

    async fn execute_show(&self, ctx: &CliContext, backup_id: &str) -> Result<()> {
        let formatter = ctx.formatter();
        let config = ctx.load_config()?;
        let stores = ctx.open_stores(&config).await?;

        let record = stores
            .local
            .get_backup(backup_id)
            .await
            .context("Failed to query local store")?;
        let Some(record) = record else {
            stores.close().await;
            formatter.error(&format!("No local record with id '{}'", backup_id));
            return Ok(());
        };
        let primary = stores
            .primary
            .get_backup(backup_id)
            .await
            .context("Failed to query primary store")?;
        let trail = stores
            .local
            .get_log_for_record(backup_id)
            .await
            .context("Failed to query sync log")?;
        stores.close().await;

        if ctx.format.is_json() {
            let json = serde_json::json!({
                "record": record_json(&record),
                "primary": primary.as_ref().map(|row| serde_json::json!({
                    "row_id": row.row_id,
                    "status": row.status,
                    "file_path": row.details.file_path,
                    "completed_at": row.completed_at.map(|t| t.to_rfc3339()),
                })),
                "log": trail.iter().map(entry_json).collect::<Vec<_>>(),
            });
            formatter.print_json(&json);
            return Ok(());
        }

        formatter.success(&format!("Backup {}", record.backup_id()));
        formatter.info(&format!("Local status:   {}", record.status()));
        formatter.info(&format!(
            "Primary status: {}",
            primary
                .as_ref()
                .and_then(|row| row.status.as_deref())
                .unwrap_or("<no row>")
        ));
        formatter.info(&format!("Sync status:    {}", record.sync_status()));
        if let Some(reason) = record.conflict_reason() {
            formatter.info(&format!("Reason:         {}", reason));
        }
        formatter.info(&format!(
            "Artifact:       {}",
            record.file_path().unwrap_or("<none recorded>")
        ));
        if let Some(at) = record.file_verified_at() {
            formatter.info(&format!("Verified at:    {}", at.to_rfc3339()));
        }

        formatter.info("");
        formatter.info(&format!("Sync log ({} entries):", trail.len()));
        for entry in &trail {
            formatter.info(&entry_line(entry));
        }
        Ok(())
    }
}

fn record_json(record: &BackupRecord) -> serde_json::Value {
    serde_json::json!({
        "backup_id": record.backup_id(),
        "status": record.status().as_str(),
        "sync_status": record.sync_status().as_str(),
        "conflict_reason": record.conflict_reason(),
        "file_path": record.file_path(),
        "primary_row_id": record.primary_row_id(),
        "last_sync_at": record.last_sync_at().map(|t| t.to_rfc3339()),
        "file_verified_at": record.file_verified_at().map(|t| t.to_rfc3339()),
        "updated_at": record.updated_at().to_rfc3339(),
    })
}
