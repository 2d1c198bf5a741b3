//! Audit command - View sync-log entries
//!
//! Provides the `vaultsync audit` CLI command which:
//! 1. Shows the full trail of one record (`--record`), oldest first
//! 2. Otherwise lists recent entries, newest first, with time and operation filters
//! 3. Supports relative and absolute time parsing for the --since flag

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use clap::Args;
use tracing::info;

use vaultsync_core::domain::{SyncLogEntry, SyncOperation};

use crate::context::CliContext;

/// Audit command with filter arguments
#[derive(Debug, Args)]
pub struct AuditCommand {
    /// Show the complete trail of one backup or restore id
    #[arg(long)]
    pub record: Option<String>,

    /// Show entries since this time (e.g., "1h", "2d", "2024-01-01")
    #[arg(long)]
    pub since: Option<String>,

    /// Filter by operation (e.g., "detect_conflict", "resolve_conflict")
    #[arg(long)]
    pub operation: Option<String>,

    /// Maximum number of entries to show
    #[arg(long, default_value = "50")]
    pub limit: u32,
}

impl AuditCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config = ctx.load_config()?;
        let stores = ctx.open_stores(&config).await?;

        let operation = match &self.operation {
            Some(raw) => Some(
                raw.parse::<SyncOperation>()
                    .with_context(|| format!("Unknown operation: '{}'", raw))?,
            ),
            None => None,
        };

        let entries = match &self.record {
            Some(record_id) => stores
                .local
                .get_log_for_record(record_id)
                .await
                .context("Failed to query sync log")?,
            None => {
                let since = match &self.since {
                    Some(since_str) => {
                        let parsed = parse_since(since_str).with_context(|| {
                            format!(
                                "Invalid --since value: '{}'. Expected formats: '1h', '30m', '2d', '1w', '2024-01-01', '2024-01-01T12:00:00'",
                                since_str
                            )
                        })?;
                        info!(since = %parsed, "Filtering sync log since");
                        parsed
                    }
                    // Default: last 7 days
                    None => Utc::now() - chrono::Duration::days(7),
                };
                stores
                    .local
                    .get_log_since(since, self.limit)
                    .await
                    .context("Failed to query sync log")?
            }
        };
        stores.close().await;

        let filtered: Vec<&SyncLogEntry> = entries
            .iter()
            .filter(|entry| operation.map_or(true, |op| entry.operation() == op))
            .take(self.limit as usize)
            .collect();

        info!(count = filtered.len(), "Retrieved sync log entries");

        if ctx.format.is_json() {
            let json = serde_json::json!({
                "count": filtered.len(),
                "entries": filtered.iter().map(|e| entry_json(e)).collect::<Vec<_>>(),
            });
            formatter.print_json(&json);
            return Ok(());
        }

        if filtered.is_empty() {
            formatter.success("No sync log entries found");
            return Ok(());
        }

        formatter.success(&format!(
            "{} sync log {}",
            filtered.len(),
            if filtered.len() == 1 { "entry" } else { "entries" }
        ));
        formatter.info("");
        formatter.info("  Time                 Operation          Record           Change");
        formatter.info("  -------------------- ------------------ ---------------- ------------------");
        for entry in &filtered {
            formatter.info(&entry_line(entry));
        }
        Ok(())
    }
}

/// JSON shape of one log entry, shared with `conflicts show`
pub fn entry_json(entry: &SyncLogEntry) -> serde_json::Value {
    serde_json::json!({
        "id": entry.id(),
        "created_at": entry.created_at().to_rfc3339(),
        "operation": entry.operation().as_str(),
        "record_type": entry.record_type().as_str(),
        "record_id": entry.record_id(),
        "old_status": entry.old_status().map(|s| s.as_str()),
        "new_status": entry.new_status().map(|s| s.as_str()),
        "direction": entry.sync_direction().as_str(),
        "conflict_resolved": entry.conflict_resolved(),
        "file_exists": entry.file_exists(),
        "cycle_id": entry.cycle_id().map(|id| id.to_string()),
        "details": entry.details(),
    })
}

/// One table row for a log entry
pub fn entry_line(entry: &SyncLogEntry) -> String {
    let change = match (entry.old_status(), entry.new_status()) {
        (Some(old), Some(new)) if old != new => format!("{} -> {}", old, new),
        (_, Some(new)) => new.to_string(),
        _ => String::new(),
    };
    let mut line = format!(
        "  {} {:<18} {:<16} {}",
        entry.created_at().format("%Y-%m-%d %H:%M:%S"),
        entry.operation(),
        truncate(entry.record_id(), 16),
        change
    );
    if let Some(code) = entry.details().get("reason_code").and_then(|v| v.as_str()) {
        line.push_str(&format!(" [{}]", code));
    }
    line
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{}\u{2026}", head)
    }
}

/// Parse a --since value into a UTC timestamp
///
/// Supports relative durations (1h, 30m, 2d, 1w) and absolute dates
/// (2024-01-01, 2024-01-01T12:00:00).
fn parse_since(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();

    if let Some(duration) = parse_relative_duration(input) {
        return Ok(Utc::now() - duration);
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        let datetime = date
            .and_hms_opt(0, 0, 0)
            .context("Failed to create datetime from date")?;
        return Ok(DateTime::<Utc>::from_naive_utc_and_offset(datetime, Utc));
    }

    if let Ok(datetime) = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S") {
        return Ok(DateTime::<Utc>::from_naive_utc_and_offset(datetime, Utc));
    }

    anyhow::bail!(
        "Could not parse '{}' as a time. Use relative (1h, 30m, 2d, 1w) or absolute (2024-01-01) format.",
        input
    )
}

/// Parse relative duration strings like "1h", "30m", "2d", "1w"
fn parse_relative_duration(input: &str) -> Option<chrono::Duration> {
    if input.len() < 2 {
        return None;
    }

    let (num_str, unit) = input.split_at(input.len() - 1);
    let num: i64 = num_str.parse().ok()?;
    if num < 0 {
        return None;
    }

    match unit {
        "m" => Some(chrono::Duration::minutes(num)),
        "h" => Some(chrono::Duration::hours(num)),
        "d" => Some(chrono::Duration::days(num)),
        "w" => Some(chrono::Duration::weeks(num)),
        _ => None,
    }
}
