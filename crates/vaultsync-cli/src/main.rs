//! vaultsync CLI - Command-line interface for backup metadata reconciliation
//!
//! Provides commands for:
//! - Running a reconciliation cycle or a single phase
//! - Inspecting records in conflict and their sync log
//! - Viewing reconciliation statistics
//! - Managing configuration

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod context;
mod output;

use commands::{
    audit::AuditCommand,
    completions::CompletionsCommand,
    config::ConfigCommand,
    conflicts::ConflictsCommand,
    stats::StatsCommand,
    sync::{CycleCommand, PullCommand, PushCommand, ResolveCommand},
};
use context::CliContext;
use output::OutputFormat;
use vaultsync_core::config::Config;

#[derive(Debug, Parser)]
#[command(
    name = "vaultsync",
    version,
    about = "Reconcile backup and restore metadata between the primary and local stores"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<String>,

    /// Minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run a full reconciliation cycle (pull, resolve, push)
    Cycle(CycleCommand),
    /// Merge primary-store rows into the local store
    Pull(PullCommand),
    /// Resolve records in conflict against the backup artifacts
    Resolve(ResolveCommand),
    /// Write local records back to the primary store
    Push(PushCommand),
    /// Show reconciliation statistics
    Stats(StatsCommand),
    /// Inspect records in conflict
    #[command(subcommand)]
    Conflicts(ConflictsCommand),
    /// View sync log entries
    Audit(AuditCommand),
    /// View and manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Generate shell completions
    Completions(CompletionsCommand),
}

/// Picks the log filter: flags beat the configured level, RUST_LOG beats both
fn log_filter(verbose: u8, quiet: bool, configured: &str) -> String {
    if quiet {
        return "error".to_string();
    }
    match verbose {
        0 => configured.to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

fn init_tracing(cli: &Cli, ctx: &CliContext) {
    // Never fail here: a broken config file is reported by the command itself
    let logging = Config::load_or_default(&ctx.config_path).logging;
    let filter = log_filter(cli.verbose, cli.quiet, &logging.level);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    let ctx = CliContext::new(format, cli.config.clone());
    init_tracing(&cli, &ctx);

    match &cli.command {
        Commands::Cycle(cmd) => cmd.execute(&ctx).await,
        Commands::Pull(cmd) => cmd.execute(&ctx).await,
        Commands::Resolve(cmd) => cmd.execute(&ctx).await,
        Commands::Push(cmd) => cmd.execute(&ctx).await,
        Commands::Stats(cmd) => cmd.execute(&ctx).await,
        Commands::Conflicts(cmd) => cmd.execute(&ctx).await,
        Commands::Audit(cmd) => cmd.execute(&ctx).await,
        Commands::Config(cmd) => cmd.execute(&ctx).await,
        Commands::Completions(cmd) => cmd.execute(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["vaultsync", "stats", "--json", "-vv"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Stats(_)));
    }

    #[test]
    fn test_conflicts_show_takes_id() {
        let cli = Cli::try_parse_from(["vaultsync", "conflicts", "show", "bk-7"]).unwrap();
        match cli.command {
            Commands::Conflicts(ConflictsCommand::Show { backup_id }) => {
                assert_eq!(backup_id, "bk-7")
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_log_filter_precedence() {
        assert_eq!(log_filter(0, false, "warn"), "warn");
        assert_eq!(log_filter(1, false, "warn"), "debug");
        assert_eq!(log_filter(3, false, "warn"), "trace");
        assert_eq!(log_filter(2, true, "warn"), "error");
    }
}
