//! vaultsync daemon - Background reconciliation service
//!
//! This binary runs as a systemd service and handles:
//! - Periodic reconciliation cycles between the primary and local stores
//! - An immediate cycle on SIGUSR1
//! - Graceful shutdown on SIGTERM/SIGINT
//!
//! # Architecture
//!
//! The daemon opens both stores, builds a `Reconciler` and hands it to a
//! `CycleScheduler`. The scheduler loop is controlled by a
//! `CancellationToken` that is triggered on receipt of SIGTERM or SIGINT;
//! the cycle in flight stops at the next record boundary.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use vaultsync_cache::{DatabasePool, SqliteLocalStore, SqlitePrimaryStore};
use vaultsync_core::config::{Config, LoggingConfig};
use vaultsync_sync::{CycleScheduler, FsFileVerifier, Reconciler};

#[derive(Debug, Parser)]
#[command(name = "vaultsyncd", version, about = "vaultsync reconciliation daemon")]
struct Args {
    /// Configuration file (defaults to the per-user location)
    #[arg(long)]
    config: Option<PathBuf>,
}

// ============================================================================
// DaemonService
// ============================================================================

/// Owns the open stores and the scheduler for the lifetime of the process
struct DaemonService {
    local_pool: DatabasePool,
    primary_pool: DatabasePool,
    scheduler: Arc<CycleScheduler>,
}

impl DaemonService {
    /// Opens both stores and wires the reconciler and scheduler
    async fn new(config: &Config, shutdown: CancellationToken) -> Result<Self> {
        let local_pool = DatabasePool::new(&config.database.local_path)
            .await
            .with_context(|| {
                format!(
                    "Failed to open local store at {}",
                    config.database.local_path.display()
                )
            })?;
        let primary_pool = DatabasePool::new_primary(&config.database.primary_path)
            .await
            .with_context(|| {
                format!(
                    "Failed to open primary store at {}",
                    config.database.primary_path.display()
                )
            })?;
        info!(
            local = %config.database.local_path.display(),
            primary = %config.database.primary_path.display(),
            "Stores opened"
        );

        let reconciler = Reconciler::new(
            Arc::new(SqliteLocalStore::new(local_pool.pool().clone())),
            Arc::new(SqlitePrimaryStore::new(primary_pool.pool().clone())),
            Arc::new(FsFileVerifier::from_config(&config.verifier)),
            config,
        )
        .with_cancellation(shutdown.child_token());

        let scheduler = Arc::new(CycleScheduler::from_config(
            Arc::new(reconciler),
            &config.reconcile,
            shutdown,
        ));

        Ok(Self {
            local_pool,
            primary_pool,
            scheduler,
        })
    }

    /// Runs the scheduler until shutdown, then closes the stores
    async fn run(&self) {
        self.scheduler.run().await;
        self.local_pool.close().await;
        self.primary_pool.close().await;
    }
}

// ============================================================================
// Signals
// ============================================================================

/// Waits for SIGTERM or SIGINT and triggers the cancellation token
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

/// Starts an immediate cycle on every SIGUSR1 until shutdown
#[cfg(unix)]
async fn wake_signal(scheduler: Arc<CycleScheduler>, token: CancellationToken) {
    let mut signal =
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::user_defined1()) {
            Ok(signal) => signal,
            Err(e) => {
                warn!(error = %e, "Failed to install SIGUSR1 handler; immediate cycles disabled");
                return;
            }
        };

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            received = signal.recv() => {
                if received.is_none() {
                    break;
                }
                info!("Received SIGUSR1");
                scheduler.request_now();
            }
        }
    }
}

// ============================================================================
// Logging
// ============================================================================

fn init_tracing(logging: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Loads the configuration; a missing file means defaults, a broken one is fatal
fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let config = Config::load(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    let errors = config.validate();
    if !errors.is_empty() {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        anyhow::bail!("Invalid configuration: {}", messages.join("; "));
    }
    Ok(config)
}

// ============================================================================
// Main entry point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config_path = args.config.unwrap_or_else(Config::default_path);
    let config = load_config(&config_path)?;

    init_tracing(&config.logging);
    info!(
        config_path = %config_path.display(),
        interval_secs = config.reconcile.interval_secs,
        detection = %config.reconcile.detection,
        "vaultsync daemon starting (vaultsyncd)"
    );

    let shutdown_token = CancellationToken::new();

    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    let service = match DaemonService::new(&config, shutdown_token.clone()).await {
        Ok(service) => service,
        Err(e) => {
            error!(error = %e, "vaultsync daemon failed to start");
            return Err(e);
        }
    };

    #[cfg(unix)]
    tokio::spawn(wake_signal(
        Arc::clone(&service.scheduler),
        shutdown_token.clone(),
    ));

    service.run().await;
    info!("vaultsync daemon shut down gracefully");
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.yaml")).unwrap();
        assert_eq!(config.reconcile.interval_secs, Config::default().reconcile.interval_secs);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let mut config = Config::default();
        config.reconcile.oracle_failure = "ignore".to_string();
        std::fs::write(&path, config.to_yaml().unwrap()).unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("reconcile.oracle_failure"));
    }

    #[test]
    fn test_unparsable_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "reconcile: [not, a, map]").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[tokio::test]
    async fn test_service_stops_when_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.database.local_path = dir.path().join("state").join("local.db");
        config.database.primary_path = dir.path().join("state").join("primary.db");
        config.verifier.backup_root = dir.path().join("backups");

        let token = CancellationToken::new();
        let service = DaemonService::new(&config, token.clone()).await.unwrap();
        token.cancel();

        tokio::time::timeout(std::time::Duration::from_secs(5), service.run())
            .await
            .expect("daemon did not stop");
        assert!(config.database.local_path.exists());
    }
}
