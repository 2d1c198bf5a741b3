//! Shared command context: configuration and store wiring

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use vaultsync_cache::{DatabasePool, SqliteLocalStore, SqlitePrimaryStore};
use vaultsync_core::config::Config;
use vaultsync_core::ports::{ILocalStore, IPrimaryStore};
use vaultsync_sync::{FsFileVerifier, Reconciler};

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

/// Global flags every command needs
#[derive(Debug, Clone)]
pub struct CliContext {
    pub format: OutputFormat,
    pub config_path: PathBuf,
}

impl CliContext {
    pub fn new(format: OutputFormat, config: Option<String>) -> Self {
        Self {
            format,
            config_path: config.map(PathBuf::from).unwrap_or_else(Config::default_path),
        }
    }

    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        get_formatter(self.format.is_json())
    }

    /// Loads the configuration file, falling back to defaults when absent
    ///
    /// A file that exists but does not parse is an error; running against
    /// defaults in that case would point at the wrong databases.
    pub fn load_config(&self) -> Result<Config> {
        if !self.config_path.exists() {
            debug!(config_path = %self.config_path.display(), "No configuration file, using defaults");
            return Ok(Config::default());
        }
        let config = Config::load(&self.config_path).with_context(|| {
            format!("Failed to load configuration from {}", self.config_path.display())
        })?;
        for error in config.validate() {
            warn!(field = %error.field, message = %error.message, "Configuration problem");
        }
        Ok(config)
    }

    /// Opens both stores named by the configuration
    pub async fn open_stores(&self, config: &Config) -> Result<Stores> {
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

        Ok(Stores {
            local: Arc::new(SqliteLocalStore::new(local_pool.pool().clone())),
            primary: Arc::new(SqlitePrimaryStore::new(primary_pool.pool().clone())),
            local_pool,
            primary_pool,
        })
    }
}

/// Open store handles; keep alive for the duration of a command
pub struct Stores {
    pub local: Arc<dyn ILocalStore>,
    pub primary: Arc<dyn IPrimaryStore>,
    local_pool: DatabasePool,
    primary_pool: DatabasePool,
}

impl Stores {
    pub fn reconciler(&self, config: &Config) -> Reconciler {
        Reconciler::new(
            Arc::clone(&self.local),
            Arc::clone(&self.primary),
            Arc::new(FsFileVerifier::from_config(&config.verifier)),
            config,
        )
    }

    pub async fn close(&self) {
        self.local_pool.close().await;
        self.primary_pool.close().await;
    }
}
