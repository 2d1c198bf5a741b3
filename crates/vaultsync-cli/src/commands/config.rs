//! Config command - View and manage vaultsync configuration
//!
//! Provides the `vaultsync config` CLI command which:
//! 1. Shows the effective configuration (YAML or JSON)
//! 2. Writes a default configuration file
//! 3. Sets individual values via dot-notation keys
//! 4. Validates the configuration file and reports errors

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use tracing::info;

use vaultsync_core::config::Config;

use crate::context::CliContext;
use crate::output::OutputFormatter;

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Print the configuration file path
    Path,
    /// Write a configuration file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "reconcile.interval_secs")
        key: String,
        /// New value
        value: String,
    },
    /// Validate configuration file
    Validate,
}

impl ConfigCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        match self {
            ConfigCommand::Show => self.execute_show(ctx),
            ConfigCommand::Path => self.execute_path(ctx),
            ConfigCommand::Init { force } => self.execute_init(ctx, *force),
            ConfigCommand::Set { key, value } => self.execute_set(ctx, key, value),
            ConfigCommand::Validate => self.execute_validate(ctx),
        }
    }

    fn execute_show(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config = ctx.load_config()?;

        info!(config_path = %ctx.config_path.display(), "Showing configuration");

        if ctx.format.is_json() {
            let json = serde_json::to_value(&config)
                .context("Failed to serialize configuration to JSON")?;
            formatter.print_json(&json);
        } else {
            formatter.success(&format!("Configuration ({})", ctx.config_path.display()));
            formatter.info("");
            let yaml = config
                .to_yaml()
                .context("Failed to serialize configuration to YAML")?;
            for line in yaml.lines() {
                formatter.info(line);
            }
        }
        Ok(())
    }

    fn execute_path(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let exists = ctx.config_path.exists();
        if ctx.format.is_json() {
            formatter.print_json(&serde_json::json!({
                "config_path": ctx.config_path.display().to_string(),
                "exists": exists,
            }));
        } else {
            println!("{}", ctx.config_path.display());
            if !exists {
                formatter.warn("File does not exist yet; run 'vaultsync config init'");
            }
        }
        Ok(())
    }

    fn execute_init(&self, ctx: &CliContext, force: bool) -> Result<()> {
        let formatter = ctx.formatter();
        if ctx.config_path.exists() && !force {
            formatter.error(&format!(
                "{} already exists; use --force to overwrite",
                ctx.config_path.display()
            ));
            return Ok(());
        }

        write_config(&ctx.config_path, &Config::default())?;
        info!(config_path = %ctx.config_path.display(), "Wrote default configuration");

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "config_path": ctx.config_path.display().to_string(),
            }));
        } else {
            formatter.success(&format!(
                "Wrote default configuration to {}",
                ctx.config_path.display()
            ));
        }
        Ok(())
    }

    fn execute_set(&self, ctx: &CliContext, key: &str, value: &str) -> Result<()> {
        let formatter = ctx.formatter();
        let mut config = ctx.load_config()?;

        info!(key = %key, value = %value, "Setting configuration value");

        if let Err(e) = apply_config_value(&mut config, key, value) {
            if ctx.format.is_json() {
                formatter.print_json(&serde_json::json!({
                    "success": false,
                    "key": key,
                    "value": value,
                    "error": e.to_string(),
                }));
            } else {
                formatter.error(&format!("Failed to set '{}': {}", key, e));
                print_supported_keys(&*formatter);
            }
            return Ok(());
        }

        // Validate before saving so a typo never lands on disk
        let errors: Vec<String> = config.validate().iter().map(|e| e.to_string()).collect();
        if !errors.is_empty() {
            if ctx.format.is_json() {
                formatter.print_json(&serde_json::json!({
                    "success": false,
                    "key": key,
                    "value": value,
                    "errors": errors,
                }));
            } else {
                formatter.error(&format!(
                    "Invalid value for '{}': {}",
                    key,
                    errors.join("; ")
                ));
            }
            return Ok(());
        }

        write_config(&ctx.config_path, &config)?;

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "key": key,
                "value": value,
                "config_path": ctx.config_path.display().to_string(),
            }));
        } else {
            formatter.success(&format!("Set {} = {}", key, value));
            formatter.info(&format!("Saved to {}", ctx.config_path.display()));
        }
        Ok(())
    }

    fn execute_validate(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config_path = &ctx.config_path;

        // Load explicitly: a parse error must be reported, not defaulted
        let config = match Config::load(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                let message = if config_path.exists() {
                    format!("Failed to parse configuration: {}", e)
                } else {
                    "Configuration file not found. Using defaults.".to_string()
                };
                if ctx.format.is_json() {
                    formatter.print_json(&serde_json::json!({
                        "valid": false,
                        "config_path": config_path.display().to_string(),
                        "errors": [message],
                    }));
                } else if config_path.exists() {
                    formatter.error(&message);
                    formatter.info(&format!("File: {}", config_path.display()));
                } else {
                    formatter.info(&format!(
                        "Configuration file not found at {}",
                        config_path.display()
                    ));
                    formatter.info("Using default configuration. Run 'vaultsync config init' to create one.");
                }
                return Ok(());
            }
        };

        info!(config_path = %config_path.display(), "Validating configuration");
        let errors = config.validate();

        if ctx.format.is_json() {
            let error_strings: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            formatter.print_json(&serde_json::json!({
                "valid": errors.is_empty(),
                "config_path": config_path.display().to_string(),
                "errors": error_strings,
            }));
        } else if errors.is_empty() {
            formatter.success("Configuration is valid");
            formatter.info(&format!("File: {}", config_path.display()));
        } else {
            formatter.error(&format!(
                "Configuration has {} error{}:",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" }
            ));
            formatter.info(&format!("File: {}", config_path.display()));
            formatter.info("");
            for error in &errors {
                formatter.info(&format!("  {} - {}", error.field, error.message));
            }
        }
        Ok(())
    }
}

fn write_config(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create configuration directory")?;
    }
    let yaml = config.to_yaml().context("Failed to serialize configuration")?;
    std::fs::write(path, yaml).context("Failed to write configuration file")
}

fn print_supported_keys(formatter: &dyn OutputFormatter) {
    formatter.info("");
    formatter.info("Supported keys:");
    formatter.info("  database.local_path                  - Local store SQLite file");
    formatter.info("  database.primary_path                - Primary store SQLite file");
    formatter.info("  reconcile.interval_secs              - Seconds between daemon cycles");
    formatter.info("  reconcile.detection                  - strict|file_aware");
    formatter.info("  reconcile.field_precedence           - primary|local");
    formatter.info("  reconcile.oracle_failure             - fail_closed|defer");
    formatter.info("  reconcile.oracle_warn_threshold      - Failed file checks before warning");
    formatter.info("  reconcile.failure_backoff_secs       - Base retry delay after a failed cycle");
    formatter.info("  verifier.backup_root                 - Root for relative artifact paths");
    formatter.info("  verifier.search_dirs                 - Comma-separated fallback directories");
    formatter.info("  verifier.timeout_ms                  - Per-check timeout");
    formatter.info("  logging.level                        - trace|debug|info|warn|error");
    formatter.info("  logging.format                       - text|json");
}

/// Apply a dot-notation key/value pair to a Config struct
fn apply_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        // --- database ---
        "database.local_path" => config.database.local_path = PathBuf::from(value),
        "database.primary_path" => config.database.primary_path = PathBuf::from(value),

        // --- reconcile ---
        "reconcile.interval_secs" => {
            config.reconcile.interval_secs = value
                .parse::<u64>()
                .context("Expected a positive integer for reconcile.interval_secs")?;
        }
        "reconcile.detection" => config.reconcile.detection = value.to_string(),
        "reconcile.field_precedence" => config.reconcile.field_precedence = value.to_string(),
        "reconcile.oracle_failure" => config.reconcile.oracle_failure = value.to_string(),
        "reconcile.oracle_warn_threshold" => {
            config.reconcile.oracle_warn_threshold = value
                .parse::<u32>()
                .context("Expected a positive integer")?;
        }
        "reconcile.failure_backoff_secs" => {
            config.reconcile.failure_backoff_secs = value
                .parse::<u64>()
                .context("Expected a positive integer")?;
        }

        // --- verifier ---
        "verifier.backup_root" => config.verifier.backup_root = PathBuf::from(value),
        "verifier.search_dirs" => {
            config.verifier.search_dirs = value
                .split(',')
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string)
                .collect();
        }
        "verifier.timeout_ms" => {
            config.verifier.timeout_ms = value
                .parse::<u64>()
                .context("Expected a positive integer")?;
        }

        // --- logging ---
        "logging.level" => config.logging.level = value.to_string(),
        "logging.format" => config.logging.format = value.to_string(),

        _ => anyhow::bail!("Unknown configuration key: '{}'", key),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_database_paths() {
        let mut config = Config::default();
        apply_config_value(&mut config, "database.local_path", "/var/lib/vs/local.db").unwrap();
        apply_config_value(&mut config, "database.primary_path", "/var/lib/vs/primary.db").unwrap();
        assert_eq!(config.database.local_path, PathBuf::from("/var/lib/vs/local.db"));
        assert_eq!(config.database.primary_path, PathBuf::from("/var/lib/vs/primary.db"));
    }

    #[test]
    fn test_apply_reconcile_policy() {
        let mut config = Config::default();
        apply_config_value(&mut config, "reconcile.detection", "file_aware").unwrap();
        apply_config_value(&mut config, "reconcile.field_precedence", "local").unwrap();
        apply_config_value(&mut config, "reconcile.oracle_failure", "defer").unwrap();
        assert_eq!(config.reconcile.detection, "file_aware");
        assert_eq!(config.reconcile.field_precedence, "local");
        assert_eq!(config.reconcile.oracle_failure, "defer");
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_apply_reconcile_numbers() {
        let mut config = Config::default();
        apply_config_value(&mut config, "reconcile.interval_secs", "60").unwrap();
        apply_config_value(&mut config, "reconcile.oracle_warn_threshold", "3").unwrap();
        apply_config_value(&mut config, "reconcile.failure_backoff_secs", "10").unwrap();
        assert_eq!(config.reconcile.interval_secs, 60);
        assert_eq!(config.reconcile.oracle_warn_threshold, 3);
        assert_eq!(config.reconcile.failure_backoff_secs, 10);
    }

    #[test]
    fn test_apply_search_dirs_splits_on_commas() {
        let mut config = Config::default();
        apply_config_value(&mut config, "verifier.search_dirs", "physical, logical,,wal").unwrap();
        assert_eq!(config.verifier.search_dirs, vec!["physical", "logical", "wal"]);
    }

    #[test]
    fn test_apply_logging() {
        let mut config = Config::default();
        apply_config_value(&mut config, "logging.level", "debug").unwrap();
        apply_config_value(&mut config, "logging.format", "json").unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_invalid_policy_value_fails_validation() {
        let mut config = Config::default();
        apply_config_value(&mut config, "reconcile.detection", "lenient").unwrap();
        let errors = config.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "reconcile.detection");
    }

    #[test]
    fn test_apply_unknown_key_fails() {
        let mut config = Config::default();
        assert!(apply_config_value(&mut config, "unknown.key", "value").is_err());
    }

    #[test]
    fn test_apply_negative_number_fails() {
        let mut config = Config::default();
        assert!(apply_config_value(&mut config, "reconcile.interval_secs", "-5").is_err());
        assert!(apply_config_value(&mut config, "verifier.timeout_ms", "soon").is_err());
    }

    #[test]
    fn test_write_config_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let mut config = Config::default();
        config.reconcile.interval_secs = 42;

        write_config(&path, &config).unwrap();
        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.reconcile.interval_secs, 42);
    }
}
