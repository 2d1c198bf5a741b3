//! Configuration module for vaultsync.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for vaultsync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub reconcile: ReconcileConfig,
    pub verifier: VerifierConfig,
    pub logging: LoggingConfig,
}

/// Locations of the two stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file holding the local store.
    pub local_path: PathBuf,
    /// SQLite file holding the primary store tables.
    pub primary_path: PathBuf,
}

/// Reconciliation cycle and policy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Seconds between scheduled cycles.
    pub interval_secs: u64,
    /// Conflict detection rule: `strict` or `file_aware`.
    pub detection: String,
    /// Which store wins for descriptive fields when both hold a value: `primary` or `local`.
    pub field_precedence: String,
    /// What to do when the file check itself fails: `fail_closed` or `defer`.
    pub oracle_failure: String,
    /// Oracle failures per phase at which a warning is emitted.
    pub oracle_warn_threshold: u32,
    /// Base delay (seconds) before retrying after a failed cycle.
    pub failure_backoff_secs: u64,
}

/// File verifier settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Directory relative artifact paths are resolved against.
    pub backup_root: PathBuf,
    /// Sub-directories of `backup_root` searched for records without a path.
    pub search_dirs: Vec<String>,
    /// Per-check timeout in milliseconds.
    pub timeout_ms: u64,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Output format: `text` or `json`.
    pub format: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/vaultsync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("vaultsync")
            .join("config.yaml")
    }

    /// Serialize to YAML, e.g. for `vaultsync config init`.
    pub fn to_yaml(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join("vaultsync")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let dir = data_dir();
        Self {
            local_path: dir.join("local.db"),
            primary_path: dir.join("primary.db"),
        }
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            detection: "strict".to_string(),
            field_precedence: "primary".to_string(),
            oracle_failure: "fail_closed".to_string(),
            oracle_warn_threshold: 5,
            failure_backoff_secs: 30,
        }
    }
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            backup_root: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("~"))
                .join("backups"),
            search_dirs: vec!["physical".to_string(), "snapshots".to_string()],
            timeout_ms: 5000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"reconcile.interval_secs"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid values for `logging.format`.
const VALID_LOG_FORMATS: &[&str] = &["text", "json"];

/// Valid values for `reconcile.detection`.
pub const VALID_DETECTION_MODES: &[&str] = &["strict", "file_aware"];

/// Valid values for `reconcile.field_precedence`.
pub const VALID_FIELD_PRECEDENCE: &[&str] = &["primary", "local"];

/// Valid values for `reconcile.oracle_failure`.
pub const VALID_ORACLE_FAILURE_MODES: &[&str] = &["fail_closed", "defer"];

fn check_one_of(
    errors: &mut Vec<ValidationError>,
    field: &str,
    value: &str,
    allowed: &[&str],
) {
    if !allowed.contains(&value) {
        errors.push(ValidationError {
            field: field.into(),
            message: format!("must be one of {}, got '{}'", allowed.join(", "), value),
        });
    }
}

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- database ---
        if self.database.local_path.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "database.local_path".into(),
                message: "must not be empty".into(),
            });
        }
        if self.database.primary_path.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "database.primary_path".into(),
                message: "must not be empty".into(),
            });
        }
        if !self.database.local_path.as_os_str().is_empty()
            && self.database.local_path == self.database.primary_path
        {
            errors.push(ValidationError {
                field: "database.local_path".into(),
                message: "must differ from database.primary_path".into(),
            });
        }

        // --- reconcile ---
        if self.reconcile.interval_secs == 0 {
            errors.push(ValidationError {
                field: "reconcile.interval_secs".into(),
                message: "must be greater than 0".into(),
            });
        }
        check_one_of(
            &mut errors,
            "reconcile.detection",
            &self.reconcile.detection,
            VALID_DETECTION_MODES,
        );
        check_one_of(
            &mut errors,
            "reconcile.field_precedence",
            &self.reconcile.field_precedence,
            VALID_FIELD_PRECEDENCE,
        );
        check_one_of(
            &mut errors,
            "reconcile.oracle_failure",
            &self.reconcile.oracle_failure,
            VALID_ORACLE_FAILURE_MODES,
        );
        if self.reconcile.oracle_warn_threshold == 0 {
            errors.push(ValidationError {
                field: "reconcile.oracle_warn_threshold".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.reconcile.failure_backoff_secs == 0 {
            errors.push(ValidationError {
                field: "reconcile.failure_backoff_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- verifier ---
        if self.verifier.timeout_ms == 0 {
            errors.push(ValidationError {
                field: "verifier.timeout_ms".into(),
                message: "must be greater than 0".into(),
            });
        }
        for (i, dir) in self.verifier.search_dirs.iter().enumerate() {
            let p = Path::new(dir);
            if dir.is_empty()
                || p.is_absolute()
                || p.components()
                    .any(|c| matches!(c, std::path::Component::ParentDir))
            {
                errors.push(ValidationError {
                    field: format!("verifier.search_dirs[{i}]"),
                    message: format!("must be a plain relative directory, got '{dir}'"),
                });
            }
        }

        // --- logging ---
        check_one_of(
            &mut errors,
            "logging.level",
            &self.logging.level,
            VALID_LOG_LEVELS,
        );
        check_one_of(
            &mut errors,
            "logging.format",
            &self.logging.format,
            VALID_LOG_FORMATS,
        );

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for [`Config`].
///
/// ```
/// use vaultsync_core::config::ConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .local_path(PathBuf::from("/var/lib/vaultsync/local.db"))
///     .interval_secs(60)
///     .logging_level("debug")
///     .build();
/// assert_eq!(config.reconcile.interval_secs, 60);
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    // --- database ---

    pub fn local_path(mut self, path: PathBuf) -> Self {
        self.config.database.local_path = path;
        self
    }

    pub fn primary_path(mut self, path: PathBuf) -> Self {
        self.config.database.primary_path = path;
        self
    }

    // --- reconcile ---

    pub fn interval_secs(mut self, seconds: u64) -> Self {
        self.config.reconcile.interval_secs = seconds;
        self
    }

    pub fn detection(mut self, mode: impl Into<String>) -> Self {
        self.config.reconcile.detection = mode.into();
        self
    }

    pub fn field_precedence(mut self, side: impl Into<String>) -> Self {
        self.config.reconcile.field_precedence = side.into();
        self
    }

    pub fn oracle_failure(mut self, mode: impl Into<String>) -> Self {
        self.config.reconcile.oracle_failure = mode.into();
        self
    }

    pub fn oracle_warn_threshold(mut self, n: u32) -> Self {
        self.config.reconcile.oracle_warn_threshold = n;
        self
    }

    pub fn failure_backoff_secs(mut self, seconds: u64) -> Self {
        self.config.reconcile.failure_backoff_secs = seconds;
        self
    }

    // --- verifier ---

    pub fn backup_root(mut self, root: PathBuf) -> Self {
        self.config.verifier.backup_root = root;
        self
    }

    pub fn search_dirs(mut self, dirs: Vec<String>) -> Self {
        self.config.verifier.search_dirs = dirs;
        self
    }

    pub fn verifier_timeout_ms(mut self, ms: u64) -> Self {
        self.config.verifier.timeout_ms = ms;
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_format(mut self, format: impl Into<String>) -> Self {
        self.config.logging.format = format.into();
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
