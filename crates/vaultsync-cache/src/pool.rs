//! Database connection pool management
//!
//! Provides a wrapper around SQLx's SqlitePool with:
//! - Automatic directory creation for database files
//! - WAL journal mode for concurrent reads
//! - Automatic schema migration on first connection
//! - In-memory mode for testing
//!
//! The same wrapper serves both stores; [`Schema`] selects which set of
//! tables is created.

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::CacheError;

/// Which store a pool is opened for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    /// Records with sync bookkeeping, plus the sync log
    Local,
    /// The application's backup and restore tables
    Primary,
}

impl Schema {
    fn migration(&self) -> (&'static str, &'static str) {
        match self {
            Schema::Local => (
                "local_initial",
                include_str!("migrations/20260601_local_initial.sql"),
            ),
            Schema::Primary => (
                "primary_initial",
                include_str!("migrations/20260601_primary_initial.sql"),
            ),
        }
    }
}

/// Manages a pool of SQLite connections for one store
///
/// The pool is configured with:
/// - WAL journal mode for concurrent read access
/// - 5 max connections for file-based databases
/// - 1 connection for in-memory databases (required for data persistence)
/// - 5-second busy timeout to handle write contention
pub struct DatabasePool {
    pool: SqlitePool,
    schema: Schema,
}

impl DatabasePool {
    /// Opens (or creates) the local store at `db_path`
    ///
    /// This will:
    /// 1. Create parent directories if they don't exist
    /// 2. Create the database file if it doesn't exist
    /// 3. Enable WAL journal mode
    /// 4. Run schema migrations
    ///
    /// # Errors
    ///
    /// Returns `CacheError::ConnectionFailed` if the connection cannot be established,
    /// or `CacheError::MigrationFailed` if schema migrations fail.
    pub async fn new(db_path: &Path) -> Result<Self, CacheError> {
        Self::open(db_path, Schema::Local).await
    }

    /// Opens (or creates) the primary store tables at `db_path`
    pub async fn new_primary(db_path: &Path) -> Result<Self, CacheError> {
        Self::open(db_path, Schema::Primary).await
    }

    /// Creates an in-memory local store for testing
    ///
    /// Uses a single connection to ensure data persistence across queries
    /// (SQLite in-memory databases are per-connection).
    pub async fn in_memory() -> Result<Self, CacheError> {
        Self::open_in_memory(Schema::Local).await
    }

    /// Creates an in-memory primary store for testing
    pub async fn in_memory_primary() -> Result<Self, CacheError> {
        Self::open_in_memory(Schema::Primary).await
    }

    /// Returns a reference to the underlying SQLite connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn schema(&self) -> Schema {
        self.schema
    }

    /// Closes every connection in the pool
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn open(db_path: &Path, schema: Schema) -> Result<Self, CacheError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CacheError::ConnectionFailed(format!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| {
                CacheError::ConnectionFailed(format!(
                    "Failed to connect to database at {}: {}",
                    db_path.display(),
                    e
                ))
            })?;

        Self::run_migrations(&pool, schema).await?;

        tracing::info!(
            path = %db_path.display(),
            schema = ?schema,
            "Database pool initialized"
        );

        Ok(Self { pool, schema })
    }

    async fn open_in_memory(schema: Schema) -> Result<Self, CacheError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| {
                CacheError::ConnectionFailed(format!("Failed to create in-memory database: {}", e))
            })?;

        sqlx::raw_sql("PRAGMA foreign_keys = ON;")
            .execute(&pool)
            .await
            .map_err(|e| {
                CacheError::MigrationFailed(format!("Failed to enable foreign keys: {}", e))
            })?;

        Self::run_migrations(&pool, schema).await?;

        tracing::debug!(schema = ?schema, "In-memory database pool initialized");

        Ok(Self { pool, schema })
    }

    async fn run_migrations(pool: &SqlitePool, schema: Schema) -> Result<(), CacheError> {
        let (name, migration_sql) = schema.migration();
        sqlx::raw_sql(migration_sql)
            .execute(pool)
            .await
            .map_err(|e| {
                CacheError::MigrationFailed(format!("Failed to run {} migration: {}", name, e))
            })?;

        tracing::debug!(migration = name, "Database migrations completed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn table_names(pool: &DatabasePool) -> Vec<String> {
        sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' \
             AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(pool.pool())
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn local_schema_has_sync_log() {
        let pool = DatabasePool::in_memory().await.unwrap();
        assert_eq!(pool.schema(), Schema::Local);
        assert_eq!(
            table_names(&pool).await,
            vec!["backup_records", "restore_records", "sync_log"]
        );
    }

    #[tokio::test]
    async fn primary_schema_has_no_sync_columns() {
        let pool = DatabasePool::in_memory_primary().await.unwrap();
        assert_eq!(
            table_names(&pool).await,
            vec!["backup_records", "restore_records"]
        );

        let columns: Vec<String> =
            sqlx::query_scalar("SELECT name FROM pragma_table_info('backup_records')")
                .fetch_all(pool.pool())
                .await
                .unwrap();
        assert!(!columns.iter().any(|c| c == "sync_status"));
        assert!(!columns.iter().any(|c| c == "conflict_reason"));
        assert!(!columns.iter().any(|c| c == "last_sync_at"));
    }

    #[tokio::test]
    async fn file_database_creates_parent_dirs_and_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("local.db");

        let pool = DatabasePool::new(&path).await.unwrap();
        pool.close().await;
        assert!(path.exists());

        // Migrations are idempotent
        let pool = DatabasePool::new(&path).await.unwrap();
        assert_eq!(table_names(&pool).await.len(), 3);
    }
}
