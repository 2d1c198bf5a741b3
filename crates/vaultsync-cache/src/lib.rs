//! Vaultsync Cache - SQLite persistence
//!
//! SQLite-based storage for:
//! - Backup and restore records with sync bookkeeping (local store)
//! - The append-only sync log (local store)
//! - The application's backup and restore tables (primary store)
//!
//! ## Architecture
//!
//! This crate implements the `ILocalStore` and `IPrimaryStore` ports from
//! `vaultsync-core` using SQLite as the storage backend. Both are driven
//! (secondary) adapters in the hexagonal architecture.
//!
//! ## Key Components
//!
//! - [`DatabasePool`] - Connection pool with migration support
//! - [`SqliteLocalStore`] - Full `ILocalStore` implementation
//! - [`SqlitePrimaryStore`] - Full `IPrimaryStore` implementation
//! - [`CacheError`] - Error types for cache operations
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use vaultsync_cache::{DatabasePool, SqliteLocalStore};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pool = DatabasePool::new(Path::new("/var/lib/vaultsync/local.db")).await?;
//! let store = SqliteLocalStore::new(pool.pool().clone());
//! // Use store as ILocalStore...
//! # Ok(())
//! # }
//! ```

mod convert;
pub mod pool;
pub mod primary;
pub mod repository;

pub use pool::{DatabasePool, Schema};
pub use primary::SqlitePrimaryStore;
pub use repository::SqliteLocalStore;

/// Errors that can occur during cache operations
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Serialization or deserialization of domain types failed
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<sqlx::Error> for CacheError {
    fn from(e: sqlx::Error) -> Self {
        CacheError::QueryFailed(e.to_string())
    }
}

impl From<vaultsync_core::domain::DomainError> for CacheError {
    fn from(e: vaultsync_core::domain::DomainError) -> Self {
        CacheError::SerializationError(e.to_string())
    }
}
