//! vaultsync Core - Record model, ports and configuration
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `BackupRecord`, `RestoreRecord`, `PrimaryRecord`, `SyncLogEntry`
//! - **Port definitions** - Traits for adapters: `ILocalStore`, `IPrimaryStore`, `IFileVerifier`
//! - **State machine** - The local-only `SyncStatus` lifecycle
//! - **Configuration** - YAML configuration with validation and a builder
//!
//! # Architecture
//!
//! The domain module contains pure data and rules with no I/O.
//! Ports define trait interfaces that adapter crates implement, so the
//! reconciler can be driven against real stores or in-memory fakes.

pub mod config;
pub mod domain;
pub mod ports;
