//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the reconciler
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`ILocalStore`] - The isolated store the core owns exclusively
//! - [`IPrimaryStore`] - The shared relational store of record
//! - [`IFileVerifier`] - The artifact existence oracle

pub mod file_verifier;
pub mod local_store;
pub mod primary_store;

pub use file_verifier::{FileCheck, IFileVerifier};
pub use local_store::{ILocalStore, RecordFilter};
pub use primary_store::IPrimaryStore;
