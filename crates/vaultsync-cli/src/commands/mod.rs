//! CLI subcommands

pub mod audit;
pub mod completions;
pub mod config;
pub mod conflicts;
pub mod stats;
pub mod sync;
