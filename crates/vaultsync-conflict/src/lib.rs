//! Vaultsync Conflict - Conflict detection and resolution rules
//!
//! Provides:
//! - The status-disagreement detection rule (strict or file-aware)
//! - Field-precedence merging of descriptive attributes
//! - The deterministic, file-existence based resolution rule
//!
//! Everything here is pure: the caller supplies the oracle's answer and
//! persists the outcome.

pub mod detector;
pub mod error;
pub mod policy;
pub mod resolver;

pub use detector::{ConflictDetector, DetectionResult};
pub use error::ConflictError;
pub use policy::{DetectionMode, FieldPrecedence, OracleFailurePolicy, ReconcilePolicy};
pub use resolver::{ConflictResolver, Resolution, ResolutionOutcome, MISSING_ARTIFACT_MESSAGE};
