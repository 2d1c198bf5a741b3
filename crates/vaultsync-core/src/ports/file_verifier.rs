//! File verifier port (driven/secondary port)
//!
//! The verifier is the only external oracle the reconciler consults: "does
//! the artifact at this path exist and is it non-empty". It never reads
//! backup contents and never returns an error. Every failure mode collapses
//! into a [`FileCheck`] value that counts as "does not exist".

use std::fmt;
use std::path::{Path, PathBuf};

/// Outcome of probing a backup artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileCheck {
    /// Readable, non-empty file (or non-empty directory)
    Present,
    /// Nothing at the path
    Missing,
    /// Zero-byte file or empty directory
    Empty,
    /// Permission, traversal or other I/O failure
    Unreadable(String),
    /// The probe did not finish within the configured timeout
    TimedOut,
}

impl FileCheck {
    /// The fail-closed boolean view used for every decision
    pub fn is_present(&self) -> bool {
        matches!(self, FileCheck::Present)
    }

    /// True when the oracle itself failed rather than answering "absent"
    pub fn is_oracle_failure(&self) -> bool {
        matches!(self, FileCheck::Unreadable(_) | FileCheck::TimedOut)
    }

    pub fn name(&self) -> &'static str {
        match self {
            FileCheck::Present => "present",
            FileCheck::Missing => "missing",
            FileCheck::Empty => "empty",
            FileCheck::Unreadable(_) => "unreadable",
            FileCheck::TimedOut => "timed_out",
        }
    }
}

impl fmt::Display for FileCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileCheck::Unreadable(reason) => write!(f, "unreadable ({reason})"),
            other => f.write_str(other.name()),
        }
    }
}

/// Artifact existence oracle
#[async_trait::async_trait]
pub trait IFileVerifier: Send + Sync {
    /// Probes `path`; relative paths are resolved by the adapter
    async fn check(&self, path: &Path) -> FileCheck;

    /// `true` only for a readable, non-empty artifact
    async fn exists(&self, path: &Path) -> bool {
        self.check(path).await.is_present()
    }

    /// Places to look for an artifact whose record has no `file_path`
    fn fallback_paths(&self, _backup_id: &str) -> Vec<PathBuf> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_present_counts_as_existing() {
        assert!(FileCheck::Present.is_present());
        for check in [
            FileCheck::Missing,
            FileCheck::Empty,
            FileCheck::Unreadable("denied".into()),
            FileCheck::TimedOut,
        ] {
            assert!(!check.is_present(), "{check} should not count as present");
        }
    }

    #[test]
    fn oracle_failures_are_distinguished_from_absence() {
        assert!(FileCheck::TimedOut.is_oracle_failure());
        assert!(FileCheck::Unreadable("io".into()).is_oracle_failure());
        assert!(!FileCheck::Missing.is_oracle_failure());
        assert!(!FileCheck::Empty.is_oracle_failure());
    }

    #[test]
    fn display_includes_reason() {
        assert_eq!(
            FileCheck::Unreadable("permission denied".into()).to_string(),
            "unreadable (permission denied)"
        );
        assert_eq!(FileCheck::TimedOut.to_string(), "timed_out");
    }
}
