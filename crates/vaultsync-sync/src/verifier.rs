//! Filesystem File Verifier (secondary/driven adapter)
//!
//! Implements [`IFileVerifier`] using `tokio::fs`.
//!
//! ## Design Decisions
//!
//! - **Fail closed**: every error is folded into a [`FileCheck`] that counts
//!   as "does not exist". Nothing here returns `Err`.
//! - **Bounded**: each probe runs under `tokio::time::timeout`; slow or hung
//!   mounts produce `FileCheck::TimedOut`.
//! - **Rooted**: relative artifact paths are resolved against the backup
//!   root and may not climb out of it.
//! - **Directories**: physical backups are directories, present when they
//!   hold at least one entry.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use tracing::{debug, instrument, warn};

use vaultsync_core::config::VerifierConfig;
use vaultsync_core::ports::{FileCheck, IFileVerifier};

/// Suffix of compressed artifacts looked up for records without a path
const ARCHIVE_SUFFIX: &str = ".tar.gz";

// ============================================================================
// FsFileVerifier struct
// ============================================================================

/// Adapter that bridges the [`IFileVerifier`] port to the real filesystem
#[derive(Debug, Clone)]
pub struct FsFileVerifier {
    backup_root: PathBuf,
    search_dirs: Vec<String>,
    timeout: Duration,
}

impl FsFileVerifier {
    #[must_use]
    pub fn new(backup_root: PathBuf, search_dirs: Vec<String>, timeout: Duration) -> Self {
        Self {
            backup_root,
            search_dirs,
            timeout,
        }
    }

    #[must_use]
    pub fn from_config(config: &VerifierConfig) -> Self {
        Self::new(
            config.backup_root.clone(),
            config.search_dirs.clone(),
            Duration::from_millis(config.timeout_ms),
        )
    }

    pub fn backup_root(&self) -> &Path {
        &self.backup_root
    }

    /// Resolves `path` against the backup root
    ///
    /// Absolute paths are used as given. A relative path whose `..`
    /// components would leave the root is refused.
    fn resolve(&self, path: &Path) -> Result<PathBuf, String> {
        if path.is_absolute() {
            return Ok(path.to_path_buf());
        }

        let mut normalized = PathBuf::new();
        let mut depth: usize = 0;
        for component in path.components() {
            match component {
                Component::Normal(part) => {
                    normalized.push(part);
                    depth += 1;
                }
                Component::CurDir => {}
                Component::ParentDir => {
                    if depth == 0 {
                        return Err(format!(
                            "path '{}' escapes the backup root",
                            path.display()
                        ));
                    }
                    normalized.pop();
                    depth -= 1;
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(format!("unsupported path '{}'", path.display()));
                }
            }
        }
        Ok(self.backup_root.join(normalized))
    }
}

// ============================================================================
// Probing
// ============================================================================

fn from_io_error(err: std::io::Error) -> FileCheck {
    match err.kind() {
        ErrorKind::NotFound => FileCheck::Missing,
        _ => FileCheck::Unreadable(err.to_string()),
    }
}

/// Looks at one resolved path without any time bound
async fn probe(path: &Path) -> FileCheck {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(err) => return from_io_error(err),
    };

    if metadata.is_dir() {
        let mut entries = match tokio::fs::read_dir(path).await {
            Ok(entries) => entries,
            Err(err) => return from_io_error(err),
        };
        return match entries.next_entry().await {
            Ok(Some(_)) => FileCheck::Present,
            Ok(None) => FileCheck::Empty,
            Err(err) => FileCheck::Unreadable(err.to_string()),
        };
    }

    if metadata.len() == 0 {
        return FileCheck::Empty;
    }

    // Size alone does not prove we can read it
    match tokio::fs::File::open(path).await {
        Ok(_) => FileCheck::Present,
        Err(err) => from_io_error(err),
    }
}

/// True when `name` is a single normal path component
///
/// Backup ids come from the primary store and are joined onto the backup
/// root; separators, `.` and `..` would let them point anywhere.
fn is_plain_name(name: &str) -> bool {
    if name.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Folds the answers for several candidate locations into one
///
/// Any present candidate wins. Otherwise the first oracle failure is
/// reported so it is not hidden behind a plain "missing"; with neither,
/// the artifact is missing.
pub fn combine_checks(checks: impl IntoIterator<Item = FileCheck>) -> FileCheck {
    let mut failure = None;
    for check in checks {
        if check.is_present() {
            return FileCheck::Present;
        }
        if failure.is_none() && check.is_oracle_failure() {
            failure = Some(check);
        }
    }
    failure.unwrap_or(FileCheck::Missing)
}

// ============================================================================
// IFileVerifier implementation
// ============================================================================

#[async_trait::async_trait]
impl IFileVerifier for FsFileVerifier {
    #[instrument(skip(self), fields(path = %path.display()))]
    async fn check(&self, path: &Path) -> FileCheck {
        let resolved = match self.resolve(path) {
            Ok(resolved) => resolved,
            Err(reason) => {
                warn!(%reason, "Refusing artifact path");
                return FileCheck::Unreadable(reason);
            }
        };

        let check = match tokio::time::timeout(self.timeout, probe(&resolved)).await {
            Ok(check) => check,
            Err(_) => {
                warn!(
                    resolved = %resolved.display(),
                    timeout_ms = crate::saturating_millis(self.timeout),
                    "File check timed out"
                );
                FileCheck::TimedOut
            }
        };
        debug!(check = %check, "File check complete");
        check
    }

    fn fallback_paths(&self, backup_id: &str) -> Vec<PathBuf> {
        if !is_plain_name(backup_id) {
            warn!(%backup_id, "Backup id is not a plain file name; no fallback locations");
            return Vec::new();
        }
        self.search_dirs
            .iter()
            .flat_map(|dir| {
                let base = self.backup_root.join(dir);
                [
                    base.join(backup_id),
                    base.join(format!("{backup_id}{ARCHIVE_SUFFIX}")),
                ]
            })
            .collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn verifier(dir: &TempDir) -> FsFileVerifier {
        FsFileVerifier::new(
            dir.path().to_path_buf(),
            vec!["physical".to_string(), "snapshots".to_string()],
            Duration::from_secs(5),
        )
    }

    // ------------------------------------------------------------------
    // check
    // ------------------------------------------------------------------

    #[tokio::test]
    async fn test_non_empty_file_is_present() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bk-1.tar.gz");
        std::fs::write(&path, b"archive").unwrap();

        let v = verifier(&dir);
        assert_eq!(v.check(&path).await, FileCheck::Present);
        assert!(v.exists(&path).await);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let v = verifier(&dir);
        let path = dir.path().join("nope.tar.gz");

        assert_eq!(v.check(&path).await, FileCheck::Missing);
        assert!(!v.exists(&path).await);
    }

    #[tokio::test]
    async fn test_zero_byte_file_does_not_exist() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.tar.gz");
        std::fs::write(&path, b"").unwrap();

        let v = verifier(&dir);
        assert_eq!(v.check(&path).await, FileCheck::Empty);
        assert!(!v.exists(&path).await);
    }

    #[tokio::test]
    async fn test_directory_artifacts() {
        let dir = TempDir::new().unwrap();
        let empty = dir.path().join("physical/bk-empty");
        let full = dir.path().join("physical/bk-full");
        std::fs::create_dir_all(&empty).unwrap();
        std::fs::create_dir_all(&full).unwrap();
        std::fs::write(full.join("base.tar"), b"data").unwrap();

        let v = verifier(&dir);
        assert_eq!(v.check(&empty).await, FileCheck::Empty);
        assert_eq!(v.check(&full).await, FileCheck::Present);
    }

    #[tokio::test]
    async fn test_relative_path_resolves_against_root() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("logical")).unwrap();
        std::fs::write(dir.path().join("logical/bk-2.sql.gz"), b"dump").unwrap();

        let v = verifier(&dir);
        assert!(v.exists(Path::new("logical/bk-2.sql.gz")).await);
        assert!(v.exists(Path::new("./logical/../logical/bk-2.sql.gz")).await);
    }

    #[tokio::test]
    async fn test_traversal_outside_root_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let v = verifier(&dir);

        let check = v.check(Path::new("../etc/passwd")).await;
        assert!(matches!(check, FileCheck::Unreadable(_)));
        assert!(check.is_oracle_failure());
        assert!(!v.exists(Path::new("logical/../../secret")).await);
    }

    // ------------------------------------------------------------------
    // fallback_paths / combine_checks
    // ------------------------------------------------------------------

    #[test]
    fn test_fallback_paths_cover_every_search_dir() {
        let v = FsFileVerifier::new(
            PathBuf::from("/srv/backups"),
            vec!["physical".to_string(), "snapshots".to_string()],
            Duration::from_secs(1),
        );
        assert_eq!(
            v.fallback_paths("bk-7"),
            vec![
                PathBuf::from("/srv/backups/physical/bk-7"),
                PathBuf::from("/srv/backups/physical/bk-7.tar.gz"),
                PathBuf::from("/srv/backups/snapshots/bk-7"),
                PathBuf::from("/srv/backups/snapshots/bk-7.tar.gz"),
            ]
        );
    }

    #[test]
    fn test_fallback_paths_refuse_ids_that_leave_the_root() {
        let v = FsFileVerifier::new(
            PathBuf::from("/srv/backups"),
            vec!["physical".to_string()],
            Duration::from_secs(1),
        );
        for hostile in ["../../outside", "..", ".", "", "nested/bk-1", "/etc/passwd", "a\\..\\b"] {
            assert!(
                v.fallback_paths(hostile).is_empty(),
                "expected no candidates for {hostile:?}"
            );
        }
        assert_eq!(v.fallback_paths("bk-1.v2").len(), 2);
    }

    #[tokio::test]
    async fn test_hostile_id_never_reaches_a_file_outside_the_root() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("root");
        std::fs::create_dir_all(root.join("physical")).unwrap();
        std::fs::write(dir.path().join("outside"), b"not a backup").unwrap();

        let v = FsFileVerifier::new(root, vec!["physical".to_string()], Duration::from_secs(5));
        let candidates = v.fallback_paths("../../outside");
        let checks = check_all(&v, &candidates).await;
        assert_eq!(combine_checks(checks), FileCheck::Missing);
    }

    async fn check_all(v: &FsFileVerifier, paths: &[PathBuf]) -> Vec<FileCheck> {
        let mut checks = Vec::new();
        for path in paths {
            checks.push(v.check(path).await);
        }
        checks
    }

    #[test]
    fn test_from_config() {
        let config = VerifierConfig {
            backup_root: PathBuf::from("/data"),
            search_dirs: vec!["physical".to_string()],
            timeout_ms: 250,
        };
        let v = FsFileVerifier::from_config(&config);
        assert_eq!(v.backup_root(), Path::new("/data"));
        assert_eq!(v.timeout, Duration::from_millis(250));
        assert_eq!(v.fallback_paths("x").len(), 2);
    }

    #[test]
    fn test_combine_checks() {
        assert_eq!(
            combine_checks([FileCheck::Missing, FileCheck::Present]),
            FileCheck::Present
        );
        assert_eq!(
            combine_checks([FileCheck::Missing, FileCheck::TimedOut, FileCheck::Empty]),
            FileCheck::TimedOut
        );
        assert_eq!(
            combine_checks([FileCheck::Empty, FileCheck::Missing]),
            FileCheck::Missing
        );
        assert_eq!(combine_checks(Vec::new()), FileCheck::Missing);
    }
}
