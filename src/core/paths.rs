//! core::paths
//!
//! Forward-slash path algebra and worktree cache path routing.
//!
//! # Architecture
//!
//! Every path handled by the resolver, the accessors and the file reader is
//! a forward-slash path relative to the project root. Both backing stores
//! share these helpers so that "inside the project" means exactly the same
//! thing for the commit tree and the worktree.
//!
//! **Hard rule:** a relative path never contains `.` or `..` segments after
//! [`clean`]. A path whose `..` segments climb above the root is rejected,
//! never truncated.
//!
//! # Cache Layout
//!
//! Materialized commit checkouts live under the cache base:
//! - `<base>/<repo-id>/lock` - Advisory lock file
//! - `<base>/<repo-id>/<commit>/` - Checked-out tree of a commit
//!
//! # Example
//!
//! ```
//! use giterminism::core::paths;
//!
//! assert_eq!(paths::clean("./a/b/../c").unwrap(), "a/c");
//! assert!(paths::clean("a/../../outside").is_err());
//! assert_eq!(paths::join("dir", "file"), "dir/file");
//! assert_eq!(paths::parent("dir/file"), "dir");
//! ```

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::core::types::CommitId;

/// Environment variable overriding the worktree cache base directory.
pub const CACHE_DIR_ENV: &str = "GITERMINISM_CACHE_DIR";

/// Errors from lexical path normalization.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PathError {
    /// The path is absolute.
    #[error("path '{path}' is absolute")]
    Absolute {
        /// The offending path
        path: String,
    },

    /// The path climbs above the project root.
    #[error("path '{path}' is outside the project directory")]
    EscapesRoot {
        /// The offending path
        path: String,
    },
}

/// Convert platform separators to forward slashes.
pub fn to_slash(path: &str) -> String {
    if cfg!(windows) {
        path.replace('\\', "/")
    } else {
        path.to_string()
    }
}

/// Check whether a symlink target or requested path is absolute.
///
/// Drive-letter paths count as absolute on every platform, since a commit
/// tree may have been authored on Windows.
pub fn is_absolute(path: &str) -> bool {
    let bytes = path.as_bytes();
    path.starts_with('/')
        || path.starts_with('\\')
        || (bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':')
}

/// Lexically normalize a relative path.
///
/// Removes empty and `.` segments and applies `..` segments. The root
/// itself normalizes to the empty string.
///
/// # Errors
///
/// - [`PathError::Absolute`] for absolute paths
/// - [`PathError::EscapesRoot`] if `..` climbs above the root
pub fn clean(path: &str) -> Result<String, PathError> {
    let path = to_slash(path);
    if is_absolute(&path) {
        return Err(PathError::Absolute { path });
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() {
                    return Err(PathError::EscapesRoot { path: path.clone() });
                }
            }
            s => segments.push(s),
        }
    }

    Ok(segments.join("/"))
}

/// Split a cleaned path into segments. The root has no segments.
pub fn split(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Join two relative paths without normalizing.
pub fn join(base: &str, rel: &str) -> String {
    match (base.is_empty(), rel.is_empty()) {
        (true, _) => rel.to_string(),
        (_, true) => base.to_string(),
        _ => format!("{}/{}", base, rel),
    }
}

/// Parent directory of a relative path; the root for top-level entries.
pub fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Check whether `path` equals `dir` or lies beneath it, segment-wise.
///
/// # Example
///
/// ```
/// use giterminism::core::paths::is_within;
///
/// assert!(is_within("sub", "sub/file"));
/// assert!(is_within("sub", "sub"));
/// assert!(!is_within("sub", "subway/file"));
/// assert!(is_within("", "anything"));
/// ```
pub fn is_within(dir: &str, path: &str) -> bool {
    strip_dir(dir, path).is_some()
}

/// Path of `path` relative to `dir`, if it lies beneath it.
pub fn strip_dir<'a>(dir: &str, path: &'a str) -> Option<&'a str> {
    if dir.is_empty() {
        return Some(path);
    }
    let rest = path.strip_prefix(dir)?;
    if rest.is_empty() {
        Some("")
    } else {
        rest.strip_prefix('/')
    }
}

/// Convert an absolute filesystem path below `root` to a relative slash path.
pub fn relative_to(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

/// Convert a relative slash path to an absolute path below `root`.
pub fn to_absolute(root: &Path, rel: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for segment in split(rel) {
        path.push(segment);
    }
    path
}

/// Centralized path routing for the worktree cache.
///
/// # Invariants
///
/// - Each repository gets its own directory, keyed by the SHA-256 of its
///   canonical project root
/// - No code outside this type computes cache paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorktreeCachePaths {
    /// Base directory shared by all repositories.
    pub base: PathBuf,

    /// Stable identifier of the repository.
    pub repo_id: String,
}

impl WorktreeCachePaths {
    /// Create cache paths for a project root under an explicit base.
    ///
    /// # Example
    ///
    /// ```
    /// use giterminism::core::paths::WorktreeCachePaths;
    /// use std::path::{Path, PathBuf};
    ///
    /// let paths = WorktreeCachePaths::new(PathBuf::from("/cache"), Path::new("/repo"));
    /// assert_eq!(paths.repo_id.len(), 64);
    /// assert!(paths.lock_path().ends_with("lock"));
    /// ```
    pub fn new(base: PathBuf, project_root: &Path) -> Self {
        Self {
            base,
            repo_id: repo_id(project_root),
        }
    }

    /// Create cache paths under the default base directory.
    ///
    /// Returns `None` when no base can be determined (no env override and no
    /// platform cache directory).
    pub fn for_project(project_root: &Path) -> Option<Self> {
        Some(Self::new(default_base()?, project_root))
    }

    /// Directory holding all cache data for this repository.
    pub fn repo_dir(&self) -> PathBuf {
        self.base.join(&self.repo_id)
    }

    /// Path to the advisory lock file.
    pub fn lock_path(&self) -> PathBuf {
        self.repo_dir().join("lock")
    }

    /// Directory of the materialized tree of a commit.
    pub fn commit_dir(&self, commit: &CommitId) -> PathBuf {
        self.repo_dir().join(commit.as_str())
    }

    /// Scratch directory used while materializing a commit.
    pub fn staging_dir(&self, commit: &CommitId) -> PathBuf {
        self.repo_dir().join(format!("{}.tmp", commit.as_str()))
    }
}

/// Default cache base: `$GITERMINISM_CACHE_DIR`, else `<cache dir>/giterminism`.
pub fn default_base() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CACHE_DIR_ENV) {
        if !dir.is_empty() {
            return Some(PathBuf::from(dir));
        }
    }
    dirs::cache_dir().map(|dir| dir.join("giterminism"))
}

/// Hash of the canonical project root, so every path to one checkout
/// shares a cache directory. Falls back to the path as given.
fn repo_id(project_root: &Path) -> String {
    let root = std::fs::canonicalize(project_root).unwrap_or_else(|_| project_root.to_path_buf());
    let mut hasher = Sha256::new();
    hasher.update(root.to_string_lossy().as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    mod clean {
        use super::*;

        #[test]
        fn removes_dot_segments() {
            assert_eq!(clean("./a/./b").unwrap(), "a/b");
            assert_eq!(clean("a//b/").unwrap(), "a/b");
        }

        #[test]
        fn applies_parent_segments() {
            assert_eq!(clean("a/b/../c").unwrap(), "a/c");
            assert_eq!(clean("a/..").unwrap(), "");
        }

        #[test]
        fn root_is_empty() {
            assert_eq!(clean("").unwrap(), "");
            assert_eq!(clean(".").unwrap(), "");
        }

        #[test]
        fn escape_rejected() {
            assert!(matches!(
                clean("../outside"),
                Err(PathError::EscapesRoot { .. })
            ));
            assert!(matches!(
                clean("a/../../outside"),
                Err(PathError::EscapesRoot { .. })
            ));
        }

        #[test]
        fn absolute_rejected() {
            assert!(matches!(clean("/etc/passwd"), Err(PathError::Absolute { .. })));
            assert!(matches!(clean("C:/x"), Err(PathError::Absolute { .. })));
        }
    }

    mod algebra {
        use super::*;

        #[test]
        fn join_handles_root() {
            assert_eq!(join("", "a"), "a");
            assert_eq!(join("a", ""), "a");
            assert_eq!(join("a", "b/c"), "a/b/c");
        }

        #[test]
        fn parent_of_top_level_is_root() {
            assert_eq!(parent("file"), "");
            assert_eq!(parent("a/b/c"), "a/b");
        }

        #[test]
        fn split_ignores_empty() {
            assert_eq!(split(""), Vec::<&str>::new());
            assert_eq!(split("a/b"), vec!["a", "b"]);
        }

        #[test]
        fn strip_dir_segment_wise() {
            assert_eq!(strip_dir("a", "a/b/c"), Some("b/c"));
            assert_eq!(strip_dir("a", "a"), Some(""));
            assert_eq!(strip_dir("a", "ab/c"), None);
            assert_eq!(strip_dir("", "x"), Some("x"));
        }

        #[test]
        fn absolute_round_trip() {
            let root = Path::new("/project");
            let abs = to_absolute(root, "dir/file");
            assert_eq!(abs, PathBuf::from("/project/dir/file"));
            assert_eq!(relative_to(root, &abs).as_deref(), Some("dir/file"));
            assert_eq!(relative_to(root, Path::new("/elsewhere")), None);
        }
    }

    mod cache_paths {
        use super::*;

        #[test]
        fn repo_id_is_stable() {
            let a = WorktreeCachePaths::new(PathBuf::from("/c"), Path::new("/repo"));
            let b = WorktreeCachePaths::new(PathBuf::from("/c"), Path::new("/repo"));
            let other = WorktreeCachePaths::new(PathBuf::from("/c"), Path::new("/other"));
            assert_eq!(a, b);
            assert_ne!(a.repo_id, other.repo_id);
        }

        #[cfg(unix)]
        #[test]
        fn symlinked_root_shares_repo_id() {
            let temp = tempfile::tempdir().unwrap();
            let real = temp.path().join("real");
            let linked = temp.path().join("linked");
            std::fs::create_dir(&real).unwrap();
            std::os::unix::fs::symlink(&real, &linked).unwrap();

            let a = WorktreeCachePaths::new(PathBuf::from("/c"), &real);
            let b = WorktreeCachePaths::new(PathBuf::from("/c"), &linked);
            assert_eq!(a.repo_id, b.repo_id);
        }

        #[test]
        fn layout() {
            let paths = WorktreeCachePaths::new(PathBuf::from("/c"), Path::new("/repo"));
            let commit = CommitId::new("a".repeat(40)).unwrap();
            assert_eq!(paths.lock_path(), paths.repo_dir().join("lock"));
            assert_eq!(paths.commit_dir(&commit), paths.repo_dir().join("a".repeat(40)));
            assert!(paths
                .staging_dir(&commit)
                .to_string_lossy()
                .ends_with(".tmp"));
        }
    }
}
