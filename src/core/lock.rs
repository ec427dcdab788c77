//! core::lock
//!
//! Advisory lock guarding the materialized worktree cache.
//!
//! # Architecture
//!
//! Commit-tree queries never need a checkout, but materializing a commit into
//! the shared cache mutates a directory other processes may be reading or
//! writing. The lock is **cache-scoped**: one lock file per repository cache
//! directory, `<base>/<repo-id>/lock`, shared by every process working on
//! that repository.
//!
//! # Invariants
//!
//! - Lock must be held for the entire mutation of the cache directory
//! - Lock is automatically released on drop (RAII pattern), including on
//!   error paths
//! - [`WorktreeCacheLock::acquire`] blocks; [`WorktreeCacheLock::try_acquire`]
//!   fails fast
//!
//! # Example
//!
//! ```ignore
//! use giterminism::core::lock::WorktreeCacheLock;
//! use giterminism::core::paths::WorktreeCachePaths;
//!
//! let paths = WorktreeCachePaths::for_project(project_root).unwrap();
//! let lock = WorktreeCacheLock::acquire(&paths)?;
//!
//! // Mutate the cache while holding the lock
//! // ...
//!
//! drop(lock);
//! ```

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

use crate::core::paths::WorktreeCachePaths;

/// Errors from locking operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another process already holds the lock.
    #[error("worktree cache is locked by another process")]
    AlreadyLocked,

    /// Failed to create lock file or directory.
    #[error("failed to create lock: {0}")]
    CreateFailed(String),

    /// Failed to acquire the OS lock.
    #[error("failed to acquire lock: {0}")]
    AcquireFailed(String),

    /// Failed to release the lock.
    #[error("failed to release lock: {0}")]
    ReleaseFailed(String),
}

/// An exclusive lock on a repository's worktree cache.
///
/// Released when dropped.
#[derive(Debug)]
pub struct WorktreeCacheLock {
    /// Path to the lock file.
    path: PathBuf,
    /// The open file handle with the lock held.
    file: Option<File>,
}

impl WorktreeCacheLock {
    /// Acquire the cache lock, waiting for other holders to release it.
    ///
    /// Creates the repository cache directory if needed.
    ///
    /// # Errors
    ///
    /// - [`LockError::CreateFailed`] if the lock file cannot be created
    /// - [`LockError::AcquireFailed`] if the OS lock cannot be acquired
    pub fn acquire(paths: &WorktreeCachePaths) -> Result<Self, LockError> {
        let (path, file) = Self::open(paths)?;
        file.lock_exclusive()
            .map_err(|e| LockError::AcquireFailed(e.to_string()))?;

        tracing::debug!(lock = %path.display(), "acquired worktree cache lock");
        Ok(Self {
            path,
            file: Some(file),
        })
    }

    /// Acquire the cache lock without waiting.
    ///
    /// # Errors
    ///
    /// - [`LockError::AlreadyLocked`] if another holder has it
    pub fn acquire_nonblocking(paths: &WorktreeCachePaths) -> Result<Self, LockError> {
        let (path, file) = Self::open(paths)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self {
                path,
                file: Some(file),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Err(LockError::AlreadyLocked),
            Err(e) => Err(LockError::AcquireFailed(e.to_string())),
        }
    }

    /// Try to acquire the lock, returning `None` if already held.
    pub fn try_acquire(paths: &WorktreeCachePaths) -> Result<Option<Self>, LockError> {
        match Self::acquire_nonblocking(paths) {
            Ok(lock) => Ok(Some(lock)),
            Err(LockError::AlreadyLocked) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn open(paths: &WorktreeCachePaths) -> Result<(PathBuf, File), LockError> {
        let repo_dir = paths.repo_dir();
        fs::create_dir_all(&repo_dir).map_err(|e| {
            LockError::CreateFailed(format!("cannot create {}: {}", repo_dir.display(), e))
        })?;

        let path = paths.lock_path();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| {
                LockError::CreateFailed(format!("cannot open {}: {}", path.display(), e))
            })?;

        Ok((path, file))
    }

    /// Check if the lock is currently held.
    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    /// Get the path to the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock before the guard goes out of scope.
    pub fn release(&mut self) -> Result<(), LockError> {
        if let Some(file) = self.file.take() {
            file.unlock()
                .map_err(|e| LockError::ReleaseFailed(e.to_string()))?;
        }
        Ok(())
    }
}

impl Drop for WorktreeCacheLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = file.unlock();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_paths(dir: &Path) -> WorktreeCachePaths {
        WorktreeCachePaths::new(dir.to_path_buf(), Path::new("/project"))
    }

    #[test]
    fn acquire_creates_repo_dir() {
        let temp = TempDir::new().expect("create temp dir");
        let paths = test_paths(temp.path());
        assert!(!paths.repo_dir().exists());

        let lock = WorktreeCacheLock::acquire(&paths).expect("acquire lock");
        assert!(lock.is_held());
        assert!(paths.repo_dir().exists());
        assert_eq!(lock.path(), paths.lock_path());
    }

    #[test]
    fn second_acquire_fails_fast() {
        let temp = TempDir::new().expect("create temp dir");
        let paths = test_paths(temp.path());

        let _lock = WorktreeCacheLock::acquire(&paths).expect("first acquire");
        let result = WorktreeCacheLock::acquire_nonblocking(&paths);
        assert!(matches!(result, Err(LockError::AlreadyLocked)));
        assert!(WorktreeCacheLock::try_acquire(&paths)
            .expect("try_acquire")
            .is_none());
    }

    #[test]
    fn released_on_drop() {
        let temp = TempDir::new().expect("create temp dir");
        let paths = test_paths(temp.path());

        {
            let lock = WorktreeCacheLock::acquire(&paths).expect("first acquire");
            assert!(lock.is_held());
        }

        let lock = WorktreeCacheLock::acquire_nonblocking(&paths).expect("reacquire");
        assert!(lock.is_held());
    }

    #[test]
    fn release_is_idempotent() {
        let temp = TempDir::new().expect("create temp dir");
        let paths = test_paths(temp.path());

        let mut lock = WorktreeCacheLock::acquire(&paths).expect("acquire");
        lock.release().expect("first release");
        lock.release().expect("second release");
        assert!(!lock.is_held());

        let again = WorktreeCacheLock::try_acquire(&paths).expect("try_acquire");
        assert!(again.is_some());
    }

    #[test]
    fn separate_repositories_do_not_contend() {
        let temp = TempDir::new().expect("create temp dir");
        let a = WorktreeCachePaths::new(temp.path().to_path_buf(), Path::new("/a"));
        let b = WorktreeCachePaths::new(temp.path().to_path_buf(), Path::new("/b"));

        let _lock_a = WorktreeCacheLock::acquire(&a).expect("acquire a");
        let lock_b = WorktreeCacheLock::acquire_nonblocking(&b).expect("acquire b");
        assert!(lock_b.is_held());
    }

    #[test]
    fn error_display_formatting() {
        assert!(LockError::AlreadyLocked.to_string().contains("locked"));
        assert!(LockError::CreateFailed("x".into())
            .to_string()
            .contains("create"));
        assert!(LockError::AcquireFailed("x".into())
            .to_string()
            .contains("acquire"));
        assert!(LockError::ReleaseFailed("x".into())
            .to_string()
            .contains("release"));
    }
}
