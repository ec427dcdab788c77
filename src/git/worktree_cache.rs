//! git::worktree_cache
//!
//! Materialized checkouts of commits, shared between processes.
//!
//! # Invariants
//!
//! - The cache directory is only mutated while the [`WorktreeCacheLock`] is
//!   held; the lock is dropped on every exit path
//! - A commit directory appears atomically (staged, then renamed into
//!   place), so an existing commit directory is always complete

use std::fs;
use std::path::PathBuf;

use thiserror::Error;

use super::interface::{Git, GitError};
use crate::core::lock::{LockError, WorktreeCacheLock};
use crate::core::paths::WorktreeCachePaths;
use crate::core::types::CommitId;

/// Errors from worktree cache operations.
#[derive(Debug, Error)]
pub enum WorktreeCacheError {
    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error("worktree cache i/o error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Cache of checked-out commit trees for one repository.
#[derive(Debug)]
pub struct WorktreeCache<'a> {
    git: &'a Git,
    paths: WorktreeCachePaths,
}

impl<'a> WorktreeCache<'a> {
    /// Create a cache for `git` routed through `paths`.
    pub fn new(git: &'a Git, paths: WorktreeCachePaths) -> Self {
        Self { git, paths }
    }

    /// Cache paths in use.
    pub fn paths(&self) -> &WorktreeCachePaths {
        &self.paths
    }

    /// Directory holding the checked-out tree of `commit`, creating it if
    /// needed.
    ///
    /// Blocks while another process holds the cache lock.
    pub fn materialize(&self, commit: &CommitId) -> Result<PathBuf, WorktreeCacheError> {
        let _lock = WorktreeCacheLock::acquire(&self.paths)?;

        let target = self.paths.commit_dir(commit);
        if target.is_dir() {
            tracing::debug!(commit = %commit.short(7), "reusing materialized worktree");
            return Ok(target);
        }

        let staging = self.paths.staging_dir(commit);
        if staging.exists() {
            fs::remove_dir_all(&staging).map_err(|source| WorktreeCacheError::Io {
                path: staging.clone(),
                source,
            })?;
        }
        fs::create_dir_all(&staging).map_err(|source| WorktreeCacheError::Io {
            path: staging.clone(),
            source,
        })?;

        self.git.checkout_tree_to(commit, &staging)?;

        fs::rename(&staging, &target).map_err(|source| WorktreeCacheError::Io {
            path: target.clone(),
            source,
        })?;

        tracing::debug!(commit = %commit.short(7), dir = %target.display(), "materialized worktree");
        Ok(target)
    }
}
