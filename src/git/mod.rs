//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the **ONLY doorway** to Git. All commit-tree reads flow
//! through the [`RepositoryHandle`] trait. No other module imports `git2`,
//! and nothing shells out to the git CLI.
//!
//! # Responsibilities
//!
//! - Repository discovery and opening
//! - Commit resolution (HEAD is resolved once, by the caller)
//! - Tree entry classification and blob reads, across initialized submodules
//! - Lazy enumeration of tracked paths
//! - Submodule status
//! - Materializing commits into the shared worktree cache
//!
//! # Example
//!
//! ```ignore
//! use giterminism::git::{Git, RepositoryHandle};
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."))?;
//! let head = git.head_commit()?;
//!
//! for entry in git.list_tracked(&head, ".helm")? {
//!     println!("{}", entry?.path);
//! }
//! ```

mod interface;
mod worktree_cache;

pub use interface::{Git, GitError, RepositoryHandle, TrackedEntries};
pub use worktree_cache::{WorktreeCache, WorktreeCacheError};
