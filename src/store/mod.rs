//! store
//!
//! The two backing stores a path can be looked up in.
//!
//! # Architecture
//!
//! [`BackingStore`] is the seam between the resolver and the data: the same
//! resolution and enumeration code runs against the commit tree
//! ([`CommitTree`]), the live working directory ([`Worktree`]) or an
//! in-memory tree ([`MemoryStore`]).
//!
//! # Invariants
//!
//! - Paths are forward-slash, relative to the project root, already cleaned
//! - `entry` never follows symlinks: a symlink is classified as a symlink
//! - `list_recursive` never descends through symlinks and never reports
//!   directories

mod commit_tree;
mod memory;
mod worktree;

pub use commit_tree::CommitTree;
pub use memory::MemoryStore;
pub use worktree::Worktree;

use std::path::PathBuf;

use thiserror::Error;

use crate::core::types::{BackingStoreKind, EntryKind, TreeEntry};
use crate::git::GitError;

/// Errors from backing store access.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Commit-tree access failed.
    #[error(transparent)]
    Git(#[from] GitError),

    /// Filesystem access failed.
    #[error("unable to access {path}: {source}")]
    Io {
        /// Absolute path of the failed access
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No entry at the path.
    #[error("'{path}' not found in the {store}")]
    NotFound {
        /// Relative path
        path: String,
        /// Store that was searched
        store: BackingStoreKind,
    },

    /// Content requested for an entry that is not a file.
    #[error("'{path}' is a {kind}, not a file")]
    NotAFile {
        /// Relative path
        path: String,
        /// What the entry actually is
        kind: EntryKind,
    },

    /// Link target requested for an entry that is not a symlink.
    #[error("'{path}' is not a symlink")]
    NotASymlink {
        /// Relative path
        path: String,
    },

    /// Symlink target is not valid UTF-8.
    #[error("symlink target of '{path}' is not valid UTF-8")]
    InvalidUtf8 {
        /// Relative path
        path: String,
    },
}

/// Read access to one backing store.
pub trait BackingStore {
    /// Which store this is.
    fn kind(&self) -> BackingStoreKind;

    /// Classify the entry at `path` without following symlinks.
    ///
    /// Returns `None` if nothing exists there, including when an
    /// intermediate segment is a file. The empty path is the root directory.
    fn entry(&self, path: &str) -> Result<Option<EntryKind>, StoreError>;

    /// Target text of the symlink at `path`, with forward slashes.
    fn read_link(&self, path: &str) -> Result<String, StoreError>;

    /// Byte content of the file at `path`.
    fn read(&self, path: &str) -> Result<Vec<u8>, StoreError>;

    /// Every non-directory entry beneath `dir`, sorted by path.
    ///
    /// A `dir` that does not exist or is not a directory yields nothing.
    fn list_recursive(&self, dir: &str) -> Result<Vec<TreeEntry>, StoreError>;
}

impl<S: BackingStore + ?Sized> BackingStore for &S {
    fn kind(&self) -> BackingStoreKind {
        (**self).kind()
    }

    fn entry(&self, path: &str) -> Result<Option<EntryKind>, StoreError> {
        (**self).entry(path)
    }

    fn read_link(&self, path: &str) -> Result<String, StoreError> {
        (**self).read_link(path)
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        (**self).read(path)
    }

    fn list_recursive(&self, dir: &str) -> Result<Vec<TreeEntry>, StoreError> {
        (**self).list_recursive(dir)
    }
}
