//! store::commit_tree
//!
//! The commit tree accessor: a [`BackingStore`] over one fixed commit.

use super::{BackingStore, StoreError};
use crate::core::types::{BackingStoreKind, CommitId, EntryKind, TreeEntry};
use crate::git::{GitError, RepositoryHandle};

/// The tree of a single commit, read through a [`RepositoryHandle`].
///
/// The commit is fixed at construction; nothing here re-reads `HEAD`.
pub struct CommitTree<'a> {
    handle: &'a dyn RepositoryHandle,
    commit: CommitId,
}

impl std::fmt::Debug for CommitTree<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitTree")
            .field("commit", &self.commit)
            .finish()
    }
}

impl<'a> CommitTree<'a> {
    /// Create an accessor for `commit`.
    pub fn new(handle: &'a dyn RepositoryHandle, commit: CommitId) -> Self {
        Self { handle, commit }
    }

    /// The commit this accessor reads.
    pub fn commit(&self) -> &CommitId {
        &self.commit
    }

    fn content(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        self.handle
            .content(&self.commit, path)
            .map_err(|err| match err {
                GitError::EntryNotFound { .. } => StoreError::NotFound {
                    path: path.to_string(),
                    store: BackingStoreKind::CommitTree,
                },
                GitError::NotABlob { kind, .. } => StoreError::NotAFile {
                    path: path.to_string(),
                    kind,
                },
                other => StoreError::Git(other),
            })
    }

    fn collect(&self, dir: &str, out: &mut Vec<TreeEntry>) -> Result<(), StoreError> {
        for item in self.handle.list_tracked(&self.commit, dir)? {
            let entry = item?;
            if entry.kind == EntryKind::Submodule {
                // Checked-out submodules continue in their own repository;
                // uninitialized ones list nothing.
                self.collect(&entry.path, out)?;
                continue;
            }
            out.push(entry);
        }
        Ok(())
    }
}

impl BackingStore for CommitTree<'_> {
    fn kind(&self) -> BackingStoreKind {
        BackingStoreKind::CommitTree
    }

    fn entry(&self, path: &str) -> Result<Option<EntryKind>, StoreError> {
        Ok(self.handle.entry(&self.commit, path)?)
    }

    fn read_link(&self, path: &str) -> Result<String, StoreError> {
        match self.entry(path)? {
            Some(EntryKind::Symlink) => {}
            _ => {
                return Err(StoreError::NotASymlink {
                    path: path.to_string(),
                })
            }
        }

        let target = self.content(path)?;
        String::from_utf8(target).map_err(|_| StoreError::InvalidUtf8 {
            path: path.to_string(),
        })
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        self.content(path)
    }

    fn list_recursive(&self, dir: &str) -> Result<Vec<TreeEntry>, StoreError> {
        let mut entries = Vec::new();
        self.collect(dir, &mut entries)?;
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }
}
