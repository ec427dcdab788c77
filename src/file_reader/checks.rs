//! file_reader::checks
//!
//! Single-path existence checks and checked reads.

use super::{FileReaderError, FileReader};
use crate::core::types::{ArtifactKind, EntryKind, ResolvedPath};
use crate::resolver::{ResolveError, Resolver};
use crate::store::{BackingStore, StoreError};

impl<C: BackingStore, W: BackingStore> FileReader<'_, C, W> {
    // =========================================================================
    // Existence
    // =========================================================================

    /// Fail unless `rel_path` can be served as a file for `kind`.
    ///
    /// A path missing from the commit but present in the worktree is
    /// reported through the first entry of its worktree resolution chain
    /// that the commit lacks: the link itself or the file it leads to.
    pub fn check_configuration_file_existence(
        &self,
        kind: ArtifactKind,
        rel_path: &str,
    ) -> Result<(), FileReaderError> {
        self.check_existence(kind, rel_path, EntryKind::is_file)
    }

    /// [`Self::check_configuration_file_existence`] for directories.
    pub fn check_configuration_directory_existence(
        &self,
        kind: ArtifactKind,
        rel_path: &str,
    ) -> Result<(), FileReaderError> {
        self.check_existence(kind, rel_path, EntryKind::is_directory_like)
    }

    fn check_existence(
        &self,
        kind: ArtifactKind,
        rel_path: &str,
        wanted: fn(&EntryKind) -> bool,
    ) -> Result<(), FileReaderError> {
        let from_worktree = self.reads_from_worktree(kind, rel_path);

        if !from_worktree && probe(&self.commit_resolver(), rel_path, wanted)? {
            return Ok(());
        }

        if probe(&self.worktree_resolver(), rel_path, wanted)? {
            if from_worktree {
                return Ok(());
            }
            return Err(FileReaderError::UncommittedFiles {
                paths: vec![self.first_uncommitted(rel_path)?],
            });
        }

        if from_worktree {
            Err(FileReaderError::NotFoundInProjectDirectory {
                path: rel_path.to_string(),
            })
        } else {
            Err(FileReaderError::NotFoundInProjectRepository {
                path: rel_path.to_string(),
            })
        }
    }

    /// First path along the worktree resolution of `rel_path` with no entry
    /// in the commit tree.
    fn first_uncommitted(&self, rel_path: &str) -> Result<String, FileReaderError> {
        let resolved = self.worktree_resolver().resolve(rel_path)?;
        for path in resolved.chain() {
            if self.commit_tree.entry(path)?.is_none() {
                return Ok(path.to_string());
            }
        }
        Ok(resolved.original)
    }

    /// Whether `rel_path` is a file in the commit tree or, failing that, in
    /// the worktree. Policy plays no part.
    pub fn is_configuration_file_exist_anywhere(
        &self,
        rel_path: &str,
    ) -> Result<bool, FileReaderError> {
        Ok(self.is_commit_file_exist(rel_path)? || self.is_worktree_file_exist(rel_path)?)
    }

    /// Whether `rel_path` is a directory in the commit tree or, failing
    /// that, in the worktree. Policy plays no part.
    pub fn is_configuration_directory_exist_anywhere(
        &self,
        rel_path: &str,
    ) -> Result<bool, FileReaderError> {
        Ok(
            probe(&self.commit_resolver(), rel_path, EntryKind::is_directory_like)?
                || probe(&self.worktree_resolver(), rel_path, EntryKind::is_directory_like)?,
        )
    }

    pub(super) fn is_commit_file_exist(&self, rel_path: &str) -> Result<bool, FileReaderError> {
        probe(&self.commit_resolver(), rel_path, EntryKind::is_file)
    }

    pub(super) fn is_worktree_file_exist(&self, rel_path: &str) -> Result<bool, FileReaderError> {
        probe(&self.worktree_resolver(), rel_path, EntryKind::is_file)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Read `rel_path` from the store policy selects for `kind`.
    ///
    /// Commit-tree reads fail with
    /// [`FileReaderError::UncommittedFilesChanges`] when the worktree
    /// diverges anywhere along the resolution.
    pub fn check_and_read_configuration_file(
        &self,
        kind: ArtifactKind,
        rel_path: &str,
    ) -> Result<Vec<u8>, FileReaderError> {
        if self.reads_from_worktree(kind, rel_path) {
            self.read_worktree_file(rel_path)
        } else {
            self.read_commit_file(rel_path)
        }
    }

    pub(super) fn read_worktree_file(&self, rel_path: &str) -> Result<Vec<u8>, FileReaderError> {
        let resolved = self.worktree_resolver().resolve(rel_path)?;
        read_resolved(&self.worktree, &resolved)
    }

    pub(super) fn read_commit_file(&self, rel_path: &str) -> Result<Vec<u8>, FileReaderError> {
        let detector = self.detector();
        let resolved = self
            .commit_resolver()
            .resolve_with(rel_path, |resolved: &ResolvedPath| {
                if detector.is_modified(resolved)? {
                    return Err(FileReaderError::UncommittedFilesChanges {
                        paths: vec![resolved.original.clone()],
                    });
                }
                Ok(())
            })?;

        read_resolved(&self.commit_tree, &resolved)
    }

    /// Resolve a directory through symlinks, preferring the worktree.
    pub(super) fn resolve_directory(&self, rel_dir: &str) -> Result<String, FileReaderError> {
        let resolved = match self.worktree_resolver().resolve(rel_dir) {
            Ok(resolved) => resolved,
            Err(ResolveError::NotFound { .. }) => self.commit_resolver().resolve(rel_dir)?,
            Err(err) => return Err(err.into()),
        };

        if !resolved.kind.is_directory_like() {
            return Err(FileReaderError::NotADirectory {
                path: resolved.canonical,
            });
        }
        Ok(resolved.canonical)
    }
}

/// Resolve `rel_path` and test its kind. Missing and escaping paths do not
/// exist.
fn probe<S: BackingStore>(
    resolver: &Resolver<S>,
    rel_path: &str,
    wanted: fn(&EntryKind) -> bool,
) -> Result<bool, FileReaderError> {
    match resolver.resolve(rel_path) {
        Ok(resolved) => Ok(wanted(&resolved.kind)),
        Err(ResolveError::NotFound { .. }) => Ok(false),
        Err(ResolveError::PathEscapesProject { path, target }) => {
            tracing::warn!(
                store = %resolver.store().kind(),
                path = %path,
                target = %target,
                "treating path outside the project directory as missing"
            );
            Ok(false)
        }
        Err(err) => Err(err.into()),
    }
}

fn read_resolved<S: BackingStore>(
    store: &S,
    resolved: &ResolvedPath,
) -> Result<Vec<u8>, FileReaderError> {
    if !resolved.kind.is_file() {
        return Err(StoreError::NotAFile {
            path: resolved.original.clone(),
            kind: resolved.kind,
        }
        .into());
    }
    Ok(store.read(&resolved.canonical)?)
}
