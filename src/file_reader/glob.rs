//! file_reader::glob
//!
//! Multi-file reads reconciled across the two stores.

use std::collections::HashSet;

use super::{FileReader, FileReaderError};
use crate::core::glob::PathPattern;
use crate::core::types::ArtifactKind;
use crate::store::BackingStore;

/// Receives each file a glob selects, in discovery order.
pub(super) type OnEach<'f> = dyn FnMut(&str, Vec<u8>) -> Result<(), FileReaderError> + 'f;

impl<C: BackingStore, W: BackingStore> FileReader<'_, C, W> {
    /// Feed every file matching `pattern` to `on_each`.
    ///
    /// In strict mode the commit tree is walked first: each match not served
    /// from the worktree is read with change validation, and every changed
    /// path is collected before failing. The worktree walk then reads
    /// accepted matches and collects the rest as uncommitted, skipping paths
    /// the commit pass already handled.
    pub(super) fn configuration_files_glob(
        &self,
        kind: ArtifactKind,
        pattern: &PathPattern,
        on_each: &mut OnEach<'_>,
    ) -> Result<(), FileReaderError> {
        if self.context.loose_mode_enabled() {
            let matches = self.worktree_resolver().glob(pattern)?;
            tracing::debug!(%pattern, matches = matches.len(), "loose glob over worktree");
            for rel_path in matches {
                let data = self.read_worktree_file(&rel_path)?;
                on_each(&rel_path, data)?;
            }
            return Ok(());
        }

        let mut processed = HashSet::new();
        let mut changed = Vec::new();

        for rel_path in self.commit_resolver().glob(pattern)? {
            if self.reads_from_worktree(kind, &rel_path) {
                continue;
            }
            processed.insert(rel_path.clone());

            match self.read_commit_file(&rel_path) {
                Ok(data) => on_each(&rel_path, data)?,
                Err(FileReaderError::UncommittedFilesChanges { paths }) => changed.extend(paths),
                Err(err) => return Err(err),
            }
        }

        if !changed.is_empty() {
            tracing::debug!(%pattern, count = changed.len(), "glob found changed files");
            return Err(FileReaderError::UncommittedFilesChanges { paths: changed });
        }

        let mut uncommitted = Vec::new();

        for rel_path in self.worktree_resolver().glob(pattern)? {
            if processed.contains(&rel_path) {
                continue;
            }

            if self.reads_from_worktree(kind, &rel_path) {
                processed.insert(rel_path.clone());
                let data = self.read_worktree_file(&rel_path)?;
                on_each(&rel_path, data)?;
            } else {
                uncommitted.push(rel_path);
            }
        }

        if !uncommitted.is_empty() {
            tracing::debug!(%pattern, count = uncommitted.len(), "glob found uncommitted files");
            return Err(FileReaderError::UncommittedFiles { paths: uncommitted });
        }

        tracing::debug!(%pattern, files = processed.len(), "glob finished");
        Ok(())
    }
}
