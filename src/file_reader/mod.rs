//! file_reader
//!
//! The configuration file access orchestrator.
//!
//! # Architecture
//!
//! Every configuration consumer reads through [`FileReader`]. A request is
//! answered in one of two ways:
//!
//! - **Worktree**: the run is loose, the policy accepts the path for the
//!   requested [`ArtifactKind`], or the path lies inside an uninitialized
//!   submodule. The file is resolved and read in the project directory.
//! - **Commit**: otherwise. The file is resolved in the head commit, and the
//!   resolution is validated against the worktree: any divergence along the
//!   resolved chain is an uncommitted change.
//!
//! Glob requests walk both stores and reconcile the two listings, collecting
//! every offending path before failing.
//!
//! # Example
//!
//! ```
//! use std::path::PathBuf;
//! use giterminism::core::types::{ArtifactKind, BackingStoreKind, CommitId};
//! use giterminism::file_reader::FileReader;
//! use giterminism::manager::RunContext;
//! use giterminism::policy::DenyAll;
//! use giterminism::store::MemoryStore;
//!
//! let context = RunContext::new(
//!     PathBuf::from("/project"),
//!     CommitId::new("a".repeat(40)).unwrap(),
//!     false,
//!     Vec::new(),
//! );
//! let commit = MemoryStore::new(BackingStoreKind::CommitTree).with_file("werf.yaml", "A");
//! let worktree = MemoryStore::new(BackingStoreKind::Worktree);
//!
//! let reader = FileReader::new(&context, &commit, &worktree, &DenyAll);
//! assert_eq!(reader.read_file(ArtifactKind::Config, "werf.yaml").unwrap(), b"A");
//! ```

mod artifacts;
mod checks;
mod errors;
mod glob;

pub use artifacts::{LoadedFile, DEFAULT_TEMPLATES_DIR, WERF_CONFIG_NAMES};
pub use errors::FileReaderError;

use crate::change::ChangeDetector;
use crate::core::glob::PathPattern;
use crate::core::types::ArtifactKind;
use crate::manager::RunContext;
use crate::policy::AcceptancePolicy;
use crate::resolver::Resolver;
use crate::store::BackingStore;

/// Reads configuration files under giterminism rules.
pub struct FileReader<'a, C, W> {
    context: &'a RunContext,
    commit_tree: C,
    worktree: W,
    policy: &'a dyn AcceptancePolicy,
}

impl<C, W> std::fmt::Debug for FileReader<'_, C, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileReader")
            .field("context", self.context)
            .finish()
    }
}

impl<'a, C: BackingStore, W: BackingStore> FileReader<'a, C, W> {
    /// Create a reader over the two stores of a run.
    pub fn new(
        context: &'a RunContext,
        commit_tree: C,
        worktree: W,
        policy: &'a dyn AcceptancePolicy,
    ) -> Self {
        Self {
            context,
            commit_tree,
            worktree,
            policy,
        }
    }

    /// The run this reader serves.
    pub fn context(&self) -> &RunContext {
        self.context
    }

    // =========================================================================
    // Public surface
    // =========================================================================

    /// Whether `rel_path` exists as a file in the store the request would be
    /// served from.
    pub fn exists(&self, kind: ArtifactKind, rel_path: &str) -> Result<bool, FileReaderError> {
        self.file_exists(kind, rel_path)
            .map_err(|err| err.context("unable to check file existence", rel_path))
    }

    fn file_exists(
        &self,
        kind: ArtifactKind,
        rel_path: &str,
    ) -> Result<bool, FileReaderError> {
        if self.reads_from_worktree(kind, rel_path) {
            self.is_worktree_file_exist(rel_path)
        } else {
            self.is_commit_file_exist(rel_path)
        }
    }

    /// Content of `rel_path`, checked against policy and the head commit.
    ///
    /// # Errors
    ///
    /// - [`FileReaderError::NotFoundInProjectRepository`] or
    ///   [`FileReaderError::NotFoundInProjectDirectory`] if the file is absent
    ///   from the store consulted
    /// - [`FileReaderError::UncommittedFiles`] if the file (or a symlink
    ///   leading to it) exists only in the worktree
    /// - [`FileReaderError::UncommittedFilesChanges`] if the committed file
    ///   differs from the worktree
    ///
    /// The failure is wrapped in [`FileReaderError::Context`]; use
    /// [`FileReaderError::root`] to reach the cause.
    pub fn read_file(&self, kind: ArtifactKind, rel_path: &str) -> Result<Vec<u8>, FileReaderError> {
        self.read_checked(kind, rel_path)
            .map_err(|err| err.context("unable to read file", rel_path))
    }

    fn read_checked(
        &self,
        kind: ArtifactKind,
        rel_path: &str,
    ) -> Result<Vec<u8>, FileReaderError> {
        self.check_configuration_file_existence(kind, rel_path)?;
        self.check_and_read_configuration_file(kind, rel_path)
    }

    /// Content of every file matching `pattern`, keyed by forward-slash
    /// relative path, in discovery order.
    pub fn glob(
        &self,
        kind: ArtifactKind,
        pattern: &str,
    ) -> Result<Vec<(String, Vec<u8>)>, FileReaderError> {
        self.glob_files(kind, pattern)
            .map_err(|err| err.context("unable to glob files", pattern))
    }

    fn glob_files(
        &self,
        kind: ArtifactKind,
        pattern: &str,
    ) -> Result<Vec<(String, Vec<u8>)>, FileReaderError> {
        let pattern = PathPattern::new(pattern)?;
        let mut files = Vec::new();
        self.configuration_files_glob(kind, &pattern, &mut |rel_path, data| {
            files.push((rel_path.to_string(), data));
            Ok(())
        })?;
        Ok(files)
    }

    /// Every file beneath `rel_dir`, named relative to the directory.
    ///
    /// The directory itself is resolved through symlinks first.
    pub fn load_directory_tree(
        &self,
        kind: ArtifactKind,
        rel_dir: &str,
    ) -> Result<Vec<LoadedFile>, FileReaderError> {
        self.directory_tree(kind, rel_dir)
            .map_err(|err| err.context("unable to load directory", rel_dir))
    }

    fn directory_tree(
        &self,
        kind: ArtifactKind,
        rel_dir: &str,
    ) -> Result<Vec<LoadedFile>, FileReaderError> {
        if !self.is_configuration_directory_exist_anywhere(rel_dir)? {
            if self.is_configuration_file_exist_anywhere(rel_dir)? {
                return Err(FileReaderError::NotADirectory {
                    path: rel_dir.to_string(),
                });
            }
            return Err(FileReaderError::DirectoryNotFound {
                path: rel_dir.to_string(),
            });
        }

        let dir = self.resolve_directory(rel_dir)?;
        let pattern = PathPattern::new(&crate::core::paths::join(
            &globset::escape(&dir),
            "**/*",
        ))?;

        let mut files = Vec::new();
        self.configuration_files_glob(kind, &pattern, &mut |rel_path, data| {
            let name = crate::core::paths::strip_dir(&dir, rel_path).unwrap_or(rel_path);
            files.push(LoadedFile {
                name: name.to_string(),
                data,
            });
            Ok(())
        })?;
        Ok(files)
    }

    /// Whether policy lets `rel_path` be read uncommitted as `kind`.
    pub fn is_path_accepted(&self, kind: ArtifactKind, rel_path: &str) -> bool {
        self.policy.is_path_accepted(kind, rel_path)
    }

    // =========================================================================
    // Shared helpers
    // =========================================================================

    /// Requests for `rel_path` as `kind` are served from the worktree.
    fn reads_from_worktree(&self, kind: ArtifactKind, rel_path: &str) -> bool {
        self.context.loose_mode_enabled()
            || self.policy.is_path_accepted(kind, rel_path)
            || self.context.is_under_uninitialized_submodule(rel_path)
    }

    fn commit_resolver(&self) -> Resolver<&C> {
        Resolver::new(&self.commit_tree)
    }

    fn worktree_resolver(&self) -> Resolver<&W> {
        Resolver::new(&self.worktree)
    }

    fn detector(&self) -> ChangeDetector<'_, C, W> {
        ChangeDetector::new(&self.commit_tree, &self.worktree, self.context)
    }
}

