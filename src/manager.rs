//! manager
//!
//! The composition root.
//!
//! A [`Manager`] is built once per run. It fixes the head commit, discovers
//! uninitialized submodules, loads the giterminism policy through a
//! deny-all file reader, and then hands out readers and inspectors bound to
//! that policy. Nothing in a run is mutable after construction.
//!
//! # Example
//!
//! ```no_run
//! use giterminism::manager::{Manager, ManagerOptions};
//! use std::path::Path;
//!
//! let manager = Manager::open(Path::new("."), ManagerOptions::from_env())?;
//! let config = manager.file_reader().read_config(None)?;
//! manager.inspector().inspect_config_stapel_from_latest()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::config::{ConfigError, GiterminismConfig};
use crate::core::paths::{self, WorktreeCachePaths};
use crate::core::types::CommitId;
use crate::file_reader::{FileReader, FileReaderError};
use crate::git::{Git, GitError, RepositoryHandle, WorktreeCache};
use crate::policy::{DenyAll, Inspector};
use crate::store::{CommitTree, Worktree};

/// Environment variable that turns on loose mode.
pub const LOOSE_ENV: &str = "GITERMINISM_LOOSE";

/// Errors from building a run.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    FileReader(#[from] FileReaderError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no cache directory available for the worktree cache")]
    NoCacheDir,
}

/// Options for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManagerOptions {
    /// Read everything from the worktree and skip all checks.
    pub loose_giterminism: bool,
}

impl ManagerOptions {
    /// Options from the environment: loose mode when [`LOOSE_ENV`] is `1` or
    /// `true`.
    pub fn from_env() -> Self {
        let loose_giterminism = std::env::var(LOOSE_ENV)
            .map(|value| is_truthy(&value))
            .unwrap_or(false);
        Self { loose_giterminism }
    }
}

fn is_truthy(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

/// Immutable facts about a run, shared by every component.
#[derive(Debug, Clone)]
pub struct RunContext {
    project_root: PathBuf,
    head_commit: CommitId,
    loose: bool,
    uninitialized_submodules: Vec<String>,
}

impl RunContext {
    pub fn new(
        project_root: PathBuf,
        head_commit: CommitId,
        loose: bool,
        uninitialized_submodules: Vec<String>,
    ) -> Self {
        Self {
            project_root,
            head_commit,
            loose,
            uninitialized_submodules,
        }
    }

    /// Absolute path of the project directory.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// The commit every committed-state comparison is made against.
    pub fn head_commit(&self) -> &CommitId {
        &self.head_commit
    }

    pub fn loose_mode_enabled(&self) -> bool {
        self.loose
    }

    /// Whether `rel_path` is, or lies beneath, an uninitialized submodule.
    pub fn is_under_uninitialized_submodule(&self, rel_path: &str) -> bool {
        self.uninitialized_submodules
            .iter()
            .any(|submodule| paths::is_within(submodule, rel_path))
    }

    pub fn uninitialized_submodules(&self) -> &[String] {
        &self.uninitialized_submodules
    }
}

/// Entry point for one run.
pub struct Manager<H = Git> {
    handle: H,
    context: RunContext,
    worktree: Worktree,
    config: GiterminismConfig,
}

impl<H> std::fmt::Debug for Manager<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Manager")
            .field("context", &self.context)
            .field("config", &self.config)
            .finish()
    }
}

impl Manager<Git> {
    /// Open the repository containing `path` and pin its `HEAD`.
    ///
    /// The project root is the repository's working directory.
    pub fn open(path: &Path, options: ManagerOptions) -> Result<Self, ManagerError> {
        let git = Git::open(path)?;
        let head = git.head_commit()?;
        let project_root = git.work_dir().to_path_buf();
        Self::new(git, project_root, head, options)
    }

    /// Cache of checked-out commits for this repository.
    pub fn worktree_cache(&self) -> Result<WorktreeCache<'_>, ManagerError> {
        let paths = WorktreeCachePaths::for_project(self.context.project_root())
            .ok_or(ManagerError::NoCacheDir)?;
        Ok(WorktreeCache::new(&self.handle, paths))
    }
}

impl<H: RepositoryHandle> Manager<H> {
    /// Build a run over `handle` with the worktree at `project_root`.
    ///
    /// # Errors
    ///
    /// - [`ManagerError::FileReader`] if the policy file is uncommitted or
    ///   has uncommitted changes
    /// - [`ManagerError::Config`] if the policy file is invalid
    pub fn new(
        handle: H,
        project_root: PathBuf,
        head_commit: CommitId,
        options: ManagerOptions,
    ) -> Result<Self, ManagerError> {
        let uninitialized_submodules = handle.uninitialized_submodules()?;
        let context = RunContext::new(
            project_root.clone(),
            head_commit,
            options.loose_giterminism,
            uninitialized_submodules,
        );
        let worktree = Worktree::new(project_root);

        let data = FileReader::new(
            &context,
            CommitTree::new(&handle, context.head_commit().clone()),
            &worktree,
            &DenyAll,
        )
        .read_giterminism_config()?;

        let config = match data {
            Some(data) => GiterminismConfig::parse(&data)?,
            None => GiterminismConfig::deny_all(),
        };

        if context.loose_mode_enabled() {
            tracing::info!(
                project = %context.project_root().display(),
                "loose giterminism mode enabled, reading configuration from the working directory"
            );
        }
        tracing::debug!(
            commit = %context.head_commit().short(7),
            submodules = context.uninitialized_submodules().len(),
            "giterminism manager ready"
        );

        Ok(Self {
            handle,
            context,
            worktree,
            config,
        })
    }

    /// A file reader bound to the loaded policy.
    pub fn file_reader(&self) -> FileReader<'_, CommitTree<'_>, &Worktree> {
        FileReader::new(
            &self.context,
            CommitTree::new(&self.handle, self.context.head_commit().clone()),
            &self.worktree,
            &self.config,
        )
    }

    /// An inspector bound to the loaded policy.
    pub fn inspector(&self) -> Inspector<'_> {
        Inspector::new(&self.config, self.context.loose_mode_enabled())
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }

    pub fn config(&self) -> &GiterminismConfig {
        &self.config
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }
}
