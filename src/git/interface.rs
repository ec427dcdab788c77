//! git::interface
//!
//! Git interface implementation using git2.
//!
//! This module provides the **single doorway** to the git object store. All
//! commit-tree reads flow through the [`RepositoryHandle`] capability trait,
//! which normalizes `git2` failures into typed [`GitError`] categories.
//!
//! # Architecture
//!
//! The `Git` struct is the only type that touches `git2`. The rest of the
//! crate depends on [`RepositoryHandle`], so the commit-tree accessor can be
//! driven by any object store that answers the same questions.
//!
//! Tree lookups classify entries purely from tree metadata (file modes).
//! Lookups that cross a gitlink continue inside the submodule's own
//! repository when it is checked out; an uninitialized submodule ends the
//! lookup as "not found".
//!
//! # Example
//!
//! ```ignore
//! use giterminism::git::{Git, RepositoryHandle};
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."))?;
//! let head = git.head_commit()?;
//! let kind = git.entry(&head, "werf.yaml")?;
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::paths;
use crate::core::types::{CommitId, EntryKind, TreeEntry, TypeError};

/// Errors from Git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Not inside a Git repository.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was searched
        path: PathBuf,
    },

    /// Repository is bare (no working directory).
    #[error("bare repository not supported")]
    BareRepo,

    /// Requested ref does not exist.
    #[error("ref not found: {refname}")]
    RefNotFound {
        /// The ref that was not found
        refname: String,
    },

    /// Object not found in repository.
    #[error("object not found: {oid}")]
    ObjectNotFound {
        /// The OID that was not found
        oid: String,
    },

    /// Invalid object id format.
    #[error("invalid object id: {oid}")]
    InvalidOid {
        /// The invalid OID string
        oid: String,
    },

    /// No tree entry at the path in the commit.
    #[error("entry '{path}' not found in commit {commit}")]
    EntryNotFound {
        /// The commit searched
        commit: String,
        /// The path that was not found
        path: String,
    },

    /// Content requested for an entry that has no blob.
    #[error("entry '{path}' is a {kind}, not a file")]
    NotABlob {
        /// The path of the entry
        path: String,
        /// What the entry actually is
        kind: EntryKind,
    },

    /// Symlink target is not valid UTF-8.
    #[error("symlink target is not valid UTF-8: {path}")]
    InvalidUtf8 {
        /// The path of the symlink
        path: String,
    },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl GitError {
    /// Create a GitError from a git2::Error with richer context.
    fn from_git2(err: git2::Error, context: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound => {
                if context.starts_with("refs/") || context == "HEAD" {
                    GitError::RefNotFound {
                        refname: context.to_string(),
                    }
                } else {
                    GitError::ObjectNotFound {
                        oid: context.to_string(),
                    }
                }
            }
            git2::ErrorCode::InvalidSpec => GitError::InvalidOid {
                oid: context.to_string(),
            },
            _ => GitError::Internal {
                message: format!("{}: {}", context, err.message()),
            },
        }
    }
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        GitError::Internal {
            message: err.message().to_string(),
        }
    }
}

impl From<TypeError> for GitError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::InvalidCommitId(msg) => GitError::InvalidOid { oid: msg },
        }
    }
}

/// Lazily enumerated tracked entries.
pub type TrackedEntries<'a> = Box<dyn Iterator<Item = Result<TreeEntry, GitError>> + 'a>;

/// Capability interface over a git object store.
///
/// All lookups take an explicit commit; the handle never re-resolves `HEAD`
/// on its own.
pub trait RepositoryHandle {
    /// Classify the tree entry at `path`, or `None` if the commit has none.
    ///
    /// Intermediate segments are not resolved through symlinks; the empty
    /// path denotes the root tree.
    fn entry(&self, commit: &CommitId, path: &str) -> Result<Option<EntryKind>, GitError>;

    /// Blob content of the entry at `path`.
    ///
    /// # Errors
    ///
    /// - [`GitError::EntryNotFound`] if there is no such entry
    /// - [`GitError::NotABlob`] for directories and submodules
    fn content(&self, commit: &CommitId, path: &str) -> Result<Vec<u8>, GitError>;

    /// Every tracked non-directory entry beneath `prefix`, depth first.
    ///
    /// The sequence is finite and lazy. Calling again starts a new pass.
    /// A prefix that is not a directory yields nothing.
    fn list_tracked<'a>(
        &'a self,
        commit: &CommitId,
        prefix: &str,
    ) -> Result<TrackedEntries<'a>, GitError>;

    /// Paths of submodules declared by the repository that have no
    /// checked-out worktree.
    fn uninitialized_submodules(&self) -> Result<Vec<String>, GitError>;
}

/// The Git interface.
///
/// This is the **single point of interaction** with Git. No other module
/// imports `git2`.
pub struct Git {
    /// The underlying git2 repository
    repo: git2::Repository,
    /// Working directory of the repository
    work_dir: PathBuf,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.repo.path())
            .finish()
    }
}

/// A repository that is either the main one or an opened submodule.
enum RepoRef<'a> {
    Borrowed(&'a git2::Repository),
    Owned(git2::Repository),
}

impl RepoRef<'_> {
    fn get(&self) -> &git2::Repository {
        match self {
            RepoRef::Borrowed(repo) => repo,
            RepoRef::Owned(repo) => repo,
        }
    }
}

/// A located tree entry together with the repository holding its object.
struct Located<'a> {
    repo: RepoRef<'a>,
    entry: Option<(EntryKind, git2::Oid)>,
}

const TREE_MODE: u32 = 0o040000;

impl Git {
    // =========================================================================
    // Repository Opening and Info
    // =========================================================================

    /// Open a repository at the given path.
    ///
    /// Uses `git2::Repository::discover`, so `path` can be any directory
    /// within the repository.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if no repository is found
    /// - [`GitError::BareRepo`] if the repository has no working directory
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::discover(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;

        let work_dir = repo.workdir().ok_or(GitError::BareRepo)?.to_path_buf();

        Ok(Self { repo, work_dir })
    }

    /// Working directory of the repository.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    // =========================================================================
    // Commit Resolution
    // =========================================================================

    /// Get the HEAD commit id.
    ///
    /// # Errors
    ///
    /// - [`GitError::RefNotFound`] if HEAD is unborn (new repository)
    pub fn head_commit(&self) -> Result<CommitId, GitError> {
        let head = self
            .repo
            .head()
            .map_err(|e| GitError::from_git2(e, "HEAD"))?;

        let oid = head
            .peel_to_commit()
            .map_err(|e| GitError::from_git2(e, "HEAD"))?
            .id();

        Ok(CommitId::new(oid.to_string())?)
    }

    /// Resolve a revision (ref name, short or full id) to a commit id.
    pub fn resolve_commit(&self, revision: &str) -> Result<CommitId, GitError> {
        let object = self
            .repo
            .revparse_single(revision)
            .map_err(|e| GitError::from_git2(e, revision))?;

        let commit = object
            .peel_to_commit()
            .map_err(|e| GitError::from_git2(e, revision))?;

        Ok(CommitId::new(commit.id().to_string())?)
    }

    // =========================================================================
    // Tree Lookups
    // =========================================================================

    fn commit_tree_id(repo: &git2::Repository, commit: &CommitId) -> Result<git2::Oid, GitError> {
        let oid = git2::Oid::from_str(commit.as_str())
            .map_err(|e| GitError::from_git2(e, commit.as_str()))?;

        let commit = repo
            .find_commit(oid)
            .map_err(|e| GitError::from_git2(e, &oid.to_string()))?;

        Ok(commit.tree_id())
    }

    fn child(
        repo: &git2::Repository,
        tree_id: git2::Oid,
        name: &str,
    ) -> Result<Option<(EntryKind, git2::Oid)>, GitError> {
        let tree = repo
            .find_tree(tree_id)
            .map_err(|e| GitError::from_git2(e, &tree_id.to_string()))?;

        Ok(tree
            .get_name(name)
            .map(|e| (EntryKind::from_git_mode(e.filemode_raw() as u32), e.id())))
    }

    /// Open the checked-out repository of a submodule at the gitlink commit.
    ///
    /// Returns `None` when the submodule has no worktree or the gitlink
    /// commit is not present in it.
    fn open_submodule(
        &self,
        rel_path: &str,
        gitlink: git2::Oid,
    ) -> Result<Option<(git2::Repository, git2::Oid)>, GitError> {
        let dir = paths::to_absolute(&self.work_dir, rel_path);
        let repo = match git2::Repository::open(&dir) {
            Ok(repo) => repo,
            Err(_) => return Ok(None),
        };

        let tree_id = match repo.find_commit(gitlink) {
            Ok(commit) => commit.tree_id(),
            Err(_) => return Ok(None),
        };

        Ok(Some((repo, tree_id)))
    }

    /// Walk `path` segment by segment, crossing into submodules.
    fn locate(&self, commit: &CommitId, path: &str) -> Result<Located<'_>, GitError> {
        let mut repo = RepoRef::Borrowed(&self.repo);
        let mut tree_id = Self::commit_tree_id(&self.repo, commit)?;

        let segments = paths::split(path);
        let Some((last, parents)) = segments.split_last() else {
            return Ok(Located {
                repo,
                entry: Some((EntryKind::from_git_mode(TREE_MODE), tree_id)),
            });
        };

        for (idx, segment) in parents.iter().enumerate() {
            let found = Self::child(repo.get(), tree_id, segment)?;
            match found {
                Some((EntryKind::Directory, id)) => tree_id = id,
                Some((EntryKind::Submodule, id)) => {
                    let sub_path = segments[..=idx].join("/");
                    match self.open_submodule(&sub_path, id)? {
                        Some((sub_repo, sub_tree)) => {
                            repo = RepoRef::Owned(sub_repo);
                            tree_id = sub_tree;
                        }
                        None => return Ok(Located { repo, entry: None }),
                    }
                }
                _ => return Ok(Located { repo, entry: None }),
            }
        }

        let entry = Self::child(repo.get(), tree_id, last)?;
        Ok(Located { repo, entry })
    }

    // =========================================================================
    // Submodules
    // =========================================================================

    fn submodule_paths(&self) -> Result<Vec<(String, String)>, GitError> {
        let submodules = self.repo.submodules().map_err(|e| GitError::Internal {
            message: format!("unable to list submodules: {}", e.message()),
        })?;

        Ok(submodules
            .iter()
            .filter_map(|sm| {
                let name = sm.name()?.to_string();
                let path = paths::to_slash(&sm.path().to_string_lossy());
                Some((name, path))
            })
            .collect())
    }

    // =========================================================================
    // Worktree Materialization
    // =========================================================================

    /// Check out the tree of `commit` into `target_dir` without touching the
    /// repository's own index or worktree.
    pub fn checkout_tree_to(&self, commit: &CommitId, target_dir: &Path) -> Result<(), GitError> {
        let tree_id = Self::commit_tree_id(&self.repo, commit)?;
        let tree = self
            .repo
            .find_tree(tree_id)
            .map_err(|e| GitError::from_git2(e, &tree_id.to_string()))?;

        let mut builder = git2::build::CheckoutBuilder::new();
        builder.target_dir(target_dir).force().update_index(false);

        self.repo
            .checkout_tree(tree.as_object(), Some(&mut builder))
            .map_err(|e| GitError::Internal {
                message: format!("checkout of {} failed: {}", commit.short(7), e.message()),
            })
    }
}

impl RepositoryHandle for Git {
    fn entry(&self, commit: &CommitId, path: &str) -> Result<Option<EntryKind>, GitError> {
        Ok(self.locate(commit, path)?.entry.map(|(kind, _)| kind))
    }

    fn content(&self, commit: &CommitId, path: &str) -> Result<Vec<u8>, GitError> {
        let located = self.locate(commit, path)?;
        let (kind, id) = located.entry.ok_or_else(|| GitError::EntryNotFound {
            commit: commit.to_string(),
            path: path.to_string(),
        })?;

        if kind.is_directory_like() {
            return Err(GitError::NotABlob {
                path: path.to_string(),
                kind,
            });
        }

        let blob = located
            .repo
            .get()
            .find_blob(id)
            .map_err(|e| GitError::from_git2(e, &id.to_string()))?;

        Ok(blob.content().to_vec())
    }

    fn list_tracked<'a>(
        &'a self,
        commit: &CommitId,
        prefix: &str,
    ) -> Result<TrackedEntries<'a>, GitError> {
        let located = self.locate(commit, prefix)?;
        let tree_id = match located.entry {
            Some((EntryKind::Directory, id)) => id,
            Some((EntryKind::Submodule, id)) => match self.open_submodule(prefix, id)? {
                Some((sub_repo, sub_tree)) => {
                    let mut walk = TreeWalk::new(RepoRef::Owned(sub_repo));
                    walk.push(prefix.to_string(), sub_tree)?;
                    return Ok(Box::new(walk));
                }
                None => return Ok(Box::new(std::iter::empty())),
            },
            _ => return Ok(Box::new(std::iter::empty())),
        };

        let mut walk = TreeWalk::new(located.repo);
        walk.push(prefix.to_string(), tree_id)?;
        Ok(Box::new(walk))
    }

    fn uninitialized_submodules(&self) -> Result<Vec<String>, GitError> {
        let mut result = Vec::new();
        for (name, path) in self.submodule_paths()? {
            let status = self
                .repo
                .submodule_status(&name, git2::SubmoduleIgnore::None)
                .map_err(|e| GitError::Internal {
                    message: format!("unable to get status of submodule {}: {}", name, e.message()),
                })?;

            if status.contains(git2::SubmoduleStatus::WD_UNINITIALIZED)
                || !status.contains(git2::SubmoduleStatus::IN_WD)
            {
                result.push(path);
            }
        }

        Ok(result)
    }
}

/// Depth-first walk over a tree, one directory level read at a time.
struct TreeWalk<'a> {
    repo: RepoRef<'a>,
    stack: Vec<(String, std::vec::IntoIter<(String, u32, git2::Oid)>)>,
}

impl<'a> TreeWalk<'a> {
    fn new(repo: RepoRef<'a>) -> Self {
        Self {
            repo,
            stack: Vec::new(),
        }
    }

    fn push(&mut self, dir: String, tree_id: git2::Oid) -> Result<(), GitError> {
        let tree = self
            .repo
            .get()
            .find_tree(tree_id)
            .map_err(|e| GitError::from_git2(e, &tree_id.to_string()))?;

        let mut children = Vec::with_capacity(tree.len());
        for entry in tree.iter() {
            // Skip entries with non-UTF8 names
            let Some(name) = entry.name() else { continue };
            children.push((name.to_string(), entry.filemode_raw() as u32, entry.id()));
        }

        self.stack.push((dir, children.into_iter()));
        Ok(())
    }
}

impl Iterator for TreeWalk<'_> {
    type Item = Result<TreeEntry, GitError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (dir, children) = self.stack.last_mut()?;
            let Some((name, mode, id)) = children.next() else {
                self.stack.pop();
                continue;
            };

            let path = paths::join(dir, &name);
            let kind = EntryKind::from_git_mode(mode);
            if kind == EntryKind::Directory {
                if let Err(e) = self.push(path, id) {
                    return Some(Err(e));
                }
                continue;
            }

            return Some(Ok(TreeEntry::new(path, kind)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod git_error {
        use super::*;

        #[test]
        fn error_display_formatting() {
            let err = GitError::EntryNotFound {
                commit: "abc".to_string(),
                path: "werf.yaml".to_string(),
            };
            assert!(err.to_string().contains("werf.yaml"));
            assert!(err.to_string().contains("abc"));

            let err = GitError::NotABlob {
                path: "dir".to_string(),
                kind: EntryKind::Directory,
            };
            assert_eq!(err.to_string(), "entry 'dir' is a directory, not a file");
        }

        #[test]
        fn type_error_maps_to_invalid_oid() {
            let err: GitError = TypeError::InvalidCommitId("bad".into()).into();
            assert!(matches!(err, GitError::InvalidOid { .. }));
        }

        #[test]
        fn head_context_maps_to_ref_not_found() {
            let err = GitError::from_git2(
                git2::Error::new(
                    git2::ErrorCode::NotFound,
                    git2::ErrorClass::Reference,
                    "missing",
                ),
                "HEAD",
            );
            assert!(matches!(err, GitError::RefNotFound { .. }));
        }
    }

    #[test]
    fn open_non_repository_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let git = Git::open(dir.path());
        assert!(matches!(git, Err(GitError::NotARepo { .. })));
    }
}
