//! resolver
//!
//! Symlink-safe path resolution within one backing store.
//!
//! # Algorithm
//!
//! A path is walked segment by segment. Each symlink met on the way is
//! replaced by its target (taken relative to the symlink's directory) and
//! resolution continues in the same store. Every followed link counts
//! against a single depth budget shared by the whole resolution, so
//! cycles end in [`ResolveError::TooManyLevelsOfSymbolicLinks`] no matter
//! how deeply they nest.
//!
//! # Invariants
//!
//! - A successful result never lies outside the project root
//! - An absolute link target, or one whose `..` segments climb above the
//!   root, fails with [`ResolveError::PathEscapesProject`]
//! - A malformed entry fails with [`ResolveError::BrokenSymlink`]; it is
//!   never reported as absent
//!
//! # Example
//!
//! ```
//! use giterminism::core::types::BackingStoreKind;
//! use giterminism::resolver::Resolver;
//! use giterminism::store::MemoryStore;
//!
//! let store = MemoryStore::new(BackingStoreKind::Worktree)
//!     .with_file("dir/werf.yaml", "project: demo")
//!     .with_symlink("werf.yaml", "dir/werf.yaml");
//!
//! let resolved = Resolver::new(&store).resolve("werf.yaml").unwrap();
//! assert_eq!(resolved.canonical, "dir/werf.yaml");
//! assert_eq!(resolved.links, vec!["werf.yaml".to_string()]);
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::core::glob::PathPattern;
use crate::core::paths::{self, PathError};
use crate::core::types::{BackingStoreKind, EntryKind, ResolvedPath};
use crate::store::{BackingStore, StoreError};

/// Maximum number of symlinks followed while resolving one path.
pub const MAX_SYMLINK_DEPTH: usize = 1000;

/// Errors from path resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Nothing exists at the path in the store.
    #[error("'{path}' not found in {}", .store.location())]
    NotFound {
        /// The segment path that could not be found
        path: String,
        /// Store that was searched
        store: BackingStoreKind,
    },

    /// An entry on the path is malformed.
    #[error("broken symlink '{path}'")]
    BrokenSymlink {
        /// Path of the malformed entry
        path: String,
    },

    /// A symlink or the requested path leads outside the project.
    #[error("'{path}' is located outside the project directory (target '{target}')")]
    PathEscapesProject {
        /// The symlink (or requested path) that escapes
        path: String,
        /// Where it points
        target: String,
    },

    /// The depth budget was exhausted.
    #[error("too many levels of symbolic links while resolving '{path}'")]
    TooManyLevelsOfSymbolicLinks {
        /// The path being resolved
        path: String,
    },

    /// The backing store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ResolveError {
    /// Whether this error only says the path does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ResolveError::NotFound { .. })
    }
}

/// Resolves paths against a single backing store.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<S> {
    store: S,
}

impl<S: BackingStore> Resolver<S> {
    /// Create a resolver over `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The store this resolver reads.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Resolve `path` to its canonical, symlink-free form.
    pub fn resolve(&self, path: &str) -> Result<ResolvedPath, ResolveError> {
        self.resolve_with(path, |_| Ok(()))
    }

    /// Resolve `path`, then run `validate` on the result before returning.
    ///
    /// An error from `validate` is returned unchanged.
    pub fn resolve_with<E, F>(&self, path: &str, validate: F) -> Result<ResolvedPath, E>
    where
        E: From<ResolveError>,
        F: FnOnce(&ResolvedPath) -> Result<(), E>,
    {
        let original = paths::clean(path).map_err(|err| escape_error(path, err))?;

        let mut depth = 0;
        let mut links = Vec::new();
        let (canonical, kind) = self.walk(&original, &mut depth, &mut links)?;

        tracing::debug!(
            store = %self.store.kind(),
            path = %original,
            canonical = %canonical,
            links = links.len(),
            "resolved path"
        );

        let resolved = ResolvedPath {
            original,
            canonical,
            kind,
            store: self.store.kind(),
            links,
        };

        validate(&resolved)?;
        Ok(resolved)
    }

    /// Walk `path`, following symlinks. `depth` is never reset.
    fn walk(
        &self,
        path: &str,
        depth: &mut usize,
        links: &mut Vec<String>,
    ) -> Result<(String, EntryKind), ResolveError> {
        let segments = paths::split(path);
        let mut prefix = String::new();
        let mut kind = EntryKind::Directory;

        for (idx, segment) in segments.iter().enumerate() {
            let is_last = idx + 1 == segments.len();
            if kind.is_file() {
                // A file cannot have children.
                return Err(self.not_found(&prefix));
            }

            let candidate = paths::join(&prefix, segment);
            match self.store.entry(&candidate)? {
                None => return Err(self.not_found(&candidate)),
                Some(EntryKind::Malformed) => {
                    return Err(ResolveError::BrokenSymlink { path: candidate })
                }
                Some(EntryKind::Symlink) => {
                    *depth += 1;
                    if *depth >= MAX_SYMLINK_DEPTH {
                        return Err(ResolveError::TooManyLevelsOfSymbolicLinks {
                            path: path.to_string(),
                        });
                    }

                    let target = self.link_target(&candidate)?;
                    links.push(candidate);
                    let (resolved, resolved_kind) = self.walk(&target, depth, links)?;
                    prefix = resolved;
                    kind = resolved_kind;
                }
                Some(entry_kind) => {
                    prefix = candidate;
                    kind = entry_kind;
                }
            }

            if is_last {
                break;
            }
        }

        Ok((prefix, kind))
    }

    /// Cleaned target of the symlink at `link`, relative to the root.
    fn link_target(&self, link: &str) -> Result<String, ResolveError> {
        let target = self.store.read_link(link)?;
        if paths::is_absolute(&target) {
            tracing::warn!(link, target = %target, "symlink target is absolute");
            return Err(ResolveError::PathEscapesProject {
                path: link.to_string(),
                target,
            });
        }

        let joined = paths::join(paths::parent(link), &target);
        paths::clean(&joined).map_err(|_| {
            tracing::warn!(link, target = %target, "symlink leads outside the project directory");
            ResolveError::PathEscapesProject {
                path: link.to_string(),
                target,
            }
        })
    }

    fn not_found(&self, path: &str) -> ResolveError {
        ResolveError::NotFound {
            path: path.to_string(),
            store: self.store.kind(),
        }
    }

    /// Unresolved paths of every file matching `pattern`.
    ///
    /// Symlinks to directories are walked as if they were the directory;
    /// a link back to a directory already being walked is skipped. Paths are
    /// reported as reached, not canonicalized, in a stable order.
    pub fn glob(&self, pattern: &PathPattern) -> Result<Vec<String>, ResolveError> {
        let base = match self.resolve(pattern.base()) {
            Ok(resolved) if resolved.kind.is_directory_like() => resolved,
            Ok(_) => return Ok(Vec::new()),
            Err(ResolveError::NotFound { .. }) => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };

        let mut matches = Vec::new();
        let mut seen = HashSet::new();
        let mut walking = vec![base.canonical.clone()];
        self.collect(
            pattern,
            &base.canonical,
            pattern.base(),
            &mut walking,
            &mut seen,
            &mut matches,
        )?;

        tracing::debug!(
            store = %self.store.kind(),
            pattern = %pattern,
            matches = matches.len(),
            "glob walk finished"
        );
        Ok(matches)
    }

    fn collect(
        &self,
        pattern: &PathPattern,
        dir: &str,
        shown_dir: &str,
        walking: &mut Vec<String>,
        seen: &mut HashSet<String>,
        out: &mut Vec<String>,
    ) -> Result<(), ResolveError> {
        for entry in self.store.list_recursive(dir)? {
            let rel = paths::strip_dir(dir, &entry.path).unwrap_or(entry.path.as_str());
            let shown = paths::join(shown_dir, rel);

            match entry.kind {
                EntryKind::Symlink => {
                    let resolved = match self.resolve(&entry.path) {
                        Ok(resolved) => resolved,
                        Err(ResolveError::NotFound { .. }) => {
                            tracing::debug!(path = %shown, "skipping dangling symlink");
                            continue;
                        }
                        Err(err @ ResolveError::PathEscapesProject { .. }) => {
                            if pattern.matches(&shown) {
                                return Err(err);
                            }
                            tracing::warn!(path = %shown, "skipping symlink outside the project directory");
                            continue;
                        }
                        Err(err) => return Err(err),
                    };

                    if resolved.kind.is_file() {
                        push_match(pattern, shown, seen, out);
                    } else if resolved.kind.is_directory_like() {
                        if walking
                            .iter()
                            .any(|active| paths::is_within(&resolved.canonical, active))
                        {
                            tracing::debug!(path = %shown, "skipping symlink cycle");
                            continue;
                        }

                        walking.push(resolved.canonical.clone());
                        let result =
                            self.collect(pattern, &resolved.canonical, &shown, walking, seen, out);
                        walking.pop();
                        result?;
                    }
                }
                EntryKind::Malformed if pattern.matches(&shown) => {
                    return Err(ResolveError::BrokenSymlink { path: shown });
                }
                kind if kind.is_file() => push_match(pattern, shown, seen, out),
                _ => {}
            }
        }

        Ok(())
    }
}

fn push_match(
    pattern: &PathPattern,
    path: String,
    seen: &mut HashSet<String>,
    out: &mut Vec<String>,
) {
    if pattern.matches(&path) && seen.insert(path.clone()) {
        out.push(path);
    }
}

fn escape_error(path: &str, err: PathError) -> ResolveError {
    tracing::warn!(path, error = %err, "requested path is outside the project directory");
    ResolveError::PathEscapesProject {
        path: path.to_string(),
        target: path.to_string(),
    }
}
