//! change
//!
//! Worktree change detection against the head commit.
//!
//! A worktree file equal to its committed blob once `\r\n` is rewritten to
//! `\n` counts as unmodified; that rewrite is applied to the worktree side
//! only, exactly once. Symlinks compare by target text. Paths under an
//! uninitialized submodule are never reported as modified.

use crate::core::types::{ChangeVerdict, EntryKind, ResolvedPath};
use crate::manager::RunContext;
use crate::store::{BackingStore, StoreError};

/// Compares worktree entries with their commit-tree counterparts.
#[derive(Debug)]
pub struct ChangeDetector<'a, C, W> {
    commit_tree: &'a C,
    worktree: &'a W,
    context: &'a RunContext,
}

impl<'a, C: BackingStore, W: BackingStore> ChangeDetector<'a, C, W> {
    /// Create a detector over the two stores of a run.
    pub fn new(commit_tree: &'a C, worktree: &'a W, context: &'a RunContext) -> Self {
        Self {
            commit_tree,
            worktree,
            context,
        }
    }

    /// Compare the entry at `path` in both stores, without following
    /// symlinks.
    pub fn verdict(&self, path: &str) -> Result<ChangeVerdict, StoreError> {
        if self.context.is_under_uninitialized_submodule(path) {
            return Ok(ChangeVerdict::Unmodified);
        }

        let committed = self.commit_tree.entry(path)?;
        let local = self.worktree.entry(path)?;

        let verdict = match (committed, local) {
            (None, None) => ChangeVerdict::Unmodified,
            (None, Some(_)) => ChangeVerdict::Untracked,
            (Some(_), None) => ChangeVerdict::MissingFromWorktree,
            (Some(c), Some(_)) if c.is_directory_like() => ChangeVerdict::Unmodified,
            (Some(EntryKind::Symlink), Some(EntryKind::Symlink)) => {
                let committed = self.commit_tree.read_link(path)?;
                let local = self.worktree.read_link(path)?;
                if committed == local {
                    ChangeVerdict::Unmodified
                } else {
                    ChangeVerdict::Modified
                }
            }
            (Some(c), Some(l)) if c.is_file() && l.is_file() => {
                let committed = self.commit_tree.read(path)?;
                let local = self.worktree.read(path)?;
                if content_matches(&committed, &local) {
                    ChangeVerdict::Unmodified
                } else {
                    ChangeVerdict::Modified
                }
            }
            _ => ChangeVerdict::Modified,
        };

        tracing::debug!(path, ?verdict, "compared worktree with commit");
        Ok(verdict)
    }

    /// Whether worktree content diverges anywhere along a commit-tree
    /// resolution: any traversed symlink or the canonical entry.
    pub fn is_modified(&self, resolved: &ResolvedPath) -> Result<bool, StoreError> {
        if self.context.is_under_uninitialized_submodule(&resolved.original) {
            return Ok(false);
        }

        for path in resolved.chain() {
            if self.verdict(path)?.is_modified() {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

fn content_matches(committed: &[u8], local: &[u8]) -> bool {
    committed == local || normalize_line_endings(local) == committed
}

/// Rewrite every `\r\n` to `\n`.
pub fn normalize_line_endings(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut iter = data.iter().peekable();
    while let Some(&byte) = iter.next() {
        if byte == b'\r' && iter.peek() == Some(&&b'\n') {
            continue;
        }
        out.push(byte);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{BackingStoreKind, CommitId};
    use crate::resolver::Resolver;
    use crate::store::MemoryStore;
    use std::path::PathBuf;

    fn context(uninitialized: &[&str]) -> RunContext {
        RunContext::new(
            PathBuf::from("/project"),
            CommitId::new("a".repeat(40)).unwrap(),
            false,
            uninitialized.iter().map(|s| s.to_string()).collect(),
        )
    }

    fn commit() -> MemoryStore {
        MemoryStore::new(BackingStoreKind::CommitTree)
    }

    fn worktree() -> MemoryStore {
        MemoryStore::new(BackingStoreKind::Worktree)
    }

    mod line_endings {
        use super::*;

        #[test]
        fn crlf_becomes_lf() {
            assert_eq!(normalize_line_endings(b"a\r\nb\r\n"), b"a\nb\n");
        }

        #[test]
        fn lone_cr_is_kept() {
            assert_eq!(normalize_line_endings(b"a\rb\r"), b"a\rb\r");
        }

        #[test]
        fn applied_once() {
            assert_eq!(normalize_line_endings(b"\r\r\n"), b"\r\n");
        }
    }

    mod verdict {
        use super::*;

        #[test]
        fn identical_content() {
            let c = commit().with_file("f", "A");
            let w = worktree().with_file("f", "A");
            let ctx = context(&[]);
            let detector = ChangeDetector::new(&c, &w, &ctx);
            assert_eq!(detector.verdict("f").unwrap(), ChangeVerdict::Unmodified);
        }

        #[test]
        fn crlf_checkout_is_unmodified() {
            let c = commit().with_file("f", "line1\nline2\n");
            let w = worktree().with_file("f", "line1\r\nline2\r\n");
            let ctx = context(&[]);
            let detector = ChangeDetector::new(&c, &w, &ctx);
            assert_eq!(detector.verdict("f").unwrap(), ChangeVerdict::Unmodified);
        }

        #[test]
        fn committed_crlf_is_not_normalized() {
            let c = commit().with_file("f", "line\r\n");
            let w = worktree().with_file("f", "line\n");
            let ctx = context(&[]);
            let detector = ChangeDetector::new(&c, &w, &ctx);
            assert_eq!(detector.verdict("f").unwrap(), ChangeVerdict::Modified);
        }

        #[test]
        fn appended_content_is_modified() {
            let c = commit().with_file("f", "A");
            let w = worktree().with_file("f", "A\n");
            let ctx = context(&[]);
            let detector = ChangeDetector::new(&c, &w, &ctx);
            assert_eq!(detector.verdict("f").unwrap(), ChangeVerdict::Modified);
        }

        #[test]
        fn presence_differences() {
            let c = commit().with_file("committed", "A");
            let w = worktree().with_file("local", "B");
            let ctx = context(&[]);
            let detector = ChangeDetector::new(&c, &w, &ctx);
            assert_eq!(detector.verdict("local").unwrap(), ChangeVerdict::Untracked);
            assert_eq!(
                detector.verdict("committed").unwrap(),
                ChangeVerdict::MissingFromWorktree
            );
        }

        #[test]
        fn symlink_target_change() {
            let c = commit().with_symlink("l", "a");
            let same = worktree().with_symlink("l", "a");
            let moved = worktree().with_symlink("l", "b");
            let replaced = worktree().with_file("l", "a");
            let ctx = context(&[]);

            assert_eq!(
                ChangeDetector::new(&c, &same, &ctx).verdict("l").unwrap(),
                ChangeVerdict::Unmodified
            );
            assert_eq!(
                ChangeDetector::new(&c, &moved, &ctx).verdict("l").unwrap(),
                ChangeVerdict::Modified
            );
            assert_eq!(
                ChangeDetector::new(&c, &replaced, &ctx).verdict("l").unwrap(),
                ChangeVerdict::Modified
            );
        }

        #[test]
        fn file_replaced_by_symlink() {
            let c = commit().with_file("f", "A");
            let w = worktree().with_file("g", "A").with_symlink("f", "g");
            let ctx = context(&[]);
            let detector = ChangeDetector::new(&c, &w, &ctx);
            assert_eq!(detector.verdict("f").unwrap(), ChangeVerdict::Modified);
        }

        #[test]
        fn uninitialized_submodule_is_exempt() {
            let c = commit().with_file("sub/f", "A");
            let w = worktree().with_file("sub/f", "B");
            let ctx = context(&["sub"]);
            let detector = ChangeDetector::new(&c, &w, &ctx);
            assert_eq!(detector.verdict("sub/f").unwrap(), ChangeVerdict::Unmodified);
        }
    }

    mod resolved {
        use super::*;

        #[test]
        fn checks_links_and_target() {
            let c = commit()
                .with_file("dir/werf.yaml", "A")
                .with_symlink("werf.yaml", "dir/werf.yaml");
            let unchanged = worktree()
                .with_file("dir/werf.yaml", "A")
                .with_symlink("werf.yaml", "dir/werf.yaml");
            let relinked = worktree()
                .with_file("dir/werf.yaml", "A")
                .with_file("other.yaml", "A")
                .with_symlink("werf.yaml", "other.yaml");
            let edited = worktree()
                .with_file("dir/werf.yaml", "B")
                .with_symlink("werf.yaml", "dir/werf.yaml");
            let ctx = context(&[]);

            let resolved = Resolver::new(&c).resolve("werf.yaml").unwrap();
            assert!(!ChangeDetector::new(&c, &unchanged, &ctx)
                .is_modified(&resolved)
                .unwrap());
            assert!(ChangeDetector::new(&c, &relinked, &ctx)
                .is_modified(&resolved)
                .unwrap());
            assert!(ChangeDetector::new(&c, &edited, &ctx)
                .is_modified(&resolved)
                .unwrap());
        }

        #[test]
        fn deleted_worktree_copy_is_not_modified() {
            let c = commit().with_file("werf.yaml", "A");
            let w = worktree();
            let ctx = context(&[]);
            let resolved = Resolver::new(&c).resolve("werf.yaml").unwrap();
            assert!(!ChangeDetector::new(&c, &w, &ctx)
                .is_modified(&resolved)
                .unwrap());
        }
    }
}
