//! store::worktree
//!
//! The worktree accessor: a [`BackingStore`] over the live project directory.
//!
//! Classification uses `lstat`; a symlink is never dereferenced here. The
//! repository's own `.git` entry is invisible.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::{BackingStore, StoreError};
use crate::core::paths;
use crate::core::types::{BackingStoreKind, EntryKind, TreeEntry};

const GIT_DIR: &str = ".git";

/// The project working directory.
#[derive(Debug, Clone)]
pub struct Worktree {
    root: PathBuf,
}

impl Worktree {
    /// Create an accessor rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The project root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn absolute(&self, path: &str) -> PathBuf {
        paths::to_absolute(&self.root, path)
    }

    fn io_error(&self, path: &str, source: std::io::Error) -> StoreError {
        if source.kind() == ErrorKind::NotFound {
            return StoreError::NotFound {
                path: path.to_string(),
                store: BackingStoreKind::Worktree,
            };
        }
        StoreError::Io {
            path: self.absolute(path),
            source,
        }
    }
}

fn classify(file_type: fs::FileType, metadata: Option<&fs::Metadata>) -> EntryKind {
    if file_type.is_symlink() {
        EntryKind::Symlink
    } else if file_type.is_dir() {
        EntryKind::Directory
    } else if file_type.is_file() {
        if metadata.is_some_and(is_executable) {
            EntryKind::ExecutableFile
        } else {
            EntryKind::RegularFile
        }
    } else {
        EntryKind::Malformed
    }
}

#[cfg(unix)]
fn is_executable(metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &fs::Metadata) -> bool {
    false
}

impl BackingStore for Worktree {
    fn kind(&self) -> BackingStoreKind {
        BackingStoreKind::Worktree
    }

    fn entry(&self, path: &str) -> Result<Option<EntryKind>, StoreError> {
        if paths::split(path).first() == Some(&GIT_DIR) {
            return Ok(None);
        }

        match fs::symlink_metadata(self.absolute(path)) {
            Ok(metadata) => Ok(Some(classify(metadata.file_type(), Some(&metadata)))),
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
                Ok(None)
            }
            Err(e) => Err(StoreError::Io {
                path: self.absolute(path),
                source: e,
            }),
        }
    }

    fn read_link(&self, path: &str) -> Result<String, StoreError> {
        let target = fs::read_link(self.absolute(path)).map_err(|e| {
            if e.kind() == ErrorKind::InvalidInput {
                StoreError::NotASymlink {
                    path: path.to_string(),
                }
            } else {
                self.io_error(path, e)
            }
        })?;

        let target = target.to_str().ok_or_else(|| StoreError::InvalidUtf8 {
            path: path.to_string(),
        })?;
        Ok(paths::to_slash(target))
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        match self.entry(path)? {
            Some(kind) if kind.is_file() => {}
            Some(kind) => {
                return Err(StoreError::NotAFile {
                    path: path.to_string(),
                    kind,
                })
            }
            None => {
                return Err(StoreError::NotFound {
                    path: path.to_string(),
                    store: BackingStoreKind::Worktree,
                })
            }
        }

        fs::read(self.absolute(path)).map_err(|e| self.io_error(path, e))
    }

    fn list_recursive(&self, dir: &str) -> Result<Vec<TreeEntry>, StoreError> {
        if self.entry(dir)? != Some(EntryKind::Directory) {
            return Ok(Vec::new());
        }

        let mut entries = Vec::new();
        let walker = WalkDir::new(self.absolute(dir))
            .follow_links(false)
            .min_depth(1)
            .into_iter()
            .filter_entry(|e| e.file_name() != GIT_DIR);

        for item in walker {
            let item = item.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_default();
                StoreError::Io {
                    path,
                    source: e.into(),
                }
            })?;

            if item.file_type().is_dir() {
                continue;
            }

            // Skip entries with non-UTF8 names
            let Some(rel) = paths::relative_to(&self.root, item.path()) else {
                continue;
            };

            let metadata = item.metadata().ok();
            let kind = classify(item.file_type(), metadata.as_ref());
            entries.push(TreeEntry::new(rel, kind));
        }

        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(entries)
    }
}
