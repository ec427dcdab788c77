//! store::memory
//!
//! An in-memory [`BackingStore`], for embedding and tests.

use std::collections::BTreeMap;

use super::{BackingStore, StoreError};
use crate::core::paths;
use crate::core::types::{BackingStoreKind, EntryKind, TreeEntry};

#[derive(Debug, Clone)]
enum Node {
    File { content: Vec<u8>, executable: bool },
    Symlink(String),
    Dir,
    Submodule,
    Malformed,
}

/// A tree of entries held in memory.
///
/// Parent directories are implied by the entries beneath them.
///
/// # Example
///
/// ```
/// use giterminism::core::types::{BackingStoreKind, EntryKind};
/// use giterminism::store::{BackingStore, MemoryStore};
///
/// let store = MemoryStore::new(BackingStoreKind::CommitTree)
///     .with_file("dir/werf.yaml", "project: demo")
///     .with_symlink("werf.yaml", "dir/werf.yaml");
///
/// assert_eq!(store.entry("dir").unwrap(), Some(EntryKind::Directory));
/// assert_eq!(store.entry("werf.yaml").unwrap(), Some(EntryKind::Symlink));
/// ```
#[derive(Debug, Clone)]
pub struct MemoryStore {
    kind: BackingStoreKind,
    nodes: BTreeMap<String, Node>,
}

impl MemoryStore {
    /// Create an empty store posing as `kind`.
    pub fn new(kind: BackingStoreKind) -> Self {
        Self {
            kind,
            nodes: BTreeMap::new(),
        }
    }

    /// Add a regular file.
    pub fn with_file(mut self, path: &str, content: impl Into<Vec<u8>>) -> Self {
        self.insert(
            path,
            Node::File {
                content: content.into(),
                executable: false,
            },
        );
        self
    }

    /// Add an executable file.
    pub fn with_executable(mut self, path: &str, content: impl Into<Vec<u8>>) -> Self {
        self.insert(
            path,
            Node::File {
                content: content.into(),
                executable: true,
            },
        );
        self
    }

    /// Add a symlink with the given target text.
    pub fn with_symlink(mut self, path: &str, target: &str) -> Self {
        self.insert(path, Node::Symlink(target.to_string()));
        self
    }

    /// Add an empty directory.
    pub fn with_dir(mut self, path: &str) -> Self {
        self.insert(path, Node::Dir);
        self
    }

    /// Add a submodule entry.
    pub fn with_submodule(mut self, path: &str) -> Self {
        self.insert(path, Node::Submodule);
        self
    }

    /// Add an entry that cannot be classified.
    pub fn with_malformed(mut self, path: &str) -> Self {
        self.insert(path, Node::Malformed);
        self
    }

    /// Remove an entry and everything beneath it.
    pub fn remove(&mut self, path: &str) {
        self.nodes.retain(|key, _| !paths::is_within(path, key));
    }

    fn insert(&mut self, path: &str, node: Node) {
        self.nodes.insert(paths::split(path).join("/"), node);
    }

    fn has_children(&self, dir: &str) -> bool {
        let prefix = format!("{}/", dir);
        self.nodes
            .range(prefix.clone()..)
            .next()
            .is_some_and(|(key, _)| key.starts_with(&prefix))
    }

    fn node_kind(node: &Node) -> EntryKind {
        match node {
            Node::File {
                executable: true, ..
            } => EntryKind::ExecutableFile,
            Node::File { .. } => EntryKind::RegularFile,
            Node::Symlink(_) => EntryKind::Symlink,
            Node::Dir => EntryKind::Directory,
            Node::Submodule => EntryKind::Submodule,
            Node::Malformed => EntryKind::Malformed,
        }
    }

    fn not_found(&self, path: &str) -> StoreError {
        StoreError::NotFound {
            path: path.to_string(),
            store: self.kind,
        }
    }
}

impl BackingStore for MemoryStore {
    fn kind(&self) -> BackingStoreKind {
        self.kind
    }

    fn entry(&self, path: &str) -> Result<Option<EntryKind>, StoreError> {
        if path.is_empty() {
            return Ok(Some(EntryKind::Directory));
        }
        if let Some(node) = self.nodes.get(path) {
            return Ok(Some(Self::node_kind(node)));
        }
        if self.has_children(path) {
            return Ok(Some(EntryKind::Directory));
        }
        Ok(None)
    }

    fn read_link(&self, path: &str) -> Result<String, StoreError> {
        match self.nodes.get(path) {
            Some(Node::Symlink(target)) => Ok(target.clone()),
            Some(_) => Err(StoreError::NotASymlink {
                path: path.to_string(),
            }),
            None => Err(self.not_found(path)),
        }
    }

    fn read(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        match self.nodes.get(path) {
            Some(Node::File { content, .. }) => Ok(content.clone()),
            Some(node) => Err(StoreError::NotAFile {
                path: path.to_string(),
                kind: Self::node_kind(node),
            }),
            None if self.has_children(path) => Err(StoreError::NotAFile {
                path: path.to_string(),
                kind: EntryKind::Directory,
            }),
            None => Err(self.not_found(path)),
        }
    }

    fn list_recursive(&self, dir: &str) -> Result<Vec<TreeEntry>, StoreError> {
        if !matches!(self.entry(dir)?, Some(EntryKind::Directory)) {
            return Ok(Vec::new());
        }

        Ok(self
            .nodes
            .iter()
            .filter(|(key, _)| key.as_str() != dir && paths::is_within(dir, key))
            .filter(|(_, node)| !matches!(node, Node::Dir))
            .map(|(key, node)| TreeEntry::new(key.clone(), Self::node_kind(node)))
            .collect())
    }
}
