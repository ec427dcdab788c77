//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`CommitId`] - Git commit identifier fixed for a run
//! - [`EntryKind`] - Classification of a tree entry in either backing store
//! - [`TreeEntry`] - A path paired with its entry kind
//! - [`BackingStoreKind`] - Commit tree or live worktree
//! - [`ResolvedPath`] - Result of symlink-safe resolution
//! - [`ChangeVerdict`] - Worktree vs commit comparison result
//!
//! # Validation
//!
//! These types enforce validity at construction time. Invalid values
//! cannot be represented, preventing entire classes of bugs.
//!
//! # Examples
//!
//! ```
//! use giterminism::core::types::{CommitId, EntryKind};
//!
//! let commit = CommitId::new("abc123def4567890abc123def4567890abc12345").unwrap();
//! assert_eq!(commit.short(7), "abc123d");
//! assert!(CommitId::new("not-a-sha").is_err());
//!
//! assert_eq!(EntryKind::from_git_mode(0o120000), EntryKind::Symlink);
//! ```

use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid commit id: {0}")]
    InvalidCommitId(String),
}

/// A validated Git commit identifier.
///
/// Identifiers are normalized to lowercase for consistency. A run fixes one
/// `CommitId` at construction and never re-resolves `HEAD` afterwards.
///
/// # Example
///
/// ```
/// use giterminism::core::types::CommitId;
///
/// let id = CommitId::new("ABC123DEF4567890ABC123DEF4567890ABC12345").unwrap();
/// assert_eq!(id.as_str(), "abc123def4567890abc123def4567890abc12345");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommitId(String);

impl CommitId {
    /// Create a new validated commit id.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidCommitId` if the string is not a 40 or 64
    /// character hex id.
    pub fn new(id: impl Into<String>) -> Result<Self, TypeError> {
        let id = id.into().to_ascii_lowercase();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    /// Get an abbreviated form of the id.
    ///
    /// Returns the first `len` characters, or the full id if `len` exceeds it.
    pub fn short(&self, len: usize) -> &str {
        let end = len.min(self.0.len());
        &self.0[..end]
    }

    fn validate(id: &str) -> Result<(), TypeError> {
        // SHA-1 is 40 hex chars, SHA-256 is 64
        if id.len() != 40 && id.len() != 64 {
            return Err(TypeError::InvalidCommitId(format!(
                "expected 40 or 64 hex characters, got {}",
                id.len()
            )));
        }
        if !id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypeError::InvalidCommitId(
                "commit id must be hexadecimal".into(),
            ));
        }
        Ok(())
    }

    /// Get the commit id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for CommitId {
    type Error = TypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl AsRef<str> for CommitId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CommitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of an entry in a backing store.
///
/// The commit tree classifies purely from tree metadata (file mode); the
/// worktree classifies from `lstat`, never dereferencing symlinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Regular, non-executable file.
    RegularFile,
    /// Regular file with the executable bit.
    ExecutableFile,
    /// Directory (tree).
    Directory,
    /// Symbolic link; its target is read separately.
    Symlink,
    /// Submodule (gitlink in the commit tree).
    Submodule,
    /// Anything that cannot be classified. Terminal for resolution.
    Malformed,
}

impl EntryKind {
    /// Classify a raw git tree file mode.
    ///
    /// The deprecated group-writable blob mode (`0o100664`) is a regular file,
    /// as git itself treats it.
    ///
    /// # Example
    ///
    /// ```
    /// use giterminism::core::types::EntryKind;
    ///
    /// assert_eq!(EntryKind::from_git_mode(0o100644), EntryKind::RegularFile);
    /// assert_eq!(EntryKind::from_git_mode(0o100755), EntryKind::ExecutableFile);
    /// assert_eq!(EntryKind::from_git_mode(0o040000), EntryKind::Directory);
    /// assert_eq!(EntryKind::from_git_mode(0o160000), EntryKind::Submodule);
    /// assert_eq!(EntryKind::from_git_mode(0o100600), EntryKind::Malformed);
    /// ```
    pub fn from_git_mode(mode: u32) -> Self {
        match mode {
            0o100644 | 0o100664 => EntryKind::RegularFile,
            0o100755 => EntryKind::ExecutableFile,
            0o040000 => EntryKind::Directory,
            0o120000 => EntryKind::Symlink,
            0o160000 => EntryKind::Submodule,
            _ => EntryKind::Malformed,
        }
    }

    /// Regular or executable file.
    pub fn is_file(&self) -> bool {
        matches!(self, EntryKind::RegularFile | EntryKind::ExecutableFile)
    }

    /// Directory or submodule: something that may have children.
    pub fn is_directory_like(&self) -> bool {
        matches!(self, EntryKind::Directory | EntryKind::Submodule)
    }

    /// Get a human-readable description of the kind.
    pub fn description(&self) -> &'static str {
        match self {
            EntryKind::RegularFile => "regular file",
            EntryKind::ExecutableFile => "executable file",
            EntryKind::Directory => "directory",
            EntryKind::Symlink => "symlink",
            EntryKind::Submodule => "submodule",
            EntryKind::Malformed => "malformed entry",
        }
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// A path in a backing store with its kind.
///
/// Paths are forward-slash and relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Relative path of the entry
    pub path: String,
    /// Entry classification
    pub kind: EntryKind,
}

impl TreeEntry {
    /// Create a new tree entry.
    pub fn new(path: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Which backing store a lookup runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackingStoreKind {
    /// The live project working directory.
    Worktree,
    /// The git tree of the head commit.
    CommitTree,
}

impl BackingStoreKind {
    /// Location phrase used in user-facing messages.
    pub fn location(&self) -> &'static str {
        match self {
            BackingStoreKind::Worktree => "the project directory",
            BackingStoreKind::CommitTree => "the project git repository",
        }
    }
}

impl std::fmt::Display for BackingStoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackingStoreKind::Worktree => write!(f, "worktree"),
            BackingStoreKind::CommitTree => write!(f, "commit tree"),
        }
    }
}

/// The outcome of symlink-safe resolution.
///
/// # Invariants
///
/// - `canonical` denotes an existing, non-symlink entry in `store`
/// - `canonical` never escapes the project root
/// - `links` lists every symlink followed, in traversal order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// The path as requested (normalized)
    pub original: String,
    /// The symlink-free path of the resolved entry
    pub canonical: String,
    /// Kind of the resolved entry
    pub kind: EntryKind,
    /// Store the path was resolved in
    pub store: BackingStoreKind,
    /// Symlink paths traversed during resolution
    pub links: Vec<String>,
}

impl ResolvedPath {
    /// Every path the resolution touched that carries content of its own:
    /// traversed symlinks first, then the canonical entry.
    pub fn chain(&self) -> impl Iterator<Item = &str> {
        self.links
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.canonical.as_str()))
    }
}

/// Result of comparing a worktree path against the head commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeVerdict {
    /// Worktree content matches the committed blob.
    Unmodified,
    /// Worktree content differs from the committed blob.
    Modified,
    /// Present in the worktree, absent from the commit tree.
    Untracked,
    /// Present in the commit tree, absent from the worktree.
    MissingFromWorktree,
}

impl ChangeVerdict {
    /// Whether this verdict makes committed content untrustworthy.
    ///
    /// A file removed from the worktree is not a divergence: the committed
    /// blob is still the only copy and is read as-is.
    pub fn is_modified(&self) -> bool {
        matches!(self, ChangeVerdict::Modified)
    }
}

/// Kind of configuration artifact a path is requested as.
///
/// Acceptance policy is evaluated per kind: a path may be trusted from the
/// worktree as a chart file but not as a Dockerfile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// The giterminism policy file itself.
    GiterminismConfig,
    /// The build manifest.
    Config,
    /// A build manifest template under the templates directory.
    ConfigTemplate,
    /// A file read by template rendering (`.Files.Get`, `.Files.Glob`).
    ConfigGoTemplateFile,
    /// A Dockerfile.
    Dockerfile,
    /// A `.dockerignore` file.
    Dockerignore,
    /// A file inside a chart directory.
    ChartFile,
    /// A chart directory.
    ChartDirectory,
}

impl ArtifactKind {
    /// Human label used in error messages.
    pub fn label(&self) -> &'static str {
        match self {
            ArtifactKind::GiterminismConfig => "giterminism config",
            ArtifactKind::Config => "werf config",
            ArtifactKind::ConfigTemplate => "werf config template",
            ArtifactKind::ConfigGoTemplateFile => "file",
            ArtifactKind::Dockerfile => "dockerfile",
            ArtifactKind::Dockerignore => "dockerignore file",
            ArtifactKind::ChartFile => "chart file",
            ArtifactKind::ChartDirectory => "chart directory",
        }
    }
}

impl std::fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
