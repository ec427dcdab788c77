//! file_reader::errors
//!
//! Errors surfaced by the file reader.

use thiserror::Error;

use crate::core::config::ConfigError;
use crate::core::glob::PatternError;
use crate::resolver::ResolveError;
use crate::store::StoreError;

/// Errors from configuration file access.
#[derive(Debug, Error)]
pub enum FileReaderError {
    /// The file is absent from the worktree, which was the store consulted.
    #[error("the file '{path}' not found in the project directory")]
    NotFoundInProjectDirectory { path: String },

    /// The file is absent from the head commit, which was the store consulted.
    #[error("the file '{path}' not found in the project git repository")]
    NotFoundInProjectRepository { path: String },

    /// A directory is absent from both stores.
    #[error("the directory '{path}' not found in the project git repository")]
    DirectoryNotFound { path: String },

    /// A chart directory resolves to something that is not a directory.
    #[error("unable to handle chart directory '{path}': linked to file not a directory")]
    NotADirectory { path: String },

    /// Files exist only in the worktree and policy does not accept them.
    #[error("{}", files_message(.paths, "must be committed"))]
    UncommittedFiles { paths: Vec<String> },

    /// Committed files have worktree changes and policy does not accept them.
    #[error("{}", files_message(.paths, "changes must be committed"))]
    UncommittedFilesChanges { paths: Vec<String> },

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A failure annotated with the operation and path it happened in.
    #[error("{operation}: {source}")]
    Context {
        operation: String,
        path: String,
        #[source]
        source: Box<FileReaderError>,
    },
}

fn files_message(paths: &[String], verdict: &str) -> String {
    match paths {
        [single] => format!("the file '{}' {}", single, verdict),
        _ => {
            let list: Vec<String> = paths.iter().map(|p| format!(" - {}", p)).collect();
            format!("the following files {}:\n\n{}", verdict, list.join("\n"))
        }
    }
}

impl FileReaderError {
    /// Wrap the error with the failing operation and the path it was given.
    pub fn context(self, operation: impl Into<String>, path: impl Into<String>) -> Self {
        FileReaderError::Context {
            operation: operation.into(),
            path: path.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, with all context layers removed.
    pub fn root(&self) -> &FileReaderError {
        let mut err = self;
        while let FileReaderError::Context { source, .. } = err {
            err = &**source;
        }
        err
    }

    /// Paths named by an uncommitted-files or uncommitted-changes error.
    pub fn uncommitted_paths(&self) -> Option<&[String]> {
        match self.root() {
            FileReaderError::UncommittedFiles { paths }
            | FileReaderError::UncommittedFilesChanges { paths } => Some(paths),
            _ => None,
        }
    }

    /// Whether the root cause is a missing file or directory.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.root(),
            FileReaderError::NotFoundInProjectDirectory { .. }
                | FileReaderError::NotFoundInProjectRepository { .. }
                | FileReaderError::DirectoryNotFound { .. }
        )
    }
}
