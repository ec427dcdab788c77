//! core::config
//!
//! The giterminism policy configuration.
//!
//! # Overview
//!
//! A project states which uncommitted content it tolerates in
//! `giterminism.toml` at its root. Without the file everything is denied.
//!
//! Loading takes bytes, not a path: the composition root reads the file
//! through the file reader, so the policy is itself subject to giterminism
//! (it has to be committed, and uncommitted edits to it are refused).
//!
//! # Example
//!
//! ```
//! use giterminism::core::config::GiterminismConfig;
//! use giterminism::policy::AcceptancePolicy;
//!
//! let config = GiterminismConfig::parse(
//!     br#"
//!     [helm]
//!     allow_uncommitted_files = [".helm/values.local.yaml"]
//!     "#,
//! )
//! .unwrap();
//!
//! assert!(config.is_uncommitted_chart_file_accepted(".helm/values.local.yaml"));
//! assert!(!config.is_uncommitted_config_accepted());
//! ```

pub mod schema;

pub use schema::GiterminismFile;

use thiserror::Error;

use crate::policy::{AcceptancePolicy, InspectorPolicy};
use schema::CompiledPatterns;

/// File name of the policy file, relative to the project root.
pub const GITERMINISM_CONFIG_FILE: &str = "giterminism.toml";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse giterminism.toml: {message}")]
    ParseError { message: String },

    #[error("giterminism.toml is not valid UTF-8")]
    InvalidUtf8,

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// A loaded and validated policy.
#[derive(Debug, Clone, Default)]
pub struct GiterminismConfig {
    file: GiterminismFile,
    patterns: CompiledPatterns,
}

impl GiterminismConfig {
    /// Parse and validate policy file content.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::ParseError`] for malformed TOML or unknown keys
    /// - [`ConfigError::InvalidValue`] for invalid patterns
    pub fn parse(data: &[u8]) -> Result<Self, ConfigError> {
        let text = std::str::from_utf8(data).map_err(|_| ConfigError::InvalidUtf8)?;
        let file: GiterminismFile = toml::from_str(text).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
        Self::from_file(file)
    }

    /// Validate an already deserialized policy.
    pub fn from_file(file: GiterminismFile) -> Result<Self, ConfigError> {
        let patterns = file.compile()?;
        Ok(Self { file, patterns })
    }

    /// Policy used when the project has no policy file.
    pub fn deny_all() -> Self {
        Self::default()
    }

    /// The policy as written.
    pub fn file(&self) -> &GiterminismFile {
        &self.file
    }
}

impl AcceptancePolicy for GiterminismConfig {
    fn is_uncommitted_config_accepted(&self) -> bool {
        self.file.config.allow_uncommitted
    }

    fn is_uncommitted_config_template_accepted(&self, rel_path: &str) -> bool {
        self.patterns.config_templates.covers(rel_path)
    }

    fn is_uncommitted_config_go_template_file_accepted(&self, rel_path: &str) -> bool {
        self.patterns.go_template_files.covers(rel_path)
    }

    fn is_uncommitted_dockerfile_accepted(&self, rel_path: &str) -> bool {
        self.patterns.dockerfiles.covers(rel_path)
    }

    fn is_uncommitted_dockerignore_accepted(&self, rel_path: &str) -> bool {
        self.patterns.dockerignore_files.covers(rel_path)
    }

    fn is_uncommitted_chart_file_accepted(&self, rel_path: &str) -> bool {
        self.patterns.helm_files.covers(rel_path)
    }
}

impl InspectorPolicy for GiterminismConfig {
    fn is_go_template_rendering_env_name_accepted(&self, name: &str) -> bool {
        self.patterns.env_variables.covers(name)
    }

    fn is_stapel_from_latest_accepted(&self) -> bool {
        self.file.config.stapel.allow_from_latest
    }

    fn is_stapel_git_branch_accepted(&self) -> bool {
        self.file.config.stapel.git.allow_branch
    }

    fn is_stapel_mount_build_dir_accepted(&self) -> bool {
        self.file.config.stapel.mount.allow_build_dir
    }

    fn is_stapel_mount_from_path_accepted(&self, from_path: &str) -> bool {
        let from_path = from_path.trim_start_matches('/');
        self.patterns.mount_from_paths.covers(from_path)
    }

    fn is_dockerfile_context_add_file_accepted(&self, rel_path: &str) -> bool {
        self.patterns.context_add_files.covers(rel_path)
    }
}
