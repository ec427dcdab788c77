//! policy
//!
//! The policy gate: which uncommitted content a run may use.
//!
//! # Architecture
//!
//! Policy is a capability, not data. The file reader only sees
//! [`AcceptancePolicy`] and the inspector only sees [`InspectorPolicy`];
//! the giterminism configuration file implements both, and tests swap in
//! [`AcceptAll`] or [`DenyAll`].
//!
//! Predicates are pure and infallible. Anything that could fail (pattern
//! compilation) happens when the policy is built.

use thiserror::Error;

use crate::core::types::ArtifactKind;

/// Which uncommitted files may be read from the worktree.
pub trait AcceptancePolicy {
    /// The build manifest may be uncommitted.
    fn is_uncommitted_config_accepted(&self) -> bool;

    /// A manifest template may be uncommitted.
    fn is_uncommitted_config_template_accepted(&self, rel_path: &str) -> bool;

    /// A file read during template rendering may be uncommitted.
    fn is_uncommitted_config_go_template_file_accepted(&self, rel_path: &str) -> bool;

    /// A Dockerfile may be uncommitted.
    fn is_uncommitted_dockerfile_accepted(&self, rel_path: &str) -> bool;

    /// A `.dockerignore` may be uncommitted.
    fn is_uncommitted_dockerignore_accepted(&self, rel_path: &str) -> bool;

    /// A chart file may be uncommitted.
    fn is_uncommitted_chart_file_accepted(&self, rel_path: &str) -> bool;

    /// Dispatch on the artifact kind.
    ///
    /// The giterminism config itself is never accepted uncommitted.
    fn is_path_accepted(&self, kind: ArtifactKind, rel_path: &str) -> bool {
        match kind {
            ArtifactKind::GiterminismConfig => false,
            ArtifactKind::Config => self.is_uncommitted_config_accepted(),
            ArtifactKind::ConfigTemplate => self.is_uncommitted_config_template_accepted(rel_path),
            ArtifactKind::ConfigGoTemplateFile => {
                self.is_uncommitted_config_go_template_file_accepted(rel_path)
            }
            ArtifactKind::Dockerfile => self.is_uncommitted_dockerfile_accepted(rel_path),
            ArtifactKind::Dockerignore => self.is_uncommitted_dockerignore_accepted(rel_path),
            ArtifactKind::ChartFile | ArtifactKind::ChartDirectory => {
                self.is_uncommitted_chart_file_accepted(rel_path)
            }
        }
    }
}

/// Policy for concerns that are not file reads.
pub trait InspectorPolicy {
    /// Templates may read the environment variable `name`.
    fn is_go_template_rendering_env_name_accepted(&self, name: &str) -> bool;

    /// Stapel images may build from the latest base image.
    fn is_stapel_from_latest_accepted(&self) -> bool;

    /// Stapel git imports may follow a branch instead of a commit.
    fn is_stapel_git_branch_accepted(&self) -> bool;

    /// Stapel may mount the build directory.
    fn is_stapel_mount_build_dir_accepted(&self) -> bool;

    /// Stapel may mount the host path `from_path`.
    fn is_stapel_mount_from_path_accepted(&self, from_path: &str) -> bool;

    /// A Dockerfile build may add the uncommitted context file `rel_path`.
    fn is_dockerfile_context_add_file_accepted(&self, rel_path: &str) -> bool;
}

/// Rejects everything. The policy of a project without a giterminism
/// config.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

/// Accepts everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

macro_rules! constant_policy {
    ($ty:ty, $value:expr) => {
        impl AcceptancePolicy for $ty {
            fn is_uncommitted_config_accepted(&self) -> bool {
                $value
            }
            fn is_uncommitted_config_template_accepted(&self, _rel_path: &str) -> bool {
                $value
            }
            fn is_uncommitted_config_go_template_file_accepted(&self, _rel_path: &str) -> bool {
                $value
            }
            fn is_uncommitted_dockerfile_accepted(&self, _rel_path: &str) -> bool {
                $value
            }
            fn is_uncommitted_dockerignore_accepted(&self, _rel_path: &str) -> bool {
                $value
            }
            fn is_uncommitted_chart_file_accepted(&self, _rel_path: &str) -> bool {
                $value
            }
        }

        impl InspectorPolicy for $ty {
            fn is_go_template_rendering_env_name_accepted(&self, _name: &str) -> bool {
                $value
            }
            fn is_stapel_from_latest_accepted(&self) -> bool {
                $value
            }
            fn is_stapel_git_branch_accepted(&self) -> bool {
                $value
            }
            fn is_stapel_mount_build_dir_accepted(&self) -> bool {
                $value
            }
            fn is_stapel_mount_from_path_accepted(&self, _from_path: &str) -> bool {
                $value
            }
            fn is_dockerfile_context_add_file_accepted(&self, _rel_path: &str) -> bool {
                $value
            }
        }
    };
}

constant_policy!(DenyAll, false);
constant_policy!(AcceptAll, true);

/// A configuration directive rejected by policy.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InspectError {
    #[error("the configuration with potential external dependency found in the werf config: env name '{name}' not allowed by giterminism")]
    EnvNameNotAllowed { name: String },

    #[error("the configuration with external dependency found in the werf config: fromLatest directive not allowed by giterminism")]
    FromLatestNotAllowed,

    #[error("the configuration with external dependency found in the werf config: git branch directive not allowed by giterminism")]
    GitBranchNotAllowed,

    #[error("the configuration with external dependency found in the werf config: mount from build_dir not allowed by giterminism")]
    MountBuildDirNotAllowed,

    #[error("the configuration with external dependency found in the werf config: mount fromPath '{path}' not allowed by giterminism")]
    MountFromPathNotAllowed { path: String },

    #[error("the configuration with external dependency found in the werf config: contextAddFile '{path}' not allowed by giterminism")]
    ContextAddFileNotAllowed { path: String },
}

/// Evaluates policy for non-file concerns. Everything passes in loose mode.
#[derive(Clone, Copy)]
pub struct Inspector<'a> {
    policy: &'a dyn InspectorPolicy,
    loose: bool,
}

impl std::fmt::Debug for Inspector<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inspector")
            .field("loose", &self.loose)
            .finish()
    }
}

impl<'a> Inspector<'a> {
    pub fn new(policy: &'a dyn InspectorPolicy, loose: bool) -> Self {
        Self { policy, loose }
    }

    fn check(&self, accepted: bool, err: impl FnOnce() -> InspectError) -> Result<(), InspectError> {
        if self.loose || accepted {
            Ok(())
        } else {
            Err(err())
        }
    }

    pub fn inspect_config_go_template_rendering_env(&self, name: &str) -> Result<(), InspectError> {
        self.check(
            self.policy.is_go_template_rendering_env_name_accepted(name),
            || InspectError::EnvNameNotAllowed {
                name: name.to_string(),
            },
        )
    }

    pub fn inspect_config_stapel_from_latest(&self) -> Result<(), InspectError> {
        self.check(self.policy.is_stapel_from_latest_accepted(), || {
            InspectError::FromLatestNotAllowed
        })
    }

    pub fn inspect_config_stapel_git_branch(&self) -> Result<(), InspectError> {
        self.check(self.policy.is_stapel_git_branch_accepted(), || {
            InspectError::GitBranchNotAllowed
        })
    }

    pub fn inspect_config_stapel_mount_build_dir(&self) -> Result<(), InspectError> {
        self.check(self.policy.is_stapel_mount_build_dir_accepted(), || {
            InspectError::MountBuildDirNotAllowed
        })
    }

    pub fn inspect_config_stapel_mount_from_path(&self, from_path: &str) -> Result<(), InspectError> {
        self.check(
            self.policy.is_stapel_mount_from_path_accepted(from_path),
            || InspectError::MountFromPathNotAllowed {
                path: from_path.to_string(),
            },
        )
    }

    pub fn inspect_config_dockerfile_context_add_file(&self, rel_path: &str) -> Result<(), InspectError> {
        self.check(
            self.policy.is_dockerfile_context_add_file_accepted(rel_path),
            || InspectError::ContextAddFileNotAllowed {
                path: rel_path.to_string(),
            },
        )
    }
}
