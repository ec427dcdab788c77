//! core::config::schema
//!
//! On-disk schema of the giterminism policy file.
//!
//! # Location
//!
//! `giterminism.toml` at the project root. The file is read like any other
//! configuration file, from the head commit unless the run is loose.
//!
//! # Validation
//!
//! Every pattern list is compiled during validation; an invalid glob is a
//! configuration error, never a silent non-match.

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::glob::PatternSet;

/// The giterminism policy file.
///
/// # Example
///
/// ```toml
/// [config]
/// allow_uncommitted = false
/// allow_uncommitted_templates = [".werf/partials/**/*.tmpl"]
///
/// [config.go_template_rendering]
/// allow_uncommitted_files = ["generated/*.json"]
/// allow_env_variables = ["CI_*"]
///
/// [config.stapel]
/// allow_from_latest = false
///
/// [config.stapel.mount]
/// allow_build_dir = true
/// allow_from_paths = ["/var/cache/apt"]
///
/// [config.dockerfile]
/// allow_uncommitted = ["docker/Dockerfile.dev"]
///
/// [helm]
/// allow_uncommitted_files = [".helm/values.local.yaml"]
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct GiterminismFile {
    /// Build manifest rules
    pub config: ConfigSection,

    /// Chart rules
    pub helm: HelmSection,
}

/// `[config]`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigSection {
    /// The build manifest may be uncommitted
    pub allow_uncommitted: bool,

    /// Manifest templates that may be uncommitted
    pub allow_uncommitted_templates: Vec<String>,

    pub go_template_rendering: GoTemplateRenderingSection,

    pub stapel: StapelSection,

    pub dockerfile: DockerfileSection,
}

/// `[config.go_template_rendering]`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct GoTemplateRenderingSection {
    /// Files read by templates that may be uncommitted
    pub allow_uncommitted_files: Vec<String>,

    /// Environment variable names templates may read
    pub allow_env_variables: Vec<String>,
}

/// `[config.stapel]`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct StapelSection {
    pub allow_from_latest: bool,

    pub git: StapelGitSection,

    pub mount: StapelMountSection,
}

/// `[config.stapel.git]`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct StapelGitSection {
    pub allow_branch: bool,
}

/// `[config.stapel.mount]`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct StapelMountSection {
    pub allow_build_dir: bool,

    /// Host paths that may be mounted
    pub allow_from_paths: Vec<String>,
}

/// `[config.dockerfile]`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct DockerfileSection {
    /// Dockerfiles that may be uncommitted
    pub allow_uncommitted: Vec<String>,

    /// `.dockerignore` files that may be uncommitted
    pub allow_uncommitted_dockerignore_files: Vec<String>,

    /// Uncommitted files a build may add to the context
    pub allow_context_add_files: Vec<String>,
}

/// `[helm]`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct HelmSection {
    /// Chart files that may be uncommitted
    pub allow_uncommitted_files: Vec<String>,
}

/// Pattern lists of a [`GiterminismFile`], compiled.
#[derive(Debug, Clone, Default)]
pub struct CompiledPatterns {
    pub config_templates: PatternSet,
    pub go_template_files: PatternSet,
    pub env_variables: PatternSet,
    pub mount_from_paths: PatternSet,
    pub dockerfiles: PatternSet,
    pub dockerignore_files: PatternSet,
    pub context_add_files: PatternSet,
    pub helm_files: PatternSet,
}

impl GiterminismFile {
    /// Validate the file by compiling every pattern list.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the offending key.
    pub fn compile(&self) -> Result<CompiledPatterns, ConfigError> {
        let config = &self.config;
        Ok(CompiledPatterns {
            config_templates: compile(
                "config.allow_uncommitted_templates",
                &config.allow_uncommitted_templates,
            )?,
            go_template_files: compile(
                "config.go_template_rendering.allow_uncommitted_files",
                &config.go_template_rendering.allow_uncommitted_files,
            )?,
            env_variables: compile(
                "config.go_template_rendering.allow_env_variables",
                &config.go_template_rendering.allow_env_variables,
            )?,
            mount_from_paths: compile(
                "config.stapel.mount.allow_from_paths",
                &config.stapel.mount.allow_from_paths,
            )?,
            dockerfiles: compile(
                "config.dockerfile.allow_uncommitted",
                &config.dockerfile.allow_uncommitted,
            )?,
            dockerignore_files: compile(
                "config.dockerfile.allow_uncommitted_dockerignore_files",
                &config.dockerfile.allow_uncommitted_dockerignore_files,
            )?,
            context_add_files: compile(
                "config.dockerfile.allow_context_add_files",
                &config.dockerfile.allow_context_add_files,
            )?,
            helm_files: compile(
                "helm.allow_uncommitted_files",
                &self.helm.allow_uncommitted_files,
            )?,
        })
    }
}

fn compile(key: &str, patterns: &[String]) -> Result<PatternSet, ConfigError> {
    PatternSet::new(patterns)
        .map_err(|e| ConfigError::InvalidValue(format!("{}: {}", key, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_deny_everything() {
        let file = GiterminismFile::default();
        assert!(!file.config.allow_uncommitted);
        assert!(file.helm.allow_uncommitted_files.is_empty());
        let compiled = file.compile().unwrap();
        assert!(compiled.helm_files.is_empty());
    }

    #[test]
    fn nested_tables_parse() {
        let file: GiterminismFile = toml::from_str(
            r#"
            [config.stapel.git]
            allow_branch = true

            [config.dockerfile]
            allow_context_add_files = ["gen/*"]
            "#,
        )
        .unwrap();
        assert!(file.config.stapel.git.allow_branch);
        assert_eq!(file.config.dockerfile.allow_context_add_files, vec!["gen/*"]);
    }

    #[test]
    fn invalid_pattern_names_key() {
        let mut file = GiterminismFile::default();
        file.helm.allow_uncommitted_files = vec!["[".into()];
        let err = file.compile().unwrap_err();
        assert!(err.to_string().contains("helm.allow_uncommitted_files"));
    }

    #[test]
    fn serialization_roundtrip() {
        let mut file = GiterminismFile::default();
        file.config.allow_uncommitted = true;
        file.config.go_template_rendering.allow_env_variables = vec!["CI_*".into()];
        let text = toml::to_string(&file).unwrap();
        let parsed: GiterminismFile = toml::from_str(&text).unwrap();
        assert_eq!(file, parsed);
    }
}
