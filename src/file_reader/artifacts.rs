//! file_reader::artifacts
//!
//! Per-artifact entry points. Each one picks the [`ArtifactKind`] its
//! policy is evaluated under and names itself in errors.

use super::glob::OnEach;
use super::{FileReader, FileReaderError};
use crate::core::config::GITERMINISM_CONFIG_FILE;
use crate::core::glob::PathPattern;
use crate::core::paths;
use crate::core::types::ArtifactKind;
use crate::store::BackingStore;

/// Directory searched for build manifest templates when none is given.
pub const DEFAULT_TEMPLATES_DIR: &str = ".werf";

/// Build manifest names tried in order when none is given.
pub const WERF_CONFIG_NAMES: [&str; 2] = ["werf.yaml", "werf.yml"];

/// A file loaded from a directory tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedFile {
    /// Forward-slash path relative to the loaded directory.
    pub name: String,
    pub data: Vec<u8>,
}

impl<C: BackingStore, W: BackingStore> FileReader<'_, C, W> {
    /// Content of the policy file, or `None` when the project has none.
    ///
    /// The policy file is never accepted uncommitted.
    pub fn read_giterminism_config(&self) -> Result<Option<Vec<u8>>, FileReaderError> {
        self.giterminism_config()
            .map_err(|err| err.context("unable to read giterminism config", GITERMINISM_CONFIG_FILE))
    }

    fn giterminism_config(&self) -> Result<Option<Vec<u8>>, FileReaderError> {
        if !self.is_configuration_file_exist_anywhere(GITERMINISM_CONFIG_FILE)? {
            return Ok(None);
        }
        self.read_checked(ArtifactKind::GiterminismConfig, GITERMINISM_CONFIG_FILE)
            .map(Some)
    }

    /// Content of the build manifest.
    ///
    /// Without `custom_rel_path`, the first of [`WERF_CONFIG_NAMES`] present
    /// in either store is read.
    pub fn read_config(&self, custom_rel_path: Option<&str>) -> Result<Vec<u8>, FileReaderError> {
        let rel_path = match custom_rel_path {
            Some(path) => path.to_string(),
            None => self.default_config_path()?,
        };

        self.read_checked(ArtifactKind::Config, &rel_path)
            .map_err(|err| err.context("unable to read werf config", rel_path))
    }

    fn default_config_path(&self) -> Result<String, FileReaderError> {
        for name in WERF_CONFIG_NAMES {
            if self.is_configuration_file_exist_anywhere(name)? {
                return Ok(name.to_string());
            }
        }
        Ok(WERF_CONFIG_NAMES[0].to_string())
    }

    /// Feed every `**/*.tmpl` file under the templates directory to
    /// `on_each`, named relative to that directory.
    pub fn read_config_template_files(
        &self,
        custom_dir: Option<&str>,
        mut on_each: impl FnMut(&str, Vec<u8>) -> Result<(), FileReaderError>,
    ) -> Result<(), FileReaderError> {
        let dir = custom_dir.unwrap_or(DEFAULT_TEMPLATES_DIR);
        self.config_template_files(dir, &mut on_each)
            .map_err(|err| err.context("unable to read werf config templates dir", dir))
    }

    fn config_template_files(
        &self,
        dir: &str,
        on_each: &mut OnEach<'_>,
    ) -> Result<(), FileReaderError> {
        let dir = paths::clean(dir).map_err(|_| FileReaderError::DirectoryNotFound {
            path: dir.to_string(),
        })?;
        let pattern = PathPattern::new(&paths::join(&globset::escape(&dir), "**/*.tmpl"))?;

        self.configuration_files_glob(ArtifactKind::ConfigTemplate, &pattern, &mut |rel_path, data| {
            let name = paths::strip_dir(&dir, rel_path).unwrap_or(rel_path);
            on_each(name, data)
        })
    }

    /// `.Files.Get` for template rendering.
    pub fn config_go_template_files_get(&self, rel_path: &str) -> Result<Vec<u8>, FileReaderError> {
        self.read_checked(ArtifactKind::ConfigGoTemplateFile, rel_path)
            .map_err(|err| err.context(format!("{{{{ .Files.Get '{}' }}}}", rel_path), rel_path))
    }

    /// `.Files.Glob` for template rendering.
    pub fn config_go_template_files_glob(
        &self,
        pattern: &str,
    ) -> Result<Vec<(String, Vec<u8>)>, FileReaderError> {
        self.glob_files(ArtifactKind::ConfigGoTemplateFile, pattern)
            .map_err(|err| err.context(format!("{{{{ .Files.Glob '{}' }}}}", pattern), pattern))
    }

    /// `.Files.Exists` for template rendering.
    pub fn config_go_template_files_exists(&self, rel_path: &str) -> Result<bool, FileReaderError> {
        self.file_exists(ArtifactKind::ConfigGoTemplateFile, rel_path)
            .map_err(|err| err.context(format!("{{{{ .Files.Exists '{}' }}}}", rel_path), rel_path))
    }

    pub fn read_dockerfile(&self, rel_path: &str) -> Result<Vec<u8>, FileReaderError> {
        self.read_checked(ArtifactKind::Dockerfile, rel_path)
            .map_err(|err| err.context("unable to read dockerfile", rel_path))
    }

    pub fn read_dockerignore(&self, rel_path: &str) -> Result<Vec<u8>, FileReaderError> {
        self.read_checked(ArtifactKind::Dockerignore, rel_path)
            .map_err(|err| err.context("unable to read dockerignore file", rel_path))
    }

    /// Whether a `.dockerignore` exists in either store, regardless of policy.
    pub fn is_dockerignore_exist_anywhere(&self, rel_path: &str) -> Result<bool, FileReaderError> {
        self.is_configuration_file_exist_anywhere(rel_path)
    }

    pub fn read_chart_file(&self, rel_path: &str) -> Result<Vec<u8>, FileReaderError> {
        self.read_checked(ArtifactKind::ChartFile, rel_path)
            .map_err(|err| err.context("unable to read chart file", rel_path))
    }

    /// The symlink-free path of the chart directory `rel_dir`.
    ///
    /// A directory with no readable files is not a chart.
    pub fn locate_chart(&self, rel_dir: &str) -> Result<String, FileReaderError> {
        self.locate_chart_dir(rel_dir)
            .map_err(|err| err.context("unable to locate chart directory", rel_dir))
    }

    fn locate_chart_dir(&self, rel_dir: &str) -> Result<String, FileReaderError> {
        if self.chart_files(rel_dir)?.is_empty() {
            return Err(FileReaderError::DirectoryNotFound {
                path: rel_dir.to_string(),
            });
        }
        self.resolve_directory(rel_dir)
    }

    /// Every file of the chart directory `rel_dir`, named relative to it.
    pub fn load_chart_dir(&self, rel_dir: &str) -> Result<Vec<LoadedFile>, FileReaderError> {
        self.chart_files(rel_dir)
            .map_err(|err| err.context("unable to load chart directory", rel_dir))
    }

    fn chart_files(&self, rel_dir: &str) -> Result<Vec<LoadedFile>, FileReaderError> {
        self.directory_tree(ArtifactKind::ChartFile, rel_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::GiterminismConfig;
    use crate::core::types::{BackingStoreKind, CommitId};
    use crate::manager::RunContext;
    use crate::policy::DenyAll;
    use crate::store::MemoryStore;
    use std::path::PathBuf;

    fn context() -> RunContext {
        RunContext::new(
            PathBuf::from("/project"),
            CommitId::new("e".repeat(40)).unwrap(),
            false,
            Vec::new(),
        )
    }

    fn commit() -> MemoryStore {
        MemoryStore::new(BackingStoreKind::CommitTree)
    }

    mod config {
        use super::*;

        #[test]
        fn falls_back_to_yml() {
            let ctx = context();
            let c = commit().with_file("werf.yml", "project: x");
            let w = c.clone();
            let reader = FileReader::new(&ctx, &c, &w, &DenyAll);
            assert_eq!(reader.read_config(None).unwrap(), b"project: x");
        }

        #[test]
        fn yaml_wins_over_yml() {
            let ctx = context();
            let c = commit().with_file("werf.yaml", "a").with_file("werf.yml", "b");
            let w = c.clone();
            let reader = FileReader::new(&ctx, &c, &w, &DenyAll);
            assert_eq!(reader.read_config(None).unwrap(), b"a");
        }

        #[test]
        fn missing_config_names_operation() {
            let ctx = context();
            let (c, w) = (commit(), commit());
            let reader = FileReader::new(&ctx, &c, &w, &DenyAll);
            let err = reader.read_config(None).unwrap_err();
            assert_eq!(
                err.to_string(),
                "unable to read werf config: the file 'werf.yaml' not found in the project git repository"
            );
        }

        #[test]
        fn custom_path() {
            let ctx = context();
            let c = commit().with_file("deploy/werf.yaml", "custom");
            let w = c.clone();
            let reader = FileReader::new(&ctx, &c, &w, &DenyAll);
            assert_eq!(reader.read_config(Some("deploy/werf.yaml")).unwrap(), b"custom");
        }

        #[test]
        fn policy_file_is_never_accepted_uncommitted() {
            let ctx = context();
            let c = commit();
            let w = MemoryStore::new(BackingStoreKind::Worktree)
                .with_file("giterminism.toml", "[config]\nallow_uncommitted = true\n");
            let config = GiterminismConfig::parse(b"[config]\nallow_uncommitted = true\n").unwrap();
            let reader = FileReader::new(&ctx, &c, &w, &config);

            let err = reader.read_giterminism_config().unwrap_err();
            assert_eq!(
                err.uncommitted_paths(),
                Some(&["giterminism.toml".to_string()][..])
            );
        }

        #[test]
        fn absent_policy_file() {
            let ctx = context();
            let (c, w) = (commit(), commit());
            let reader = FileReader::new(&ctx, &c, &w, &DenyAll);
            assert_eq!(reader.read_giterminism_config().unwrap(), None);
        }
    }

    mod templates {
        use super::*;

        #[test]
        fn names_relative_to_dir() {
            let ctx = context();
            let c = commit()
                .with_file(".werf/a.tmpl", "a")
                .with_file(".werf/sub/b.tmpl", "b")
                .with_file(".werf/readme.md", "-");
            let w = c.clone();
            let reader = FileReader::new(&ctx, &c, &w, &DenyAll);

            let mut seen = Vec::new();
            reader
                .read_config_template_files(None, |name, data| {
                    seen.push((name.to_string(), data));
                    Ok(())
                })
                .unwrap();
            assert_eq!(
                seen,
                vec![
                    ("a.tmpl".to_string(), b"a".to_vec()),
                    ("sub/b.tmpl".to_string(), b"b".to_vec()),
                ]
            );
        }

        #[test]
        fn callback_error_stops_the_walk() {
            let ctx = context();
            let c = commit().with_file("tpl/a.tmpl", "a").with_file("tpl/b.tmpl", "b");
            let w = c.clone();
            let reader = FileReader::new(&ctx, &c, &w, &DenyAll);

            let mut calls = 0;
            let err = reader
                .read_config_template_files(Some("tpl"), |name, _| {
                    calls += 1;
                    Err(FileReaderError::NotFoundInProjectDirectory {
                        path: name.to_string(),
                    })
                })
                .unwrap_err();
            assert_eq!(calls, 1);
            assert!(err
                .to_string()
                .starts_with("unable to read werf config templates dir"));
        }
    }

    mod go_templates {
        use super::*;

        #[test]
        fn get_error_names_the_call() {
            let ctx = context();
            let (c, w) = (commit(), commit());
            let reader = FileReader::new(&ctx, &c, &w, &DenyAll);
            let err = reader.config_go_template_files_get("x.json").unwrap_err();
            assert!(err.to_string().starts_with("{{ .Files.Get 'x.json' }}: "));
        }

        #[test]
        fn exists_and_glob() {
            let ctx = context();
            let c = commit().with_file("data/a.json", "{}");
            let w = c.clone();
            let reader = FileReader::new(&ctx, &c, &w, &DenyAll);
            assert!(reader.config_go_template_files_exists("data/a.json").unwrap());
            assert!(!reader.config_go_template_files_exists("data/b.json").unwrap());
            let files = reader.config_go_template_files_glob("data/*.json").unwrap();
            assert_eq!(files.len(), 1);
        }
    }

    mod dockerfiles {
        use super::*;

        #[test]
        fn dockerignore_anywhere_ignores_policy() {
            let ctx = context();
            let c = commit();
            let w = MemoryStore::new(BackingStoreKind::Worktree).with_file(".dockerignore", "*.log");
            let reader = FileReader::new(&ctx, &c, &w, &DenyAll);
            assert!(reader.is_dockerignore_exist_anywhere(".dockerignore").unwrap());
            let err = reader.read_dockerignore(".dockerignore").unwrap_err();
            assert!(err.to_string().starts_with("unable to read dockerignore file: "));
        }

        #[test]
        fn accepted_dockerfile_reads_worktree() {
            let ctx = context();
            let c = commit().with_file("Dockerfile", "FROM a");
            let w = MemoryStore::new(BackingStoreKind::Worktree).with_file("Dockerfile", "FROM b");
            let config =
                GiterminismConfig::parse(b"[config.dockerfile]\nallow_uncommitted = [\"Dockerfile\"]\n")
                    .unwrap();
            let reader = FileReader::new(&ctx, &c, &w, &config);
            assert_eq!(reader.read_dockerfile("Dockerfile").unwrap(), b"FROM b");
        }
    }

    mod charts {
        use super::*;

        fn chart() -> MemoryStore {
            commit()
                .with_file(".helm/Chart.yaml", "name: app")
                .with_file(".helm/templates/deploy.yaml", "kind: Deployment")
                .with_symlink("chart", ".helm")
                .with_dir("empty")
        }

        #[test]
        fn locate_resolves_symlinked_dir() {
            let ctx = context();
            let (c, w) = (chart(), chart());
            let reader = FileReader::new(&ctx, &c, &w, &DenyAll);
            assert_eq!(reader.locate_chart("chart").unwrap(), ".helm");
        }

        #[test]
        fn load_names_relative_to_chart() {
            let ctx = context();
            let (c, w) = (chart(), chart());
            let reader = FileReader::new(&ctx, &c, &w, &DenyAll);
            let files = reader.load_chart_dir(".helm").unwrap();
            let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
            assert_eq!(names, vec!["Chart.yaml", "templates/deploy.yaml"]);
            assert_eq!(reader.read_chart_file(".helm/Chart.yaml").unwrap(), b"name: app");
        }

        #[test]
        fn empty_dir_is_not_a_chart() {
            let ctx = context();
            let (c, w) = (chart(), chart());
            let reader = FileReader::new(&ctx, &c, &w, &DenyAll);
            let err = reader.locate_chart("empty").unwrap_err();
            assert!(matches!(err.root(), FileReaderError::DirectoryNotFound { .. }));
            assert!(err.to_string().starts_with("unable to locate chart directory: "));
        }

        #[test]
        fn chart_symlink_to_file_is_rejected() {
            let ctx = context();
            let c = chart().with_symlink("bad", ".helm/Chart.yaml");
            let w = c.clone();
            let reader = FileReader::new(&ctx, &c, &w, &DenyAll);
            let err = reader.load_chart_dir("bad").unwrap_err();
            assert!(matches!(err.root(), FileReaderError::NotADirectory { .. }));
            assert!(err.to_string().contains("linked to file not a directory"));

            let err = reader.locate_chart("bad").unwrap_err();
            assert!(matches!(err.root(), FileReaderError::NotADirectory { .. }));
        }
    }
}
