//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

use giterminism::core::types::CommitId;
use giterminism::git::Git;

/// Test fixture that creates a real git repository.
pub struct TestRepo {
    dir: TempDir,
}

impl TestRepo {
    /// Create a new test repository with an initial commit.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        init_repo(dir.path());

        std::fs::write(dir.path().join("README.md"), "# Test Repo\n").unwrap();
        run_git(dir.path(), &["add", "README.md"]);
        run_git(dir.path(), &["commit", "-m", "Initial commit"]);

        Self { dir }
    }

    /// Clone `source` without initializing its submodules.
    pub fn clone_of(source: &TestRepo) -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        run_git(
            dir.path(),
            &["clone", &source.path().to_string_lossy(), "."],
        );
        run_git(dir.path(), &["config", "user.email", "test@example.com"]);
        run_git(dir.path(), &["config", "user.name", "Test User"]);
        Self { dir }
    }

    /// Get the path to the repository.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path of `rel` inside the repository.
    pub fn abs(&self, rel: &str) -> PathBuf {
        self.path().join(rel)
    }

    /// Open a Git interface to this repository.
    pub fn git(&self) -> Git {
        Git::open(self.path()).expect("failed to open test repo")
    }

    pub fn head(&self) -> CommitId {
        self.git().head_commit().unwrap()
    }

    /// Write a file in the worktree without committing it.
    pub fn write(&self, rel: &str, content: impl AsRef<[u8]>) {
        let path = self.abs(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    /// Create a symlink in the worktree without committing it.
    pub fn symlink(&self, rel: &str, target: &str) {
        let path = self.abs(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::os::unix::fs::symlink(target, path).unwrap();
    }

    pub fn remove(&self, rel: &str) {
        std::fs::remove_file(self.abs(rel)).unwrap();
    }

    /// Stage everything and commit.
    pub fn commit_all(&self, message: &str) -> CommitId {
        run_git(self.path(), &["add", "-A"]);
        run_git(self.path(), &["commit", "-m", message]);
        self.head()
    }

    /// Create a file and commit it.
    pub fn commit_file(&self, rel: &str, content: impl AsRef<[u8]>) -> CommitId {
        self.write(rel, content);
        self.commit_all(&format!("add {}", rel))
    }

    /// Add `source` as a checked-out submodule at `rel` and commit.
    pub fn add_submodule(&self, source: &TestRepo, rel: &str) -> CommitId {
        run_git(
            self.path(),
            &[
                "-c",
                "protocol.file.allow=always",
                "submodule",
                "add",
                &source.path().to_string_lossy(),
                rel,
            ],
        );
        self.commit_all(&format!("add submodule {}", rel))
    }
}

fn init_repo(dir: &Path) {
    run_git(dir, &["init"]);
    run_git(dir, &["config", "user.email", "test@example.com"]);
    run_git(dir, &["config", "user.name", "Test User"]);
    run_git(dir, &["config", "core.autocrlf", "false"]);
    run_git(dir, &["config", "core.symlinks", "true"]);
}

/// Run a git command in the given directory.
pub fn run_git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git command failed");

    if !output.status.success() {
        panic!(
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
    }
}
