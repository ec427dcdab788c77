//! Giterminism - reproducible configuration reads from a git repository
//!
//! Build and deploy tooling reads its configuration (build manifests,
//! templates, Dockerfiles, chart files) through this crate. Content is taken
//! from the committed tree at a fixed head commit, and any uncommitted file or
//! local change is refused unless the project's giterminism policy
//! explicitly trusts it.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`core`] - Domain types, path algebra, pattern matching, policy schema
//! - [`git`] - Single interface for all Git operations
//! - [`store`] - Commit-tree and worktree accessors behind one trait
//! - [`resolver`] - Symlink-safe path resolution and enumeration
//! - [`change`] - Worktree change detection against the head commit
//! - [`policy`] - Acceptance predicates and the inspector
//! - [`file_reader`] - The orchestrator every configuration read goes through
//! - [`manager`] - Composition root and the immutable run context
//!
//! # Correctness Invariants
//!
//! 1. Resolution never leaves the project root, in either store
//! 2. Symlink chains are bounded; cycles fail instead of looping
//! 3. In strict mode, committed content is returned only when the worktree
//!    agrees with it along the whole resolution chain
//! 4. Multi-file reads report every offending path at once

pub mod change;
pub mod core;
pub mod file_reader;
pub mod git;
pub mod manager;
pub mod policy;
pub mod resolver;
pub mod store;
