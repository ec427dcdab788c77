//! core
//!
//! Core domain types and utilities shared by every layer.
//!
//! # Modules
//!
//! - [`types`] - Strong types: CommitId, EntryKind, ResolvedPath, etc.
//! - [`paths`] - Forward-slash path algebra and worktree cache routing
//! - [`glob`] - The one pattern matcher used by both backing stores
//! - [`config`] - Giterminism policy schema and loading
//! - [`lock`] - Advisory lock for the worktree cache
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and self-describing
//! - Nothing here touches git or the filesystem of the project

pub mod config;
pub mod glob;
pub mod lock;
pub mod paths;
pub mod types;
