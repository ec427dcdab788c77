//! core::glob
//!
//! The single pattern-matching utility shared by the commit-tree walk and the
//! worktree walk.
//!
//! Patterns use `**` for any number of path segments and the usual
//! single-segment wildcards (`*`, `?`, `[...]`, `{a,b}`); `*` never crosses a
//! `/`. Both walks match the same unresolved relative path against the same
//! compiled matcher, so they cannot disagree about what a pattern selects.

use globset::{GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};
use thiserror::Error;

use crate::core::paths;

/// Errors from pattern compilation.
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("invalid glob pattern '{pattern}': {message}")]
    Invalid { pattern: String, message: String },
}

const META_CHARS: [char; 5] = ['*', '?', '[', '{', '\\'];

/// A compiled path pattern.
///
/// # Example
///
/// ```
/// use giterminism::core::glob::PathPattern;
///
/// let pattern = PathPattern::new("templates/**/*.tpl").unwrap();
/// assert!(pattern.matches("templates/a.tpl"));
/// assert!(pattern.matches("templates/x/y/b.tpl"));
/// assert!(!pattern.matches("other/a.tpl"));
/// assert_eq!(pattern.base(), "templates");
/// ```
#[derive(Debug, Clone)]
pub struct PathPattern {
    pattern: String,
    base: String,
    matcher: GlobMatcher,
}

impl PathPattern {
    /// Compile a pattern.
    ///
    /// Leading `./` and duplicate separators are normalized away.
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        let normalized = normalize(pattern);
        let matcher = GlobBuilder::new(&normalized)
            .literal_separator(true)
            .build()
            .map_err(|e| PatternError::Invalid {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })?
            .compile_matcher();

        Ok(Self {
            base: static_base(&normalized),
            pattern: normalized,
            matcher,
        })
    }

    /// Check whether a relative slash path matches.
    pub fn matches(&self, rel_path: &str) -> bool {
        self.matcher.is_match(rel_path)
    }

    /// Longest leading run of wildcard-free segments, excluding the last
    /// segment. Walks start here instead of at the project root.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// The normalized pattern text.
    pub fn as_str(&self) -> &str {
        &self.pattern
    }
}

impl std::fmt::Display for PathPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.pattern)
    }
}

/// A set of patterns answering "is this path covered?".
///
/// A path is covered when it, or any directory above it, matches one of the
/// patterns, so listing a directory covers everything beneath it.
///
/// # Example
///
/// ```
/// use giterminism::core::glob::PatternSet;
///
/// let set = PatternSet::new(&[".helm".to_string(), "*.tmpl".to_string()]).unwrap();
/// assert!(set.covers(".helm/templates/deployment.yaml"));
/// assert!(set.covers("a.tmpl"));
/// assert!(!set.covers("werf.yaml"));
/// ```
#[derive(Debug, Clone)]
pub struct PatternSet {
    patterns: Vec<String>,
    set: GlobSet,
}

impl PatternSet {
    /// Compile a list of patterns.
    pub fn new(patterns: &[String]) -> Result<Self, PatternError> {
        let mut builder = GlobSetBuilder::new();
        let mut normalized = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let pattern_norm = normalize(pattern);
            let glob = GlobBuilder::new(&pattern_norm)
                .literal_separator(true)
                .build()
                .map_err(|e| PatternError::Invalid {
                    pattern: pattern.clone(),
                    message: e.to_string(),
                })?;
            builder.add(glob);
            normalized.push(pattern_norm);
        }

        let set = builder.build().map_err(|e| PatternError::Invalid {
            pattern: patterns.join(", "),
            message: e.to_string(),
        })?;

        Ok(Self {
            patterns: normalized,
            set,
        })
    }

    /// A set that covers nothing.
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
            set: GlobSet::empty(),
        }
    }

    /// Whether `rel_path` or one of its parent directories matches.
    pub fn covers(&self, rel_path: &str) -> bool {
        if self.set.is_empty() {
            return false;
        }

        let mut path = rel_path;
        loop {
            if self.set.is_match(path) {
                return true;
            }
            match path.rfind('/') {
                Some(idx) => path = &path[..idx],
                None => return false,
            }
        }
    }

    /// The normalized patterns.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Default for PatternSet {
    fn default() -> Self {
        Self::empty()
    }
}

fn normalize(pattern: &str) -> String {
    let pattern = paths::to_slash(pattern);
    let segments: Vec<&str> = pattern
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();
    segments.join("/")
}

fn static_base(pattern: &str) -> String {
    let segments = paths::split(pattern);
    let mut base = Vec::new();
    for (idx, segment) in segments.iter().enumerate() {
        if idx + 1 == segments.len() || segment.contains(META_CHARS) {
            break;
        }
        base.push(*segment);
    }
    base.join("/")
}
