//! Property-based tests for path algebra and resolution.
//!
//! These tests use proptest to verify invariants hold across
//! randomly generated inputs.

use proptest::prelude::*;

use giterminism::core::glob::PathPattern;
use giterminism::core::paths;
use giterminism::core::types::BackingStoreKind;
use giterminism::resolver::{ResolveError, Resolver, MAX_SYMLINK_DEPTH};
use giterminism::store::MemoryStore;

/// Strategy for a single plain path segment.
fn segment() -> impl Strategy<Value = String> {
    "[a-z0-9_-]{1,8}".prop_filter("no dot segments", |s| s != "." && s != "..")
}

/// Strategy for a clean relative path of 1..6 segments.
fn rel_path() -> impl Strategy<Value = String> {
    prop::collection::vec(segment(), 1..6).prop_map(|segments| segments.join("/"))
}

/// Strategy for a path with redundant `.` segments and separators.
fn noisy_path() -> impl Strategy<Value = (String, String)> {
    prop::collection::vec((segment(), prop::bool::ANY, prop::bool::ANY), 1..6).prop_map(
        |parts| {
            let clean: Vec<&str> = parts.iter().map(|(s, _, _)| s.as_str()).collect();
            let mut noisy = String::new();
            for (s, dot, double) in &parts {
                if *dot {
                    noisy.push_str("./");
                }
                noisy.push_str(s);
                noisy.push('/');
                if *double {
                    noisy.push('/');
                }
            }
            (noisy, clean.join("/"))
        },
    )
}

fn store() -> MemoryStore {
    MemoryStore::new(BackingStoreKind::Worktree)
}

proptest! {
    #[test]
    fn clean_is_idempotent(path in rel_path()) {
        let once = paths::clean(&path).unwrap();
        prop_assert_eq!(paths::clean(&once).unwrap(), once.clone());
        prop_assert_eq!(once, path);
    }

    #[test]
    fn clean_strips_noise((noisy, clean) in noisy_path()) {
        prop_assert_eq!(paths::clean(&noisy).unwrap(), clean);
    }

    #[test]
    fn parent_escape_is_rejected(path in rel_path()) {
        let depth = paths::split(&path).len();
        let escaping = format!("{}{}", "../".repeat(depth + 1), path);
        prop_assert!(paths::clean(&escaping).is_err());
    }

    #[test]
    fn strip_dir_inverts_join(dir in rel_path(), rel in rel_path()) {
        let joined = paths::join(&dir, &rel);
        prop_assert_eq!(paths::strip_dir(&dir, &joined), Some(rel.as_str()));
        prop_assert!(paths::is_within(&dir, &joined));
    }

    #[test]
    fn plain_paths_resolve_to_themselves(path in rel_path()) {
        let store = store().with_file(&path, "x");
        let resolved = Resolver::new(&store).resolve(&path).unwrap();
        prop_assert_eq!(&resolved.canonical, &path);
        prop_assert_eq!(&resolved.original, &path);
        prop_assert!(resolved.links.is_empty());
    }

    #[test]
    fn chains_below_the_bound_resolve(len in 1usize..64) {
        let mut store = store().with_file("target", "x");
        for i in 0..len {
            let next = if i + 1 == len { "target".to_string() } else { format!("l{}", i + 1) };
            store = store.with_symlink(&format!("l{}", i), &next);
        }
        let resolved = Resolver::new(&store).resolve("l0").unwrap();
        prop_assert_eq!(resolved.canonical.as_str(), "target");
        prop_assert_eq!(resolved.links.len(), len);
    }

    #[test]
    fn escaping_links_fail(name in segment(), depth in 1usize..4) {
        let target = format!("{}outside", "../".repeat(depth));
        let store = store().with_symlink(&name, &target);
        let result = Resolver::new(&store).resolve(&name);
        let escaped = matches!(result, Err(ResolveError::PathEscapesProject { .. }));
        prop_assert!(escaped);
    }

    #[test]
    fn literal_pattern_matches_only_itself(path in rel_path(), other in rel_path()) {
        let pattern = PathPattern::new(&globset::escape(&path)).unwrap();
        prop_assert!(pattern.matches(&path));
        prop_assert_eq!(pattern.matches(&other), other == path);
    }
}

#[test]
fn chain_at_the_bound_fails() {
    let mut store = store().with_file("target", "x");
    for i in 0..MAX_SYMLINK_DEPTH {
        let next = if i + 1 == MAX_SYMLINK_DEPTH {
            "target".to_string()
        } else {
            format!("l{}", i + 1)
        };
        store = store.with_symlink(&format!("l{}", i), &next);
    }

    let result = Resolver::new(&store).resolve("l0");
    assert!(matches!(
        result,
        Err(ResolveError::TooManyLevelsOfSymbolicLinks { .. })
    ));
}
