//! Property-based tests for path matching and remapping.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::path::{pattern_matches, remap, should_include};
    use crate::source::Remapping;
    use proptest::prelude::*;

    fn segment() -> impl Strategy<Value = String> {
        "[a-z0-9_-]{1,8}(\\.[a-z]{1,3})?"
    }

    fn rel_path() -> impl Strategy<Value = String> {
        prop::collection::vec(segment(), 1..5).prop_map(|parts| parts.join("/"))
    }

    fn pattern() -> impl Strategy<Value = String> {
        prop_oneof![
            segment(),
            segment().prop_map(|s| format!("{}/**", s)),
            "[a-z]{1,3}".prop_map(|ext| format!("*.{}", ext)),
            (segment(), "[a-z]{1,3}").prop_map(|(dir, ext)| format!("{}/*.{}", dir, ext)),
        ]
    }

    // ============================================================================
    // should_include property tests
    // ============================================================================

    proptest! {
        /// Property: the matcher is deterministic
        #[test]
        fn should_include_is_deterministic(
            path in rel_path(),
            includes in prop::collection::vec(pattern(), 0..4),
            excludes in prop::collection::vec(pattern(), 0..4),
            by_default in any::<bool>(),
        ) {
            let first = should_include(&path, &includes, &excludes, by_default);
            let second = should_include(&path, &includes, &excludes, by_default);
            prop_assert_eq!(first, second);
        }

        /// Property: with include-by-default, anything not excluded is included
        #[test]
        fn not_excluded_is_included_by_default(
            path in rel_path(),
            includes in prop::collection::vec(pattern(), 0..4),
            excludes in prop::collection::vec(pattern(), 0..4),
        ) {
            let excluded = excludes.iter().any(|e| pattern_matches(e, &path));
            prop_assert_eq!(should_include(&path, &includes, &excludes, false), !excluded);
        }

        /// Property: a matching exclude pattern always wins
        #[test]
        fn exclude_always_wins(
            path in rel_path(),
            includes in prop::collection::vec(pattern(), 0..4),
            by_default in any::<bool>(),
        ) {
            // Every path matches itself as a literal pattern
            let excludes = vec![path.clone()];
            let mut includes = includes;
            includes.push(path.clone());
            prop_assert!(!should_include(&path, &includes, &excludes, by_default));
        }

        /// Property: a path is always under its own parent directory pattern
        #[test]
        fn parent_directory_pattern_includes_children(dir in segment(), child in rel_path()) {
            let path = format!("{}/{}", dir, child);
            prop_assert!(pattern_matches(&dir, &path));
            let subtree = format!("{}/**", dir);
            prop_assert!(pattern_matches(&subtree, &path));
        }
    }

    // ============================================================================
    // remap property tests
    // ============================================================================

    proptest! {
        /// Property: without rules, remapping is the identity
        #[test]
        fn remap_without_rules_is_identity(path in rel_path()) {
            prop_assert_eq!(remap(&path, &[]), path);
        }

        /// Property: a directory prefix rule preserves the path tail
        #[test]
        fn remap_prefix_preserves_tail(dir in segment(), tail in rel_path(), target in segment()) {
            let rules = vec![Remapping::new(format!("{}/", dir), format!("{}/", target))];
            let path = format!("{}/{}", dir, tail);
            prop_assert_eq!(remap(&path, &rules), format!("{}/{}", target, tail));
        }
    }
}
