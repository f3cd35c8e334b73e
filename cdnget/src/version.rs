//! Version string ordering.
//!
//! Versions are ordered by the tuple of their dot-separated segments parsed
//! as integers, with non-numeric segments (pre-release suffixes such as
//! `-rc1`) counting as 0. Versions with equal tuples keep their
//! lexicographic order. This matches the ordering the supported catalogs
//! publish and is deliberately not semantic-versioning precedence.

use std::cmp::Ordering;

fn numeric_tuple(version: &str) -> Vec<i64> {
    version
        .split('.')
        .map(|segment| segment.parse::<i64>().unwrap_or(0))
        .collect()
}

/// Compares two version strings: numeric tuple first, full string as the
/// tiebreak.
pub fn compare(a: &str, b: &str) -> Ordering {
    numeric_tuple(a)
        .cmp(&numeric_tuple(b))
        .then_with(|| a.cmp(b))
}

/// Sorts versions in place, ascending. With `descending` set the sorted
/// result is reversed, so newest releases come first.
pub fn sort(versions: &mut [String], descending: bool) {
    versions.sort_by(|a, b| compare(a, b));
    if descending {
        versions.reverse();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_numeric_not_lexicographic_order() {
        let mut versions = strings(&["1.2.0", "1.10.0", "1.9.0"]);
        sort(&mut versions, true);
        assert_eq!(versions, strings(&["1.10.0", "1.9.0", "1.2.0"]));
    }

    #[test]
    fn test_ascending_sort() {
        let mut versions = strings(&["10.0.1", "2.0.0", "2.0.0", "1.12.4"]);
        sort(&mut versions, false);
        assert_eq!(versions, strings(&["1.12.4", "2.0.0", "2.0.0", "10.0.1"]));
    }

    #[test]
    fn test_non_numeric_segments_count_as_zero() {
        assert_eq!(compare("1.11.0-beta1", "1.11.0-rc1"), Ordering::Less);
        // "0-rc1" parses as 0, so the tuple equals the plain release and
        // the string tiebreak puts the suffixed entry after it.
        assert_eq!(compare("1.11.0", "1.11.0-rc1"), Ordering::Less);
    }

    #[test]
    fn test_suffixed_release_sorts_above_plain_when_descending() {
        let mut versions = strings(&["1.11.0", "1.11.0-rc1", "1.11.0-beta1"]);
        sort(&mut versions, true);
        assert_eq!(
            versions,
            strings(&["1.11.0-rc1", "1.11.0-beta1", "1.11.0"])
        );
    }

    #[test]
    fn test_shorter_tuple_is_a_prefix() {
        assert_eq!(compare("1.2", "1.2.0"), Ordering::Less);
        assert_eq!(compare("1.2.0", "1.2"), Ordering::Greater);
        assert_eq!(compare("3.5.1", "3.5.1"), Ordering::Equal);
    }

    // Property-based tests using proptest
    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn version_strategy() -> impl Strategy<Value = String> {
            (
                0u32..100,
                0u32..100,
                0u32..100,
                prop::sample::select(vec!["", "-beta1", "-rc1", ".min"]),
            )
                .prop_map(|(a, b, c, suffix)| format!("{}.{}.{}{}", a, b, c, suffix))
        }

        proptest! {
            #[test]
            fn test_sort_is_idempotent(
                mut versions in prop::collection::vec(version_strategy(), 0..12)
            ) {
                sort(&mut versions, false);
                let once = versions.clone();
                sort(&mut versions, false);
                prop_assert_eq!(once, versions);
            }

            #[test]
            fn test_descending_is_reversed_ascending(
                versions in prop::collection::vec(version_strategy(), 0..12)
            ) {
                let mut ascending = versions.clone();
                sort(&mut ascending, false);
                let mut descending = versions;
                sort(&mut descending, true);
                ascending.reverse();
                prop_assert_eq!(ascending, descending);
            }

            #[test]
            fn test_compare_is_antisymmetric(
                a in version_strategy(),
                b in version_strategy()
            ) {
                prop_assert_eq!(compare(&a, &b), compare(&b, &a).reverse());
            }
        }
    }
}
