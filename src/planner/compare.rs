//! Field comparison helpers used by the diff engine.

use std::collections::HashMap;

/// Returns true if two optional values differ.
///
/// Absent on both sides is equal, absent on one side only is a difference.
#[must_use]
pub fn option_differs<T: PartialEq + ?Sized>(desired: Option<&T>, observed: Option<&T>) -> bool {
    match (desired, observed) {
        (None, None) => false,
        (Some(a), Some(b)) => a != b,
        _ => true,
    }
}

/// Returns true if two label maps differ.
///
/// Maps differ iff their sizes differ or a key of `desired` is missing from
/// `observed` or maps to another value. Insertion order never matters.
#[must_use]
pub fn labels_differ(desired: &HashMap<String, String>, observed: &HashMap<String, String>) -> bool {
    if desired.len() != observed.len() {
        return true;
    }

    desired
        .iter()
        .any(|(key, value)| observed.get(key) != Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_option_differs() {
        assert!(!option_differs::<str>(None, None));
        assert!(!option_differs(Some("a"), Some("a")));
        assert!(option_differs(Some("a"), Some("b")));
        assert!(option_differs(Some("a"), None));
        assert!(option_differs(None, Some(&5_i64)));
    }

    #[test]
    fn test_labels_order_independent() {
        let a = labels(&[("a", "1"), ("b", "2")]);
        let b = labels(&[("b", "2"), ("a", "1")]);

        assert!(!labels_differ(&a, &b));
        assert!(!labels_differ(&b, &a));
    }

    #[test]
    fn test_labels_differ_symmetric() {
        let small = labels(&[("a", "1")]);
        let large = labels(&[("a", "1"), ("b", "2")]);
        let changed = labels(&[("a", "2")]);
        let renamed = labels(&[("c", "1")]);

        for (x, y) in [(&small, &large), (&small, &changed), (&small, &renamed)] {
            assert!(labels_differ(x, y));
            assert!(labels_differ(y, x));
        }
    }

    #[test]
    fn test_empty_labels_equal() {
        assert!(!labels_differ(&HashMap::new(), &HashMap::new()));
    }
}
