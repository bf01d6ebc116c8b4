//! lens::path
//!
//! Key-path plumbing: path segments, prefix tests, and resolution of a
//! path against an in-memory root snapshot.

use crate::value::LensValue;

/// One step of a lens path: the key plus the default configured for the
/// value that step addresses.
#[derive(Debug, Clone)]
pub(crate) struct Segment<V> {
    pub key: String,
    pub default: Option<V>,
}

/// True when `prefix` is a (possibly equal) leading run of `path`.
pub(crate) fn is_path_prefix(prefix: &[String], path: &[String]) -> bool {
    prefix.len() <= path.len() && prefix.iter().zip(path).all(|(a, b)| a == b)
}

/// Resolve the value at `keys` inside `root`.
///
/// Walks each key in order; if any step dead-ends, short-circuits to
/// `default` (or `None` when there is none). Never errors - unknown keys
/// are simply absent.
pub(crate) fn resolve_path<V: LensValue>(
    root: &Option<V>,
    keys: &[String],
    default: &Option<V>,
) -> Option<V> {
    let mut current = root.clone();
    for key in keys {
        current = match current {
            Some(value) => value.get(key),
            None => break,
        };
    }
    current.or_else(|| default.clone())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn keys(path: &[&str]) -> Vec<String> {
        path.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn prefix_accepts_equal_and_shorter() {
        let path = keys(&["a", "b", "c"]);
        assert!(is_path_prefix(&keys(&[]), &path));
        assert!(is_path_prefix(&keys(&["a"]), &path));
        assert!(is_path_prefix(&keys(&["a", "b"]), &path));
        assert!(is_path_prefix(&keys(&["a", "b", "c"]), &path));
    }

    #[test]
    fn prefix_rejects_siblings_and_longer() {
        let path = keys(&["a", "b"]);
        assert!(!is_path_prefix(&keys(&["a", "d"]), &path));
        assert!(!is_path_prefix(&keys(&["b"]), &path));
        assert!(!is_path_prefix(&keys(&["a", "b", "c"]), &path));
    }

    #[test]
    fn resolve_walks_nested_objects() {
        let root = Some(json!({"a": {"b": {"c": 3}}}));
        assert_eq!(resolve_path(&root, &keys(&["a", "b", "c"]), &None), Some(json!(3)));
        assert_eq!(resolve_path(&root, &keys(&["a", "b"]), &None), Some(json!({"c": 3})));
        assert_eq!(resolve_path(&root, &keys(&[]), &None), root);
    }

    #[test]
    fn resolve_dead_end_yields_default() {
        let root = Some(json!({"a": 1}));
        let default = Some(json!(0));
        assert_eq!(resolve_path(&root, &keys(&["missing"]), &default), Some(json!(0)));
        assert_eq!(resolve_path(&root, &keys(&["a", "deeper"]), &default), Some(json!(0)));
        assert_eq!(resolve_path(&None, &keys(&["a"]), &default), Some(json!(0)));
    }

    #[test]
    fn resolve_dead_end_without_default_is_absent() {
        let root: Option<serde_json::Value> = None;
        assert_eq!(resolve_path(&root, &keys(&["a"]), &None), None);
    }
}
