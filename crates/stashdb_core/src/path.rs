//! Dotted-path traversal inside stored values.
//!
//! `a.b.c` addresses field `c` of field `b` of the top-level key `a`.
//! Numeric segments index into arrays.

use serde_json::{Map, Value};

/// Splits a dotted path into its top-level key and the remaining segments.
pub(crate) fn split(path: &str) -> (&str, Vec<&str>) {
    let mut segments = path.split('.');
    let head = segments.next().unwrap_or_default();
    (head, segments.collect())
}

/// Follows `segments` from `root`. Missing segments and `null` leaves
/// resolve to `None`.
pub(crate) fn lookup<'a>(root: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    segments
        .iter()
        .try_fold(root, |current, segment| match current {
            Value::Object(map) => map.get(*segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
        .filter(|value| !value.is_null())
}

/// Writes `value` at `segments` below `root`, creating objects along the
/// way. Scalars in the way are replaced by objects.
pub(crate) fn assign(root: &mut Value, segments: &[&str], value: Value) {
    let mut current = root;
    for segment in segments {
        current = child_mut(current, segment);
    }
    *current = value;
}

fn child_mut<'a>(current: &'a mut Value, segment: &str) -> &'a mut Value {
    let index = match current {
        Value::Array(items) => segment.parse::<usize>().ok().filter(|i| *i < items.len()),
        _ => None,
    };
    if let Some(index) = index {
        return &mut current[index];
    }
    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    &mut current[segment]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn split_head_and_rest() {
        assert_eq!(split("a.b.c"), ("a", vec!["b", "c"]));
        assert_eq!(split("a"), ("a", vec![]));
    }

    #[test]
    fn lookup_objects_and_arrays() {
        let value = json!({"b": {"c": 5}, "list": [10, {"x": true}], "n": null});
        assert_eq!(lookup(&value, &["b", "c"]), Some(&json!(5)));
        assert_eq!(lookup(&value, &["list", "1", "x"]), Some(&json!(true)));
        assert_eq!(lookup(&value, &["b", "missing"]), None);
        assert_eq!(lookup(&value, &["list", "9"]), None);
        assert_eq!(lookup(&value, &["b", "c", "deeper"]), None);
        assert_eq!(lookup(&value, &["n"]), None);
        assert_eq!(lookup(&value, &[]), Some(&value));
    }

    #[test]
    fn assign_vivifies() {
        let mut root = Value::Null;
        assign(&mut root, &["b", "c"], json!(5));
        assert_eq!(root, json!({"b": {"c": 5}}));
    }

    #[test]
    fn assign_replaces_scalars_in_the_way() {
        let mut root = json!({"b": 1});
        assign(&mut root, &["b", "c"], json!("x"));
        assert_eq!(root, json!({"b": {"c": "x"}}));
    }

    #[test]
    fn assign_into_arrays() {
        let mut root = json!({"list": [1, 2]});
        assign(&mut root, &["list", "1"], json!(20));
        assert_eq!(root, json!({"list": [1, 20]}));

        assign(&mut root, &["list", "7"], json!(0));
        assert_eq!(root, json!({"list": {"7": 0}}));
    }

    proptest! {
        #[test]
        fn assign_then_lookup(segments in prop::collection::vec("[a-z]{1,6}", 1..5), n in any::<i64>()) {
            let refs: Vec<&str> = segments.iter().map(String::as_str).collect();
            let mut root = json!({});
            assign(&mut root, &refs, json!(n));
            prop_assert_eq!(lookup(&root, &refs), Some(&json!(n)));
        }
    }
}
