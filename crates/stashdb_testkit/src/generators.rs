//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random keys, paths and JSON values.

use proptest::prelude::*;
use serde_json::{Map, Value};

/// Strategy for generating storage keys, including awkward characters.
pub fn key_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9_ `'\\-]{1,24}").expect("Invalid regex")
}

/// Strategy for generating dotted paths of one to four segments.
pub fn dotted_path_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop::string::string_regex("[a-z][a-z0-9_]{0,7}").expect("Invalid regex"),
        1..5,
    )
    .prop_map(|segments| segments.join("."))
}

/// Strategy for generating scalar JSON values.
pub fn json_scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        // quarters survive a text round trip exactly
        (-1_000_000i64..1_000_000).prop_map(|n| Value::from(n as f64 / 4.0)),
        "\\PC{0,32}".prop_map(Value::String),
    ]
}

/// Strategy for generating nested JSON values.
pub fn json_value_strategy() -> impl Strategy<Value = Value> {
    json_scalar_strategy().prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..8).prop_map(Value::Array),
            prop::collection::vec(("[a-z]{1,8}", inner), 0..8)
                .prop_map(|pairs| Value::Object(pairs.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn paths_have_no_empty_segments(path in dotted_path_strategy()) {
            prop_assert!(path.split('.').all(|s| !s.is_empty()));
        }

        #[test]
        fn values_serialize(value in json_value_strategy()) {
            let text = serde_json::to_string(&value).unwrap();
            let back: Value = serde_json::from_str(&text).unwrap();
            prop_assert_eq!(back.is_object(), value.is_object());
        }
    }
}
