//! Structural deep merge used to build a block's state from its defaults
//! and constructor data.

use crate::Value;

/// Merge `source` into `target`.
///
/// - map into map: key by key, recursing into shared keys
/// - array into array: index-aligned, recursing where both elements are
///   containers of the same kind; extra target elements are kept
/// - anything else: `source` overwrites (scalars, `Null`, opaque leaves)
pub fn deep_merge(target: &mut Value, source: &Value) {
    match (target, source) {
        (Value::Map(target_map), Value::Map(source_map)) => {
            for (key, source_value) in source_map {
                match target_map.get_mut(key) {
                    Some(existing) => deep_merge(existing, source_value),
                    None => {
                        target_map.insert(key.clone(), source_value.clone());
                    }
                }
            }
        }
        (Value::Array(target_items), Value::Array(source_items)) => {
            for (index, source_value) in source_items.iter().enumerate() {
                match target_items.get_mut(index) {
                    Some(existing) => deep_merge(existing, source_value),
                    None => target_items.push(source_value.clone()),
                }
            }
        }
        (target, source) => *target = source.clone(),
    }
}

/// Fold `layers` left to right onto an empty map.
///
/// ```rust
/// use blocks_core::{merge_all, Value};
/// use serde_json::json;
///
/// let defaults = Value::from(json!({"a": {"x": 1}}));
/// let data = Value::from(json!({"a": {"y": 2}}));
/// assert_eq!(merge_all([&defaults, &data]), Value::from(json!({"a": {"x": 1, "y": 2}})));
/// ```
pub fn merge_all<'a>(layers: impl IntoIterator<Item = &'a Value>) -> Value {
    let mut merged = Value::map();
    for layer in layers {
        deep_merge(&mut merged, layer);
    }
    merged
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::Map;
    use proptest::prelude::*;

    fn leaf() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Integer),
            "[a-z]{0,4}".prop_map(Value::String),
        ]
    }

    fn tree() -> impl Strategy<Value = Value> {
        leaf().prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::vec(("[a-c]", inner), 0..4)
                    .prop_map(|entries| Value::Map(entries.into_iter().collect::<Map>())),
            ]
        })
    }

    proptest! {
        /// Merging a value into itself changes nothing.
        #[test]
        fn prop_merge_is_idempotent(v in tree()) {
            let mut target = v.clone();
            deep_merge(&mut target, &v);
            prop_assert_eq!(target, v);
        }

        /// Merging into an empty map reproduces a map source exactly.
        #[test]
        fn prop_merge_into_empty_copies(entries in prop::collection::vec(("[a-c]", tree()), 0..4)) {
            let source = Value::Map(entries.into_iter().collect::<Map>());
            let mut target = Value::map();
            deep_merge(&mut target, &source);
            prop_assert_eq!(target, source);
        }

        /// A scalar leaf of the source is readable at the same path afterwards.
        #[test]
        fn prop_source_scalars_win(a in tree(), key in "[a-c]", leaf in leaf()) {
            let mut target = Value::from_iter([("root", a)]);
            let source = Value::from_iter([("root", Value::from_iter([(key.clone(), leaf.clone())]))]);
            deep_merge(&mut target, &source);
            let path = crate::Path::root().child("root").child(&key);
            prop_assert_eq!(target.get(&path), Some(&leaf));
        }
    }
}
