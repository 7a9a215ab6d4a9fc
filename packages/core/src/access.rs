//! Writing through dotted paths and computing what changed.
//!
//! Every write reports the minimal sub-graph that differs, wrapped in maps
//! from the root down to the written location. That diff is what change
//! signals are expanded from.

use indexmap::map::Entry;

use crate::merge::deep_merge;
use crate::{Map, Path, PathError, Value};

/// Read the value at `path`; absent intermediates yield `None`.
pub fn get_path<'a>(tree: &'a Value, path: &Path) -> Option<&'a Value> {
    tree.get(path)
}

/// Padding allowed past the end of an array before an index is rejected.
pub const MAX_ARRAY_PADDING: usize = 1024;

/// Set a value at the given path and return what changed.
///
/// Intermediate containers are created as needed: absent keys, `Null` and
/// scalar intermediates become maps, array indices past the end pad the
/// array with `Null` (at most [`MAX_ARRAY_PADDING`] elements). Returns
/// `None` when the write changed nothing.
///
/// When the write has to change the type of a container on the way (a
/// scalar becomes a map, an array addressed by name becomes a map), the
/// whole replaced container is reported rather than just the written leaf.
///
/// # Errors
///
/// [`PathError::IndexOutOfRange`] when a numeric component lands too far
/// past the end of an existing array. The tree is left untouched.
pub fn set_path(tree: &mut Value, path: &Path, value: Value) -> Result<Option<Value>, PathError> {
    let Some((last, prefix)) = path.components.split_last() else {
        let changed = diff(tree, &value);
        *tree = value;
        return Ok(changed);
    };

    // Depth of the shallowest container whose type the write changed.
    let mut replaced = None;
    let mut cursor = &mut *tree;
    for (depth, component) in prefix.iter().enumerate() {
        if ensure_addressable(cursor, component)? {
            replaced.get_or_insert(depth);
        }
        cursor = child_or_create(cursor, component)?;
    }
    if ensure_addressable(cursor, last)? {
        replaced.get_or_insert(prefix.len());
    }

    let changed = match slot(cursor, last)? {
        Slot::Existing(existing) => {
            let changed = diff(existing, &value);
            *existing = value;
            changed
        }
        Slot::Created(created) => {
            *created = value.clone();
            Some(value)
        }
    };

    match replaced {
        Some(depth) => {
            let at = path.slice(0, depth);
            let whole = tree.get(&at).cloned().unwrap_or_default();
            Ok(Some(wrap(&at, whole)))
        }
        None => Ok(changed.map(|changed| wrap(path, changed))),
    }
}

/// Deep-merge `value` into whatever lives at `path` and return what changed.
pub fn merge_path(tree: &mut Value, path: &Path, value: &Value) -> Result<Option<Value>, PathError> {
    let mut merged = tree.get(path).cloned().unwrap_or(Value::Null);
    if !merged.is_container() || !value.is_container() {
        merged = Value::Null;
    }
    if merged.is_null() {
        return set_path(tree, path, value.clone());
    }
    deep_merge(&mut merged, value);
    set_path(tree, path, merged)
}

/// The part of `new` that differs from `old`, or `None` if they are equal.
///
/// Maps are compared key by key; keys that disappeared are reported as
/// `Null`. Any other difference is reported as the whole new value.
pub fn diff(old: &Value, new: &Value) -> Option<Value> {
    if old == new {
        return None;
    }

    match (old, new) {
        (Value::Map(old_map), Value::Map(new_map)) => {
            let mut changed = Map::new();
            for (key, new_value) in new_map {
                match old_map.get(key) {
                    Some(old_value) => {
                        if let Some(d) = diff(old_value, new_value) {
                            changed.insert(key.clone(), d);
                        }
                    }
                    None => {
                        changed.insert(key.clone(), new_value.clone());
                    }
                }
            }
            for key in old_map.keys() {
                if !new_map.contains_key(key) {
                    changed.insert(key.clone(), Value::Null);
                }
            }
            if changed.is_empty() {
                None
            } else {
                Some(Value::Map(changed))
            }
        }
        _ => Some(new.clone()),
    }
}

/// Expand a root-anchored diff into `(path, sub-diff)` pairs, one per map
/// key encountered, most specific first.
///
/// The root itself is the last pair. Siblings appear in map order.
///
/// ```rust
/// use blocks_core::{access::change_signals, Value};
/// use serde_json::json;
///
/// let signals = change_signals(&Value::from(json!({"a": {"b": 1}})));
/// let paths: Vec<String> = signals.iter().map(|(p, _)| p.to_string()).collect();
/// assert_eq!(paths, vec!["a.b", "a", ""]);
/// ```
pub fn change_signals(changed: &Value) -> Vec<(Path, Value)> {
    let mut signals = Vec::new();
    collect_signals(Path::root(), changed, &mut signals);
    signals
}

fn collect_signals(path: Path, data: &Value, signals: &mut Vec<(Path, Value)>) {
    if let Value::Map(map) = data {
        for (key, value) in map {
            collect_signals(path.child(key), value, signals);
        }
    }
    signals.push((path, data.clone()));
}

fn wrap(path: &Path, leaf: Value) -> Value {
    path.components.iter().rev().fold(leaf, |acc, component| {
        let mut map = Map::new();
        map.insert(component.clone(), acc);
        Value::Map(map)
    })
}

enum Slot<'a> {
    Existing(&'a mut Value),
    Created(&'a mut Value),
}

/// Resolve `key` as an index into an array of length `len`.
///
/// `Ok(None)` means the key is a name, not an index.
fn array_index(key: &str, len: usize) -> Result<Option<usize>, PathError> {
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(None);
    }
    match key.parse::<usize>() {
        Ok(index) if index <= len.saturating_add(MAX_ARRAY_PADDING) => Ok(Some(index)),
        _ => Err(PathError::IndexOutOfRange {
            index: key.to_string(),
            len,
        }),
    }
}

/// Locate the final write target under an addressable `parent`, creating
/// it if missing.
fn slot<'a>(parent: &'a mut Value, key: &str) -> Result<Slot<'a>, PathError> {
    match parent {
        Value::Map(map) => Ok(match map.entry(key.to_string()) {
            Entry::Occupied(entry) => Slot::Existing(entry.into_mut()),
            Entry::Vacant(entry) => Slot::Created(entry.insert(Value::Null)),
        }),
        Value::Array(items) => {
            let index = array_index(key, items.len())?.unwrap_or(items.len());
            if index < items.len() {
                Ok(Slot::Existing(&mut items[index]))
            } else {
                items.resize(index + 1, Value::Null);
                Ok(Slot::Created(&mut items[index]))
            }
        }
        _ => unreachable!("ensure_addressable leaves a container"),
    }
}

/// Step into `key` under an addressable `parent`, creating maps on the way.
fn child_or_create<'a>(parent: &'a mut Value, key: &str) -> Result<&'a mut Value, PathError> {
    match parent {
        Value::Map(map) => Ok(map.entry(key.to_string()).or_insert_with(Value::map)),
        Value::Array(items) => {
            let index = array_index(key, items.len())?.unwrap_or(items.len());
            if index >= items.len() {
                items.resize(index + 1, Value::Null);
            }
            Ok(&mut items[index])
        }
        _ => unreachable!("ensure_addressable leaves a container"),
    }
}

/// Turn `parent` into a container that can hold `key`. Returns whether
/// the container had to change type.
///
/// Leaves become empty maps. An array addressed by a name is re-keyed into
/// a map so its elements stay reachable by index.
fn ensure_addressable(parent: &mut Value, key: &str) -> Result<bool, PathError> {
    let replacement = match parent {
        Value::Map(_) => return Ok(false),
        Value::Array(items) => {
            if array_index(key, items.len())?.is_some() {
                return Ok(false);
            }
            Value::Map(
                std::mem::take(items)
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| (i.to_string(), v))
                    .collect(),
            )
        }
        _ => Value::map(),
    };
    *parent = replacement;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path;
    use serde_json::json;

    fn test_tree() -> Value {
        Value::from(json!({
            "name": "Alice",
            "address": {"city": "NYC", "zip": "10001"},
            "scores": [90, 85, 95]
        }))
    }

    // ==================== set_path tests ====================

    fn set(tree: &mut Value, p: &str, value: Value) -> Option<Value> {
        set_path(tree, &Path::parse(p).unwrap(), value).unwrap()
    }

    #[test]
    fn set_then_get() {
        let mut tree = test_tree();
        set(&mut tree, "address.city", Value::from("LA"));
        assert_eq!(tree.get(&path!("address.city")), Some(&Value::from("LA")));
        assert_eq!(tree.get(&path!("address.zip")), Some(&Value::from("10001")));
    }

    #[test]
    fn set_reports_only_the_changed_leaf() {
        let mut tree = test_tree();
        let changed = set(&mut tree, "address.city", Value::from("LA"));
        assert_eq!(changed, Some(Value::from(json!({"address": {"city": "LA"}}))));
    }

    #[test]
    fn set_object_reports_minimal_sub_graph() {
        let mut tree = test_tree();
        let changed = set(
            &mut tree,
            "address",
            Value::from(json!({"city": "NYC", "zip": "10002"})),
        );
        assert_eq!(changed, Some(Value::from(json!({"address": {"zip": "10002"}}))));
    }

    #[test]
    fn set_reports_removed_keys_as_null() {
        let mut tree = test_tree();
        let changed = set(&mut tree, "address", Value::from(json!({"city": "NYC"})));
        assert_eq!(changed, Some(Value::from(json!({"address": {"zip": null}}))));
        assert_eq!(tree.get(&path!("address.zip")), None);
    }

    #[test]
    fn set_same_value_changes_nothing() {
        let mut tree = test_tree();
        assert_eq!(set(&mut tree, "name", Value::from("Alice")), None);
        assert_eq!(tree, test_tree());
    }

    #[test]
    fn set_creates_intermediate_maps() {
        let mut tree = Value::map();
        let changed = set(&mut tree, "a.b.c", Value::from(1));
        assert_eq!(tree, Value::from(json!({"a": {"b": {"c": 1}}})));
        assert_eq!(changed, Some(Value::from(json!({"a": {"b": {"c": 1}}}))));
    }

    #[test]
    fn set_through_scalar_reports_the_new_container() {
        let mut tree = test_tree();
        let changed = set(&mut tree, "name.first.initial", Value::from("A"));
        let expected = json!({"first": {"initial": "A"}});
        assert_eq!(tree.get(&path!("name")), Some(&Value::from(expected.clone())));
        assert_eq!(changed, Some(Value::from(json!({"name": expected}))));
    }

    #[test]
    fn set_on_null_root() {
        let mut tree = Value::Null;
        let changed = set(&mut tree, "foo", Value::from("bar"));
        assert_eq!(tree, Value::from(json!({"foo": "bar"})));
        assert_eq!(changed, Some(tree.clone()));
    }

    #[test]
    fn set_array_element() {
        let mut tree = test_tree();
        let changed = set(&mut tree, "scores.1", Value::from(100));
        assert_eq!(tree.get(&path!("scores.1")), Some(&Value::from(100)));
        assert_eq!(changed, Some(Value::from(json!({"scores": {"1": 100}}))));
    }

    #[test]
    fn set_array_past_end_pads_with_null() {
        let mut tree = test_tree();
        set(&mut tree, "scores.5", Value::from(1));
        assert_eq!(
            tree.get(&path!("scores")),
            Some(&Value::from(json!([90, 85, 95, null, null, 1])))
        );
    }

    #[test]
    fn set_far_past_the_end_is_rejected() {
        let mut tree = Value::from(json!({"items": [1, 2]}));
        for index in [
            (2 + MAX_ARRAY_PADDING + 1).to_string(),
            usize::MAX.to_string(),
            "99999999999999999999999999".to_string(),
        ] {
            let p = Path::parse(&format!("items.{}.x", index)).unwrap();
            let err = set_path(&mut tree, &p, Value::from(1)).unwrap_err();
            assert_eq!(err, PathError::IndexOutOfRange { index, len: 2 });
        }
        assert_eq!(tree, Value::from(json!({"items": [1, 2]})));

        let edge = format!("items.{}", 2 + MAX_ARRAY_PADDING);
        set(&mut tree, &edge, Value::from(3));
        assert_eq!(tree.get(&Path::parse(&edge).unwrap()), Some(&Value::from(3)));
    }

    #[test]
    fn set_named_key_on_array_reports_the_whole_map() {
        let mut tree = test_tree();
        let changed = set(&mut tree, "scores.best", Value::from(95));
        let expected = json!({"0": 90, "1": 85, "2": 95, "best": 95});
        assert_eq!(tree.get(&path!("scores")), Some(&Value::from(expected.clone())));
        assert_eq!(changed, Some(Value::from(json!({"scores": expected}))));
    }

    #[test]
    fn set_root_replaces_entire_tree() {
        let mut tree = test_tree();
        let changed = set(&mut tree, "", Value::from("replaced"));
        assert_eq!(tree, Value::from("replaced"));
        assert_eq!(changed, Some(Value::from("replaced")));
    }

    #[test]
    fn set_null_on_absent_key_is_a_change() {
        let mut tree = Value::map();
        let changed = set(&mut tree, "flag", Value::Null);
        assert_eq!(changed, Some(Value::from(json!({"flag": null}))));
    }

    // ==================== merge_path tests ====================

    #[test]
    fn merge_path_keeps_unmentioned_keys() {
        let mut tree = test_tree();
        let changed =
            merge_path(&mut tree, &path!("address"), &Value::from(json!({"zip": "1"}))).unwrap();
        assert_eq!(tree.get(&path!("address.city")), Some(&Value::from("NYC")));
        assert_eq!(changed, Some(Value::from(json!({"address": {"zip": "1"}}))));
    }

    #[test]
    fn merge_path_at_root() {
        let mut tree = test_tree();
        let changed = merge_path(&mut tree, &Path::root(), &Value::from(json!({"age": 3}))).unwrap();
        assert_eq!(changed, Some(Value::from(json!({"age": 3}))));
        assert_eq!(tree.get(&path!("name")), Some(&Value::from("Alice")));
    }

    // ==================== change_signals tests ====================

    #[test]
    fn signals_are_leaf_first() {
        let changed = Value::from(json!({"a": {"b": {"x": 1, "y": 2}}, "c": 3}));
        let paths: Vec<String> = change_signals(&changed)
            .into_iter()
            .map(|(p, _)| p.to_string())
            .collect();
        assert_eq!(paths, vec!["a.b.x", "a.b.y", "a.b", "a", "c", ""]);
    }

    #[test]
    fn signals_carry_sub_diffs() {
        let changed = Value::from(json!({"a": {"b": 1}}));
        let signals = change_signals(&changed);
        assert_eq!(signals[0].1, Value::from(1));
        assert_eq!(signals[1].1, Value::from(json!({"b": 1})));
        assert_eq!(signals[2].1, changed);
    }

    #[test]
    fn arrays_are_not_expanded() {
        let signals = change_signals(&Value::from(json!({"list": [1, 2]})));
        assert_eq!(signals.len(), 2);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
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

    fn path() -> impl Strategy<Value = Path> {
        prop::collection::vec(prop_oneof!["[a-c]", "[0-2]"], 0..4)
            .prop_map(|components| Path::try_from_components(components).unwrap())
    }

    proptest! {
        /// set(p, v) followed by get(p) yields v.
        #[test]
        fn prop_set_then_get(start in tree(), p in path(), v in tree()) {
            let mut state = start;
            set_path(&mut state, &p, v.clone()).unwrap();
            prop_assert_eq!(state.get(&p), Some(&v));
        }

        /// A repeated write reports no change.
        #[test]
        fn prop_second_write_is_a_no_op(start in tree(), p in path(), v in tree()) {
            let mut state = start;
            set_path(&mut state, &p, v.clone()).unwrap();
            prop_assert_eq!(set_path(&mut state, &p, v).unwrap(), None);
        }

        /// The diff is empty exactly when the values are equal.
        #[test]
        fn prop_diff_is_empty_only_for_equal(a in tree(), b in tree()) {
            prop_assert_eq!(diff(&a, &b).is_none(), a == b);
        }
    }
}
