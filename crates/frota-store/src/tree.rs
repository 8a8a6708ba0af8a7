//! JSON tree helpers shared by the memory and SQLite backends.
//!
//! Null and empty containers are never stored: writing one deletes the
//! node, and parents left empty disappear with it. Arrays are leaves for
//! writes; writing beneath an array replaces it with an object.

use serde_json::{Map, Value};

/// Node at `segments` below `node`. Array elements are addressable by index.
pub fn get<'a>(node: &'a Value, segments: &[String]) -> Option<&'a Value> {
    let mut current = node;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    if is_empty(current) {
        None
    } else {
        Some(current)
    }
}

/// Writes `value` at `segments` below `node`, pruning as it goes.
pub fn set(node: &mut Value, segments: &[String], value: Value) {
    set_pruned(node, segments, prune(value));
}

fn set_pruned(node: &mut Value, segments: &[String], value: Option<Value>) {
    let Some((head, rest)) = segments.split_first() else {
        *node = value.unwrap_or(Value::Null);
        return;
    };

    match value {
        None => {
            if let Value::Object(map) = node {
                if rest.is_empty() {
                    map.remove(head);
                } else if let Some(child) = map.get_mut(head) {
                    set_pruned(child, rest, None);
                    if is_empty(child) {
                        map.remove(head);
                    }
                }
            }
        }
        Some(value) => {
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            if let Value::Object(map) = node {
                let child = map.entry(head.clone()).or_insert(Value::Null);
                set_pruned(child, rest, Some(value));
            }
        }
    }
}

/// Drops nulls and empty containers, recursively. `None` when nothing is left.
pub fn prune(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(map) => {
            let pruned: Map<String, Value> = map
                .into_iter()
                .filter_map(|(k, v)| prune(v).map(|v| (k, v)))
                .collect();
            if pruned.is_empty() {
                None
            } else {
                Some(Value::Object(pruned))
            }
        }
        Value::Array(items) => {
            let pruned: Vec<Value> = items.into_iter().filter_map(prune).collect();
            if pruned.is_empty() {
                None
            } else {
                Some(Value::Array(pruned))
            }
        }
        scalar => Some(scalar),
    }
}

pub fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
