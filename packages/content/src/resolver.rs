//! Get/set over a Content Tree.
//!
//! `get` never fails: anything it cannot resolve is `None`. `set` creates
//! missing mappings on the way down and reports every other structural
//! mismatch as a [`PathError`], leaving the tree untouched.

use crate::error::{PathError, PathResult};
use crate::path::{EditPath, Segment};
use serde_json::{Map, Value};

/// Resolve a dotted path. Malformed paths resolve to `None`.
pub fn get<'a>(tree: &'a Value, path: &str) -> Option<&'a Value> {
    let path = EditPath::parse(path).ok()?;
    get_path(tree, &path)
}

pub fn get_path<'a>(tree: &'a Value, path: &EditPath) -> Option<&'a Value> {
    let mut current = tree;
    for segment in path.segments() {
        current = match (segment, current) {
            (Segment::Key(key), Value::Object(map)) => map.get(key)?,
            (Segment::Index(index), Value::Array(items)) => items.get(*index)?,
            _ => return None,
        };
    }
    Some(current)
}

fn get_path_mut<'a>(tree: &'a mut Value, path: &EditPath) -> Option<&'a mut Value> {
    let mut current = tree;
    for segment in path.segments() {
        current = match (segment, current) {
            (Segment::Key(key), Value::Object(map)) => map.get_mut(key)?,
            (Segment::Index(index), Value::Array(items)) => items.get_mut(*index)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Write `value` at `path`, creating intermediate mappings.
///
/// `null` counts as absent and is replaced by a mapping. Scalars are never
/// deepened and sequences never grow here.
pub fn set(tree: &mut Value, path: &str, value: Value) -> PathResult<()> {
    let path = EditPath::parse(path)?;
    set_path(tree, &path, value)
}

pub fn set_path(tree: &mut Value, path: &EditPath, value: Value) -> PathResult<()> {
    let segments = path.segments();
    if segments.is_empty() {
        return Err(PathError::Empty);
    }

    let mut current = tree;
    let mut value = Some(value);

    for (depth, segment) in segments.iter().enumerate() {
        let is_last = depth + 1 == segments.len();

        if current.is_null() {
            *current = build_subtree(path, depth, take(&mut value))?;
            return Ok(());
        }

        match segment {
            Segment::Key(key) => {
                let map = match current {
                    Value::Object(map) => map,
                    _ => {
                        return Err(PathError::NotAContainer {
                            at: path.prefix(depth),
                        })
                    }
                };

                if is_last {
                    map.insert(key.clone(), take(&mut value));
                    return Ok(());
                }

                if !map.contains_key(key) {
                    let subtree = build_subtree(path, depth + 1, take(&mut value))?;
                    map.insert(key.clone(), subtree);
                    return Ok(());
                }

                current = match map.get_mut(key) {
                    Some(child) => child,
                    None => {
                        return Err(PathError::NotAContainer {
                            at: path.prefix(depth + 1),
                        })
                    }
                };
            }
            Segment::Index(index) => {
                let items = match current {
                    Value::Array(items) => items,
                    _ => {
                        return Err(PathError::NotASequence {
                            at: path.prefix(depth),
                        })
                    }
                };

                let len = items.len();
                let slot = items.get_mut(*index).ok_or_else(|| PathError::IndexOutOfBounds {
                    at: path.prefix(depth),
                    index: *index,
                    len,
                })?;

                if is_last {
                    *slot = take(&mut value);
                    return Ok(());
                }
                current = slot;
            }
        }
    }

    Ok(())
}

fn take(value: &mut Option<Value>) -> Value {
    value.take().unwrap_or(Value::Null)
}

/// Nested mappings for `path.segments()[from..]` ending in `leaf`.
fn build_subtree(path: &EditPath, from: usize, leaf: Value) -> PathResult<Value> {
    let rest = &path.segments()[from..];

    if let Some(offset) = rest.iter().position(|s| matches!(s, Segment::Index(_))) {
        let index = match rest[offset] {
            Segment::Index(index) => index,
            Segment::Key(_) => 0,
        };
        return Err(PathError::IndexOutOfBounds {
            at: path.prefix(from + offset),
            index,
            len: 0,
        });
    }

    Ok(rest.iter().rev().fold(leaf, |child, segment| {
        let mut map = Map::new();
        if let Segment::Key(key) = segment {
            map.insert(key.clone(), child);
        }
        Value::Object(map)
    }))
}

/// Append to the sequence at `path`, creating it when absent.
pub fn push(tree: &mut Value, path: &str, value: Value) -> PathResult<usize> {
    let path = EditPath::parse(path)?;
    match get_path_mut(tree, &path) {
        Some(Value::Array(items)) => {
            items.push(value);
            Ok(items.len() - 1)
        }
        Some(Value::Null) | None => {
            set_path(tree, &path, Value::Array(vec![value]))?;
            Ok(0)
        }
        Some(_) => Err(PathError::NotASequence {
            at: path.to_string(),
        }),
    }
}

/// Insert into an existing sequence; `index == len` appends.
pub fn insert(tree: &mut Value, path: &str, index: usize, value: Value) -> PathResult<()> {
    let path = EditPath::parse(path)?;
    let items = sequence_mut(tree, &path)?;
    if index > items.len() {
        return Err(PathError::IndexOutOfBounds {
            at: path.to_string(),
            index,
            len: items.len(),
        });
    }
    items.insert(index, value);
    Ok(())
}

/// Remove and return a sequence element.
pub fn remove(tree: &mut Value, path: &str, index: usize) -> PathResult<Value> {
    let path = EditPath::parse(path)?;
    let items = sequence_mut(tree, &path)?;
    if index >= items.len() {
        return Err(PathError::IndexOutOfBounds {
            at: path.to_string(),
            index,
            len: items.len(),
        });
    }
    Ok(items.remove(index))
}

fn sequence_mut<'a>(tree: &'a mut Value, path: &EditPath) -> PathResult<&'a mut Vec<Value>> {
    match get_path_mut(tree, path) {
        Some(Value::Array(items)) => Ok(items),
        _ => Err(PathError::NotASequence {
            at: path.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_nested() {
        let tree = json!({"services": {"items": [{"title": "A"}, {"title": "B"}]}});
        assert_eq!(get(&tree, "services.items[1].title"), Some(&json!("B")));
        assert_eq!(get(&tree, "services.items[5].title"), None);
        assert_eq!(get(&tree, "services.missing.deeper"), None);
        assert_eq!(get(&tree, "services.items.title"), None);
        assert_eq!(get(&tree, "bad..path"), None);
    }

    #[test]
    fn test_set_creates_intermediate_mappings() {
        let mut tree = json!({});
        set(&mut tree, "hero.cta.label", json!("Go")).unwrap();
        assert_eq!(tree, json!({"hero": {"cta": {"label": "Go"}}}));
    }

    #[test]
    fn test_set_replaces_null() {
        let mut tree = json!({"hero": null});
        set(&mut tree, "hero.title", json!("Hi")).unwrap();
        assert_eq!(tree, json!({"hero": {"title": "Hi"}}));
    }

    #[test]
    fn test_set_refuses_to_deepen_scalar() {
        let mut tree = json!({"hero": "text"});
        let err = set(&mut tree, "hero.title", json!("x")).unwrap_err();
        assert_eq!(err, PathError::NotAContainer { at: "hero".into() });
        assert_eq!(tree, json!({"hero": "text"}));
    }

    #[test]
    fn test_set_never_grows_sequences() {
        let mut tree = json!({"items": [{"t": 1}]});
        let err = set(&mut tree, "items[1].t", json!(2)).unwrap_err();
        assert!(matches!(err, PathError::IndexOutOfBounds { index: 1, len: 1, .. }));

        let err = set(&mut tree, "fresh.list[0]", json!(1)).unwrap_err();
        assert!(matches!(err, PathError::IndexOutOfBounds { len: 0, .. }));
        assert!(get(&tree, "fresh").is_none());
    }

    #[test]
    fn test_set_inside_sequence_element() {
        let mut tree = json!({"items": [{"t": 1}, {"t": 2}]});
        set(&mut tree, "items[1].t", json!(9)).unwrap();
        set(&mut tree, "items[0].extra.note", json!("n")).unwrap();
        assert_eq!(tree, json!({"items": [{"t": 1, "extra": {"note": "n"}}, {"t": 9}]}));
    }

    #[test]
    fn test_sequence_operations() {
        let mut tree = json!({"portfolio": {}});
        assert_eq!(push(&mut tree, "portfolio.images", json!({"src": "a"})).unwrap(), 0);
        assert_eq!(push(&mut tree, "portfolio.images", json!({"src": "c"})).unwrap(), 1);
        insert(&mut tree, "portfolio.images", 1, json!({"src": "b"})).unwrap();
        assert_eq!(get(&tree, "portfolio.images[1].src"), Some(&json!("b")));

        let removed = remove(&mut tree, "portfolio.images", 0).unwrap();
        assert_eq!(removed, json!({"src": "a"}));
        assert!(remove(&mut tree, "portfolio.images", 7).is_err());
        assert!(push(&mut tree, "portfolio.images[0].src", json!(1)).is_err());
    }
}
