//! Path-based get/set/delete over an event's backing map.
//!
//! [`Accessors`] and [`AccessorsMut`] are borrowed views built fresh for
//! each call. They hold no cache of resolved paths, so replacing the
//! backing map wholesale can never leave a stale binding behind.

use crate::error::EventError;
use crate::field_ref::{FieldReference, MAX_ARRAY_PADDING, array_index, writable_index};
use crate::value::{Map, Value};

/// Read-only path access over a map.
#[derive(Debug, Clone, Copy)]
pub struct Accessors<'a> {
    data: &'a Map,
}

/// Read-write path access over a map.
#[derive(Debug)]
pub struct AccessorsMut<'a> {
    data: &'a mut Map,
}

impl<'a> Accessors<'a> {
    /// Bind a view to `data`.
    pub const fn new(data: &'a Map) -> Self {
        Self { data }
    }

    /// The value at `reference`, or `None` if the path does not resolve.
    pub fn get(self, reference: &str) -> Option<&'a Value> {
        lookup(self.data, &FieldReference::parse(reference))
    }
}

impl<'a> AccessorsMut<'a> {
    /// Bind a view to `data`.
    pub const fn new(data: &'a mut Map) -> Self {
        Self { data }
    }

    /// The value at `reference`, or `None` if the path does not resolve.
    pub fn get(self, reference: &str) -> Option<&'a mut Value> {
        let field = FieldReference::parse(reference);
        let mut current = self.data.get_mut(field.head())?;
        for segment in field.tail() {
            current = child_mut(current, segment)?;
        }
        Some(current)
    }

    /// Write `value` at `reference` and return the stored value.
    ///
    /// Missing intermediate objects are created (a `null` along the way is
    /// replaced by an empty object) and arrays are padded with `null` when
    /// an index lands past the end, by at most [`MAX_ARRAY_PADDING`] slots.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::NotAContainer`] when the path walks through a
    /// scalar, or [`EventError::InvalidIndex`] when an array segment is not
    /// a usable index or lands too far past the end.
    pub fn set(self, reference: &str, value: Value) -> Result<&'a Value, EventError> {
        let field = FieldReference::parse(reference);
        let mut slot = self
            .data
            .entry(field.head().to_owned())
            .or_insert(Value::Null);
        for segment in field.tail() {
            slot = slot_mut(slot, segment, reference)?;
        }
        *slot = value;
        Ok(slot)
    }

    /// Remove the value at `reference` and return it, or `None` if absent.
    ///
    /// Object entries are removed in place, keeping the order of the
    /// remaining keys; array items shift down.
    pub fn delete(self, reference: &str) -> Option<Value> {
        let field = FieldReference::parse(reference);
        let Some((last, parents)) = field.tail().split_last() else {
            return self.data.shift_remove(field.head());
        };

        let mut current = self.data.get_mut(field.head())?;
        for segment in parents {
            current = child_mut(current, segment)?;
        }
        match current {
            Value::Object(map) => map.shift_remove(last.as_str()),
            Value::Array(items) => {
                let index = array_index(last, items.len())?;
                Some(items.remove(index))
            }
            _ => None,
        }
    }
}

/// Walk `field` from the root without creating anything.
fn lookup<'v>(data: &'v Map, field: &FieldReference) -> Option<&'v Value> {
    let mut current = data.get(field.head())?;
    for segment in field.tail() {
        current = child(current, segment)?;
    }
    Some(current)
}

fn child<'v>(container: &'v Value, segment: &str) -> Option<&'v Value> {
    match container {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => items.get(array_index(segment, items.len())?),
        _ => None,
    }
}

fn child_mut<'v>(container: &'v mut Value, segment: &str) -> Option<&'v mut Value> {
    match container {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => {
            let index = array_index(segment, items.len())?;
            items.get_mut(index)
        }
        _ => None,
    }
}

/// The child slot for `segment`, created on demand.
fn slot_mut<'v>(
    container: &'v mut Value,
    segment: &str,
    reference: &str,
) -> Result<&'v mut Value, EventError> {
    if container.is_null() {
        *container = Value::Object(Map::new());
    }
    match container {
        Value::Object(map) => Ok(map.entry(segment.to_owned()).or_insert(Value::Null)),
        Value::Array(items) => {
            let index = writable_index(segment, items.len()).ok_or_else(|| {
                EventError::InvalidIndex {
                    reference: reference.to_owned(),
                    segment: segment.to_owned(),
                }
            })?;
            if index >= items.len() {
                items.resize(index.saturating_add(1), Value::Null);
            }
            items.get_mut(index).ok_or_else(|| EventError::InvalidIndex {
                reference: reference.to_owned(),
                segment: segment.to_owned(),
            })
        }
        other => Err(EventError::NotAContainer {
            reference: reference.to_owned(),
            found: other.type_name(),
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> Map {
        let mut data = Map::new();
        data.insert("message".to_owned(), Value::from("hello"));
        data.insert(
            "nested".to_owned(),
            [("list", Value::from(vec![1, 2, 3]))].into_iter().collect(),
        );
        data
    }

    #[test]
    fn get_resolves_top_level_and_nested_paths() {
        let data = sample();
        let view = Accessors::new(&data);
        assert_eq!(view.get("message"), Some(&Value::from("hello")));
        assert_eq!(view.get("[nested][list][1]"), Some(&Value::from(2)));
        assert_eq!(view.get("[nested][list][-1]"), Some(&Value::from(3)));
    }

    #[test]
    fn get_returns_none_for_missing_paths() {
        let data = sample();
        let view = Accessors::new(&data);
        assert_eq!(view.get("missing"), None);
        assert_eq!(view.get("[nested][nope]"), None);
        assert_eq!(view.get("[nested][list][9]"), None);
        assert_eq!(view.get("[message][deeper]"), None);
    }

    #[test]
    fn set_creates_intermediate_objects() {
        let mut data = Map::new();
        let stored = AccessorsMut::new(&mut data)
            .set("[a][b][c]", Value::from(1))
            .unwrap()
            .clone();
        assert_eq!(stored, Value::from(1));
        assert_eq!(Accessors::new(&data).get("[a][b][c]"), Some(&Value::from(1)));
    }

    #[test]
    fn set_pads_arrays_past_the_end() {
        let mut data = sample();
        AccessorsMut::new(&mut data)
            .set("[nested][list][5]", Value::from(6))
            .unwrap();
        let list = Accessors::new(&data).get("[nested][list]").unwrap();
        assert_eq!(
            list,
            &Value::Array(vec![
                Value::from(1),
                Value::from(2),
                Value::from(3),
                Value::Null,
                Value::Null,
                Value::from(6),
            ])
        );
    }

    #[test]
    fn set_refuses_huge_array_indexes() {
        let mut data = Map::new();
        data.insert("list".to_owned(), Value::Array(Vec::new()));
        for reference in ["[list][9223372036854775807]", "[list][10000000000]"] {
            let result = AccessorsMut::new(&mut data).set(reference, Value::from(1));
            assert!(matches!(result, Err(EventError::InvalidIndex { .. })));
        }
        assert_eq!(data.get("list"), Some(&Value::Array(Vec::new())));

        let edge = format!("[list][{MAX_ARRAY_PADDING}]");
        AccessorsMut::new(&mut data).set(&edge, Value::from(1)).unwrap();
        let list = data.get("list").and_then(Value::as_array).unwrap();
        assert_eq!(list.len(), MAX_ARRAY_PADDING.saturating_add(1));
    }

    #[test]
    fn set_through_a_scalar_fails() {
        let mut data = sample();
        let result = AccessorsMut::new(&mut data).set("[message][x]", Value::from(1));
        assert!(matches!(result, Err(EventError::NotAContainer { found: "string", .. })));
    }

    #[test]
    fn set_with_bad_array_index_fails() {
        let mut data = sample();
        let result = AccessorsMut::new(&mut data).set("[nested][list][x]", Value::from(1));
        assert!(matches!(result, Err(EventError::InvalidIndex { .. })));
    }

    #[test]
    fn delete_returns_the_removed_value() {
        let mut data = sample();
        let removed = AccessorsMut::new(&mut data).delete("[nested][list][0]");
        assert_eq!(removed, Some(Value::from(1)));
        assert_eq!(
            Accessors::new(&data).get("[nested][list]"),
            Some(&Value::from(vec![2, 3]))
        );

        let removed = AccessorsMut::new(&mut data).delete("message");
        assert_eq!(removed, Some(Value::from("hello")));
        assert_eq!(AccessorsMut::new(&mut data).delete("message"), None);
    }

    #[test]
    fn delete_keeps_remaining_key_order() {
        let mut data: Map = [("a", 1), ("b", 2), ("c", 3)]
            .into_iter()
            .map(|(k, v)| (k.to_owned(), Value::from(v)))
            .collect();
        AccessorsMut::new(&mut data).delete("b");
        let keys: Vec<&str> = data.keys().map(String::as_str).collect();
        assert_eq!(keys, ["a", "c"]);
    }

    #[test]
    fn views_see_wholesale_replacement() {
        let mut data = sample();
        data = Map::new();
        data.insert("fresh".to_owned(), Value::from(true));
        assert_eq!(Accessors::new(&data).get("message"), None);
        assert_eq!(Accessors::new(&data).get("fresh"), Some(&Value::from(true)));
    }
}
