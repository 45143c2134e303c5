// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration Value Normalization
//!
//! Application definitions arrive as loosely-typed trees: a repeated block may
//! be absent, a single object, or a list mixing objects and scalars. Every
//! injector reads and extends those blocks through the helpers in this module
//! so user-declared entries are never replaced, only appended to.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Tree normalization and append-only mutation helpers

use serde_json::{Map, Value};

/// A decoded configuration tree node.
pub type ConfigValue = Value;

/// A configuration object (string keys, insertion order irrelevant).
pub type ConfigObject = Map<String, Value>;

/// Normalizes a value into an ordered sequence.
///
/// - null / absent → empty
/// - list → its elements
/// - anything else → single element
pub fn sequence(value: Option<Value>) -> Vec<Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(other) => vec![other],
    }
}

/// Borrowing variant of [`sequence`] that keeps only object elements.
pub fn objects(value: Option<&Value>) -> Vec<&ConfigObject> {
    match value {
        Some(Value::Object(map)) => vec![map],
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_object).collect(),
        _ => Vec::new(),
    }
}

/// Mutable variant of [`objects`].
pub fn objects_mut(value: &mut Value) -> Vec<&mut ConfigObject> {
    match value {
        Value::Object(map) => vec![map],
        Value::Array(items) => items.iter_mut().filter_map(Value::as_object_mut).collect(),
        _ => Vec::new(),
    }
}

/// Appends `elems` to the sequence stored under `key`, normalizing whatever
/// was there first. The result is always written back as a list.
pub fn append<I>(object: &mut ConfigObject, key: &str, elems: I)
where
    I: IntoIterator<Item = Value>,
{
    let mut items = sequence(object.remove(key));
    items.extend(elems);
    object.insert(key.to_string(), Value::Array(items));
}

/// Appends to a block-style group such as `parameters { parameter [...] }`.
///
/// When the group is a list of objects the first object receives the new
/// elements; when it is missing (or not an object at all) a fresh group is
/// created.
pub fn append_grouped<I>(parent: &mut ConfigObject, group_key: &str, item_key: &str, elems: I)
where
    I: IntoIterator<Item = Value>,
{
    let group = parent
        .entry(group_key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));

    if objects_mut(group).is_empty() {
        if !group.is_null() {
            tracing::warn!(
                group = group_key,
                "replacing malformed block, expected an object or a list of objects"
            );
        }
        *group = Value::Object(Map::new());
    }

    if let Some(first) = objects_mut(group).into_iter().next() {
        append(first, item_key, elems);
    }
}

/// Returns the object stored under `key`, creating (or replacing a
/// non-object value with) an empty one.
pub fn ensure_object<'a>(object: &'a mut ConfigObject, key: &str) -> &'a mut ConfigObject {
    let slot = object
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));

    if !slot.is_object() {
        if !slot.is_null() {
            tracing::warn!(key, "replacing non-object value with an empty object");
        }
        *slot = Value::Object(Map::new());
    }

    match slot {
        Value::Object(map) => map,
        _ => unreachable!("slot was just normalized to an object"),
    }
}

/// Reads an integer field, tolerating any other shape. Negative integers
/// are returned as `Err` so callers can tell them apart from non-integers.
pub fn integer(value: Option<&Value>) -> Option<Result<u64, i64>> {
    let value = value?;
    value
        .as_u64()
        .map(Ok)
        .or_else(|| value.as_i64().map(Err))
}

/// Reads a non-empty string field.
pub fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}
