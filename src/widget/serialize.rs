//! Generic property serialization
//!
//! Every synchronized property type knows how to write itself into a state
//! document (possibly pushing raw bytes into the side buffers) and how to
//! read itself back. Binary values are written as a
//! `@buffer_reference@<index>` placeholder; before a document leaves the
//! process the placeholders are taken out and listed in `buffer_paths`, and on receipt
//! `buffer_paths` are turned back into placeholders.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::protocol::{BufferPath, BufferSequence, PathSegment, State};
use crate::types::WidgetRef;

/// Prefix of a placeholder string standing in for a binary buffer
pub const BUFFER_REFERENCE_PREFIX: &str = "@buffer_reference@";

/// A value that can be synchronized as a widget property
pub trait WidgetProperty: Sized {
    /// Encode into JSON, appending any binary payload to `buffers`
    fn to_state(&self, buffers: &mut BufferSequence) -> Value;

    /// Decode from JSON, resolving buffer placeholders against `buffers`
    fn from_state(value: &Value, buffers: &BufferSequence) -> std::result::Result<Self, String>;
}

impl WidgetProperty for bool {
    fn to_state(&self, _buffers: &mut BufferSequence) -> Value {
        Value::Bool(*self)
    }

    fn from_state(value: &Value, _buffers: &BufferSequence) -> std::result::Result<Self, String> {
        value
            .as_bool()
            .ok_or_else(|| format!("expected a boolean, got {}", json_kind(value)))
    }
}

impl WidgetProperty for String {
    fn to_state(&self, _buffers: &mut BufferSequence) -> Value {
        Value::String(self.clone())
    }

    fn from_state(value: &Value, _buffers: &BufferSequence) -> std::result::Result<Self, String> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| format!("expected a string, got {}", json_kind(value)))
    }
}

impl WidgetProperty for WidgetRef {
    fn to_state(&self, _buffers: &mut BufferSequence) -> Value {
        Value::String(self.to_wire())
    }

    fn from_state(value: &Value, _buffers: &BufferSequence) -> std::result::Result<Self, String> {
        let s = value
            .as_str()
            .ok_or_else(|| format!("expected a widget reference, got {}", json_kind(value)))?;
        WidgetRef::from_wire(s).ok_or_else(|| format!("'{}' is not a widget reference", s))
    }
}

impl<T: WidgetProperty> WidgetProperty for Option<T> {
    fn to_state(&self, buffers: &mut BufferSequence) -> Value {
        match self {
            Some(v) => v.to_state(buffers),
            None => Value::Null,
        }
    }

    fn from_state(value: &Value, buffers: &BufferSequence) -> std::result::Result<Self, String> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_state(value, buffers).map(Some)
        }
    }
}

/// Raw bytes synchronized through the side buffers
///
/// None of the built-in widgets has a binary property yet; this is for
/// widgets defined outside the crate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Binary(pub Vec<u8>);

impl WidgetProperty for Binary {
    fn to_state(&self, buffers: &mut BufferSequence) -> Value {
        let index = buffers.len();
        buffers.push(self.0.clone());
        Value::String(format!("{}{}", BUFFER_REFERENCE_PREFIX, index))
    }

    fn from_state(value: &Value, buffers: &BufferSequence) -> std::result::Result<Self, String> {
        let index = value
            .as_str()
            .and_then(buffer_index)
            .ok_or_else(|| format!("expected a buffer reference, got {}", value))?;
        buffers
            .get(index)
            .cloned()
            .map(Binary)
            .ok_or_else(|| format!("buffer {} missing ({} received)", index, buffers.len()))
    }
}

// ─────────────────────────────────────────────────────────────────
// Property Helpers
// ─────────────────────────────────────────────────────────────────

/// Write one property into a state document
pub fn serialize_property<T: WidgetProperty>(
    name: &str,
    value: &T,
    state: &mut State,
    buffers: &mut BufferSequence,
) {
    state.insert(name.to_string(), value.to_state(buffers));
}

/// Decode one property from a patch
///
/// `Ok(None)` when the patch does not mention `name`.
pub fn decode_property<T: WidgetProperty>(
    name: &str,
    patch: &State,
    buffers: &BufferSequence,
) -> Result<Option<T>> {
    match patch.get(name) {
        Some(value) => T::from_state(value, buffers)
            .map(Some)
            .map_err(|message| Error::patch_decode(name, message)),
        None => Ok(None),
    }
}

// ─────────────────────────────────────────────────────────────────
// Buffer Paths
// ─────────────────────────────────────────────────────────────────

fn buffer_index(s: &str) -> Option<usize> {
    s.strip_prefix(BUFFER_REFERENCE_PREFIX)?.parse().ok()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Move the buffer placeholders out of `state` and into a path list
///
/// Only placeholders naming one of the `buffer_count` buffers that travel
/// with the document are taken, each index once. Any other string is
/// property data and stays. A taken top-level value is removed from the
/// document; a nested one is replaced by null so its slot survives for
/// `insert_buffer_paths` on the receiving side. The returned list is
/// ordered by buffer index so that `paths[i]` locates `buffers[i]`.
pub fn take_buffer_paths(state: &mut State, buffer_count: usize) -> Vec<BufferPath> {
    let mut slots: Vec<Option<BufferPath>> = vec![None; buffer_count];
    let mut path = Vec::new();
    for (key, value) in state.iter() {
        path.push(PathSegment::Key(key.clone()));
        find_placeholders(value, &mut path, &mut slots);
        path.pop();
    }

    let mut paths = Vec::with_capacity(buffer_count);
    for (index, slot) in slots.into_iter().enumerate() {
        match slot {
            Some(path) => paths.push(path),
            None => {
                tracing::warn!(index, buffers = buffer_count, "Buffer has no placeholder in the state");
                break;
            }
        }
    }

    for path in &paths {
        clear_placeholder(state, path);
    }
    paths
}

fn find_placeholders(value: &Value, path: &mut BufferPath, slots: &mut [Option<BufferPath>]) {
    match value {
        Value::String(s) => {
            if let Some(index) = buffer_index(s) {
                if let Some(slot) = slots.get_mut(index) {
                    if slot.is_none() {
                        *slot = Some(path.clone());
                    }
                }
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                path.push(PathSegment::Index(i));
                find_placeholders(item, path, slots);
                path.pop();
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                path.push(PathSegment::Key(key.clone()));
                find_placeholders(item, path, slots);
                path.pop();
            }
        }
        _ => {}
    }
}

fn clear_placeholder(state: &mut State, path: &[PathSegment]) {
    let (key, rest) = match path.split_first() {
        Some((PathSegment::Key(key), rest)) => (key, rest),
        _ => return,
    };
    if rest.is_empty() {
        state.remove(key);
        return;
    }

    let mut slot = state.get_mut(key);
    for segment in rest {
        slot = match (slot, segment) {
            (Some(Value::Object(map)), PathSegment::Key(key)) => map.get_mut(key),
            (Some(Value::Array(items)), PathSegment::Index(i)) => items.get_mut(*i),
            _ => None,
        };
    }
    if let Some(value) = slot {
        *value = Value::Null;
    }
}

/// Write a placeholder for buffer `i` at `paths[i]`
///
/// Every path must point at an existing slot (object key on the last step
/// may be new).
pub fn insert_buffer_paths(state: &mut State, paths: &[BufferPath]) -> Result<()> {
    for (index, path) in paths.iter().enumerate() {
        let placeholder = Value::String(format!("{}{}", BUFFER_REFERENCE_PREFIX, index));
        insert_at(state, path, placeholder)?;
    }
    Ok(())
}

fn insert_at(state: &mut State, path: &[PathSegment], placeholder: Value) -> Result<()> {
    let (first, rest) = match path.split_first() {
        Some((PathSegment::Key(key), rest)) => (key, rest),
        Some((PathSegment::Index(i), _)) => {
            return Err(Error::BufferReference {
                message: format!("buffer path cannot start with index {}", i),
            })
        }
        None => {
            return Err(Error::BufferReference {
                message: "empty buffer path".to_string(),
            })
        }
    };

    if rest.is_empty() {
        state.insert(first.clone(), placeholder);
        return Ok(());
    }

    let mut slot = state.get_mut(first).ok_or_else(|| Error::BufferReference {
        message: format!("no property '{}' for buffer path", first),
    })?;

    for (depth, segment) in rest.iter().enumerate() {
        let last = depth + 1 == rest.len();
        slot = match (segment, slot) {
            (PathSegment::Key(key), Value::Object(map)) => {
                if last {
                    map.insert(key.clone(), placeholder);
                    return Ok(());
                }
                map.get_mut(key).ok_or_else(|| Error::BufferReference {
                    message: format!("missing key '{}' in buffer path", key),
                })?
            }
            (PathSegment::Index(i), Value::Array(items)) => {
                let item = items.get_mut(*i).ok_or_else(|| Error::BufferReference {
                    message: format!("index {} out of range in buffer path", i),
                })?;
                if last {
                    *item = placeholder;
                    return Ok(());
                }
                item
            }
            (segment, _) => {
                return Err(Error::BufferReference {
                    message: format!("buffer path step {:?} does not match the document", segment),
                })
            }
        };
    }

    Ok(())
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
