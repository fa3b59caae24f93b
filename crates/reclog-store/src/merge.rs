//! Content kinds and the type-directed merge of the single-record format.
//!
//! | existing | incoming | result                                      |
//! |----------|----------|---------------------------------------------|
//! | string   | string   | `existing + " \n" + incoming`               |
//! | sequence | sequence | existing extended with incoming's elements  |
//! | map      | map      | keys merged; collisions land on `key_N`     |
//! | other    | same     | [`StoreError::UnsupportedKind`]             |
//! | any      | other    | [`StoreError::TypeMismatch`]                |

use std::fmt;

use serde_json::{Map, Value};

use crate::error::{StoreError, StoreResult};

/// Separator placed between concatenated strings.
pub const STRING_SEPARATOR: &str = " \n";

/// The JSON kind of a record, as far as merging cares.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ContentKind {
    String,
    Sequence,
    Map,
    Number,
    Bool,
    Null,
}

impl ContentKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::String(_) => Self::String,
            Value::Array(_) => Self::Sequence,
            Value::Object(_) => Self::Map,
            Value::Number(_) => Self::Number,
            Value::Bool(_) => Self::Bool,
            Value::Null => Self::Null,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Sequence => "sequence",
            Self::Map => "map",
            Self::Number => "number",
            Self::Bool => "bool",
            Self::Null => "null",
        }
    }

    /// Whether the legacy merge has a rule for this kind.
    pub fn is_mergeable(&self) -> bool {
        matches!(self, Self::String | Self::Sequence | Self::Map)
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// True for values that count as "no content": null, `false`, zero,
/// whitespace-only strings, and empty sequences or maps.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

/// Merge `incoming` into `existing` in place.
///
/// Kinds are checked before anything is touched, so on error `existing`
/// is unchanged.
pub fn merge_legacy(key: &str, existing: &mut Value, incoming: Value) -> StoreResult<()> {
    let existing_kind = ContentKind::of(existing);
    let incoming_kind = ContentKind::of(&incoming);
    if existing_kind != incoming_kind {
        return Err(StoreError::TypeMismatch {
            key: key.to_string(),
            existing: existing_kind,
            incoming: incoming_kind,
        });
    }

    match (existing, incoming) {
        (Value::String(current), Value::String(extra)) => {
            current.push_str(STRING_SEPARATOR);
            current.push_str(&extra);
        }
        (Value::Array(current), Value::Array(extra)) => current.extend(extra),
        (Value::Object(current), Value::Object(extra)) => merge_maps(current, extra),
        _ => return Err(StoreError::UnsupportedKind { kind: existing_kind }),
    }
    Ok(())
}

fn merge_maps(current: &mut Map<String, Value>, extra: Map<String, Value>) {
    for (key, value) in extra {
        let slot = free_key(current, key);
        current.insert(slot, value);
    }
}

/// `key` itself if unused, otherwise the first unused `key_0`, `key_1`, ...
fn free_key(map: &Map<String, Value>, key: String) -> String {
    if !map.contains_key(&key) {
        return key;
    }
    (0u64..)
        .map(|n| format!("{key}_{n}"))
        .find(|candidate| !map.contains_key(candidate))
        .unwrap_or(key)
}
