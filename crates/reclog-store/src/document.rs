//! The persisted document for one key and its decoded form.
//!
//! On disk every key holds one JSON document:
//!
//! ```text
//! {
//!     "content": [ <record>, <record>, ... ],
//!     "file": "<key>",
//!     "new": true,
//!     "time": "2024-05-01T12:00:00.000000"
//! }
//! ```
//!
//! Only `content` is required. Older documents may hold a single record in
//! `content`, or wrap it in further `{"content": ...}` envelopes. Both are
//! resolved once, at decode time, into a [`Shape`].

use chrono::{Local, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::ser::PrettyFormatter;
use serde_json::Value;

use crate::error::{StoreError, StoreResult};

/// Deepest envelope nesting accepted before the document is deemed corrupt.
pub const MAX_ENVELOPE_DEPTH: usize = 16;

/// Fields a document envelope may carry.
const ENVELOPE_FIELDS: &[&str] = &["content", "file", "new", "time"];

/// Wire form of the persisted document.
///
/// Metadata fields that fail to parse fall back to their defaults; only a
/// missing or unreadable `content` makes a document undecodable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub content: Value,
    #[serde(default, deserialize_with = "or_default", skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, deserialize_with = "or_default")]
    pub new: bool,
    #[serde(default, deserialize_with = "or_default", skip_serializing_if = "Option::is_none")]
    pub time: Option<NaiveDateTime>,
}

fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

/// What a key's content turned out to be once envelopes are stripped.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape {
    /// Current format: an ordered sequence of records.
    Sequence(Vec<Value>),
    /// Single-record format used by the legacy merge mode.
    LegacySingle(Value),
}

impl Shape {
    /// The content as a single JSON value.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Sequence(records) => Value::Array(records.clone()),
            Self::LegacySingle(record) => record.clone(),
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Self::Sequence(records) => Value::Array(records),
            Self::LegacySingle(record) => record,
        }
    }

    fn from_value(value: Value) -> Self {
        match value {
            Value::Array(records) => Self::Sequence(records),
            other => Self::LegacySingle(other),
        }
    }
}

/// A key's log as loaded from storage.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredLog {
    pub shape: Shape,
    /// Set by writes and appends, cleared by a "latest" read.
    pub unread: bool,
    pub written_at: Option<NaiveDateTime>,
}

impl StoredLog {
    /// A freshly written, unread log.
    pub fn fresh(shape: Shape) -> Self {
        Self {
            shape,
            unread: true,
            written_at: Some(Local::now().naive_local()),
        }
    }

    /// An empty sequence log, as left behind by clear or a draining pop.
    pub fn empty() -> Self {
        Self {
            shape: Shape::Sequence(Vec::new()),
            unread: false,
            written_at: None,
        }
    }

    pub fn content(&self) -> Value {
        self.shape.to_value()
    }

    /// Number of records; a legacy single record counts as one.
    pub fn len(&self) -> usize {
        match &self.shape {
            Shape::Sequence(records) => records.len(),
            Shape::LegacySingle(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decode a persisted document. A single attempt: malformed bytes are
    /// corruption, never retried with other encodings.
    pub fn decode(key: &str, bytes: &[u8]) -> StoreResult<Self> {
        let document: Document = serde_json::from_slice(bytes)
            .map_err(|e| StoreError::corruption(key, format!("undecodable document: {e}")))?;
        Self::from_document(key, document)
    }

    pub fn from_document(key: &str, document: Document) -> StoreResult<Self> {
        let content = unwrap_envelopes(key, document.content)?;
        Ok(Self {
            shape: Shape::from_value(content),
            unread: document.new,
            written_at: document.time,
        })
    }

    pub fn to_document(&self, key: &str) -> Document {
        Document {
            content: self.content(),
            file: Some(key.to_string()),
            new: self.unread,
            time: self.written_at,
        }
    }

    /// Encode as a 4-space indented JSON document.
    pub fn encode(&self, key: &str) -> StoreResult<Vec<u8>> {
        let mut buf = Vec::new();
        let mut ser =
            serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
        self.to_document(key).serialize(&mut ser)?;
        buf.push(b'\n');
        Ok(buf)
    }
}

fn is_envelope(value: &Value) -> bool {
    match value {
        Value::Object(map) => {
            map.contains_key("content") && map.keys().all(|k| ENVELOPE_FIELDS.contains(&k.as_str()))
        }
        _ => false,
    }
}

fn unwrap_envelopes(key: &str, mut value: Value) -> StoreResult<Value> {
    for _ in 0..MAX_ENVELOPE_DEPTH {
        if !is_envelope(&value) {
            return Ok(value);
        }
        value = match value {
            Value::Object(mut map) => map.remove("content").unwrap_or(Value::Null),
            other => other,
        };
    }
    if is_envelope(&value) {
        return Err(StoreError::corruption(
            key,
            format!("content envelopes nested deeper than {MAX_ENVELOPE_DEPTH}"),
        ));
    }
    Ok(value)
}
