//! Literal values carried by construct data.
//!
//! Values are emitted verbatim into the synthesized document. The core never
//! interprets them, so placeholder strings such as `${{ secrets.TOKEN }}` pass
//! through untouched.

use indexmap::IndexMap;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use serde_json::Value as JsonValue;

use crate::domain::error::{DomainError, DomainResult};

/// Insertion-ordered mapping of keys to values.
pub type Data = IndexMap<String, Value>;

/// Recursively structured literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Sequence(Vec<Value>),
    Mapping(Data),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&Data> {
        match self {
            Value::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a nested value by JSON pointer (`/jobs/ci/steps/0/uses`).
    ///
    /// `~1` and `~0` in a token stand for `/` and `~`. The empty pointer
    /// refers to `self`.
    pub fn pointer(&self, pointer: &str) -> Option<&Value> {
        if pointer.is_empty() {
            return Some(self);
        }
        if !pointer.starts_with('/') {
            return None;
        }
        pointer
            .split('/')
            .skip(1)
            .map(unescape_token)
            .try_fold(self, |target, token| match target {
                Value::Mapping(map) => map.get(token.as_str()),
                Value::Sequence(items) => token.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            })
    }
}

/// Escape a mapping key for use as a pointer token.
pub fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

fn unescape_token(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

/// Render pointer tokens as a JSON pointer string.
pub fn render_pointer<S: AsRef<str>>(tokens: &[S]) -> String {
    tokens
        .iter()
        .map(|t| format!("/{}", escape_token(t.as_ref())))
        .collect()
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::String(s) => serializer.serialize_str(s),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Mapping(map) => {
                let mut entries = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map {
                    entries.serialize_entry(key, value)?;
                }
                entries.end()
            }
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value.into())
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Integer(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::Sequence(value)
    }
}

impl From<Data> for Value {
    fn from(value: Data) -> Self {
        Value::Mapping(value)
    }
}

impl TryFrom<JsonValue> for Value {
    type Error = DomainError;

    fn try_from(value: JsonValue) -> DomainResult<Self> {
        from_json(value, &mut Vec::new())
    }
}

fn from_json(value: JsonValue, path: &mut Vec<String>) -> DomainResult<Value> {
    let unsupported = |path: &[String], reason: &str| DomainError::UnsupportedValue {
        pointer: render_pointer(path),
        reason: reason.to_string(),
    };

    match value {
        JsonValue::Null => Err(unsupported(path, "null has no literal counterpart")),
        JsonValue::Bool(b) => Ok(Value::Bool(b)),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Integer(i))
            } else if n.is_u64() {
                Err(unsupported(path, "integer out of range"))
            } else {
                n.as_f64()
                    .map(Value::Float)
                    .ok_or_else(|| unsupported(path, "number is not representable"))
            }
        }
        JsonValue::String(s) => Ok(Value::String(s)),
        JsonValue::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.into_iter().enumerate() {
                path.push(i.to_string());
                out.push(from_json(item, path)?);
                path.pop();
            }
            Ok(Value::Sequence(out))
        }
        JsonValue::Object(entries) => {
            let mut out = Data::with_capacity(entries.len());
            for (key, item) in entries {
                path.push(key.clone());
                let converted = from_json(item, path)?;
                path.pop();
                out.insert(key, converted);
            }
            Ok(Value::Mapping(out))
        }
    }
}

/// Convert a `json!` object literal into construct data.
pub fn data_from_json(value: JsonValue) -> DomainResult<Data> {
    match Value::try_from(value)? {
        Value::Mapping(data) => Ok(data),
        _ => Err(DomainError::UnsupportedValue {
            pointer: String::new(),
            reason: "construct data must be a mapping".into(),
        }),
    }
}
