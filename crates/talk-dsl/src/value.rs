//! Scalar property values.

use std::fmt;

use serde::Serialize;
use serde_json::Value as JsonValue;

/// An assigned property value.
///
/// Every property starts life as `Text` (its words joined by a single space)
/// and may be converted by the property's transforms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Integer(i64),
    Boolean(bool),
    /// A type chain such as `["uint32", "[]"]`.
    List(Vec<String>),
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::Integer(_) => "integer",
            Value::Boolean(_) => "boolean",
            Value::List(_) => "list",
        }
    }

    /// The symbol name a cross-reference resolves for this value.
    ///
    /// Type chains resolve by their base element (`Point[]` names `Point`).
    pub fn symbol(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::List(items) => items.first().map(String::as_str),
            Value::Integer(_) | Value::Boolean(_) => None,
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Text(s) => JsonValue::String(s.clone()),
            Value::Integer(n) => JsonValue::from(*n),
            Value::Boolean(b) => JsonValue::Bool(*b),
            Value::List(items) => {
                JsonValue::Array(items.iter().cloned().map(JsonValue::String).collect())
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::List(items) => f.write_str(&items.concat()),
        }
    }
}
