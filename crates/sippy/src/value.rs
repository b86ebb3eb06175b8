use indexmap::IndexMap;
use serde_json::Number;

/// XML-RPC value
///
/// `dateTime.iso8601` and `base64` payloads are kept as their text form;
/// callers forward them as JSON strings.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    Boolean(bool),
    Double(f64),
    DateTime(String),
    Base64(String),
    Nil,
    Array(Vec<Value>),
    Struct(IndexMap<String, Value>),
}

impl Value {
    /// Build a call parameter from a JSON value
    ///
    /// Top-level objects become structs whose members are scalars; nested
    /// objects and arrays are sent as their JSON text. Anything that is
    /// neither a scalar nor an object is sent as its JSON text too.
    pub fn from_json_param(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Object(map) => Self::Struct(
                map.iter()
                    .map(|(name, member)| (name.clone(), Self::from_json_scalar(member)))
                    .collect(),
            ),
            other => Self::from_json_scalar(other),
        }
    }

    fn from_json_scalar(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::String(s) => Self::String(s.clone()),
            serde_json::Value::Bool(b) => Self::Boolean(*b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Double))
                .unwrap_or_else(|| Self::String(n.to_string())),
            other => Self::String(other.to_string()),
        }
    }

    /// Convert into JSON for the response envelope
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::String(s) | Self::DateTime(s) | Self::Base64(s) => serde_json::Value::String(s.clone()),
            Self::Int(i) => serde_json::Value::Number((*i).into()),
            Self::Boolean(b) => serde_json::Value::Bool(*b),
            Self::Double(d) => Number::from_f64(*d).map_or(serde_json::Value::Null, serde_json::Value::Number),
            Self::Nil => serde_json::Value::Null,
            Self::Array(items) => serde_json::Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Struct(members) => serde_json::Value::Object(
                members
                    .iter()
                    .map(|(name, value)| (name.clone(), value.to_json()))
                    .collect(),
            ),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::DateTime(s) | Self::Base64(s) => Some(s),
            _ => None,
        }
    }

    pub const fn as_struct(&self) -> Option<&IndexMap<String, Self>> {
        match self {
            Self::Struct(members) => Some(members),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Self]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Numeric view of the value, accepting numeric strings
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Double(d) => Some(*d),
            Self::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Whether the value counts as present for fallback chains
    ///
    /// Empty strings, zero, `false`, and nil are treated as absent.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::String(s) | Self::DateTime(s) | Self::Base64(s) => !s.is_empty(),
            Self::Int(i) => *i != 0,
            Self::Double(d) => *d != 0.0 && !d.is_nan(),
            Self::Boolean(b) => *b,
            Self::Nil => false,
            Self::Array(_) | Self::Struct(_) => true,
        }
    }

    /// Render the value as display text (numbers without quotes)
    pub fn to_text(&self) -> String {
        match self {
            Self::String(s) | Self::DateTime(s) | Self::Base64(s) => s.clone(),
            other => other.to_json().to_string(),
        }
    }

    /// First string found in a depth-first walk
    pub fn first_string(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            Self::Array(items) => items.iter().find_map(Self::first_string),
            Self::Struct(members) => members.values().find_map(Self::first_string),
            _ => None,
        }
    }
}
