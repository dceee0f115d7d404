//! Property values held by a preference domain

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use url::Url;

use crate::codec::{NativeValue, ScalarKind};
use crate::error::{Result, StorageError};

/// A property-list style value.
///
/// There is no null: a preference either holds a value or is absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyValue {
    Bool(bool),
    Integer(i64),
    Real(f64),
    Date(DateTime<Utc>),
    String(String),
    Data(#[serde(with = "base64_bytes")] Vec<u8>),
    Url(Url),
    Array(Vec<PropertyValue>),
    Dictionary(BTreeMap<String, PropertyValue>),
}

impl From<NativeValue> for PropertyValue {
    fn from(value: NativeValue) -> Self {
        match value {
            NativeValue::Bool(b) => PropertyValue::Bool(b),
            NativeValue::Integer(i) => PropertyValue::Integer(i),
            NativeValue::Float(f) => PropertyValue::Real(f64::from(f)),
            NativeValue::Double(d) => PropertyValue::Real(d),
            NativeValue::Date(d) => PropertyValue::Date(d),
            NativeValue::Text(s) => PropertyValue::String(s),
            NativeValue::Bytes(b) => PropertyValue::Data(b),
            NativeValue::Url(u) => PropertyValue::Url(u),
            NativeValue::TextList(items) => {
                PropertyValue::Array(items.into_iter().map(PropertyValue::String).collect())
            }
        }
    }
}

impl PropertyValue {
    /// Read this value through the native accessor for `kind`.
    ///
    /// Numbers, booleans and numeric strings convert into each other; text
    /// accepts numbers; URLs accept absolute URL or file path strings. Dates
    /// and data only match themselves.
    pub fn coerce(&self, kind: ScalarKind) -> Option<NativeValue> {
        match kind {
            ScalarKind::Bool => self.as_bool().map(NativeValue::Bool),
            ScalarKind::Integer => self.as_integer().map(NativeValue::Integer),
            ScalarKind::Float => self.as_real().map(|r| NativeValue::Float(r as f32)),
            ScalarKind::Double => self.as_real().map(NativeValue::Double),
            ScalarKind::Date => match self {
                PropertyValue::Date(d) => Some(NativeValue::Date(*d)),
                _ => None,
            },
            ScalarKind::Text => match self {
                PropertyValue::String(s) => Some(NativeValue::Text(s.clone())),
                PropertyValue::Integer(i) => Some(NativeValue::Text(i.to_string())),
                PropertyValue::Real(r) => Some(NativeValue::Text(r.to_string())),
                _ => None,
            },
            ScalarKind::Bytes => match self {
                PropertyValue::Data(b) => Some(NativeValue::Bytes(b.clone())),
                _ => None,
            },
            ScalarKind::Url => match self {
                PropertyValue::Url(u) => Some(NativeValue::Url(u.clone())),
                PropertyValue::String(s) => Url::parse(s)
                    .or_else(|_| Url::from_file_path(s))
                    .ok()
                    .map(NativeValue::Url),
                _ => None,
            },
            ScalarKind::TextList => match self {
                PropertyValue::Array(items) => items
                    .iter()
                    .map(|item| match item {
                        PropertyValue::String(s) => Some(s.clone()),
                        _ => None,
                    })
                    .collect::<Option<Vec<_>>>()
                    .map(NativeValue::TextList),
                _ => None,
            },
        }
    }

    fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            PropertyValue::Integer(i) => Some(*i != 0),
            PropertyValue::Real(r) => Some(*r != 0.0),
            PropertyValue::String(s) => match s.to_ascii_lowercase().as_str() {
                "yes" | "true" | "1" => Some(true),
                "no" | "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    fn as_integer(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(i) => Some(*i),
            PropertyValue::Real(r) if r.is_finite() => Some(r.trunc() as i64),
            PropertyValue::Bool(b) => Some(i64::from(*b)),
            PropertyValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn as_real(&self) -> Option<f64> {
        match self {
            PropertyValue::Real(r) => Some(*r),
            PropertyValue::Integer(i) => Some(*i as f64),
            PropertyValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            PropertyValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Convert a structured JSON value into a property value.
    ///
    /// Nulls inside dictionaries are dropped; a null anywhere else cannot be
    /// represented.
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Null => Err(StorageError::Unsupported(
                "null has no property list representation".to_string(),
            )),
            Value::Bool(b) => Ok(PropertyValue::Bool(b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(PropertyValue::Integer(i))
                } else if n.is_u64() {
                    Err(StorageError::Unsupported(format!("integer {} is out of range", n)))
                } else {
                    n.as_f64().map(PropertyValue::Real).ok_or_else(|| {
                        StorageError::Unsupported(format!("number {} is not representable", n))
                    })
                }
            }
            Value::String(s) => Ok(PropertyValue::String(s)),
            Value::Array(items) => items
                .into_iter()
                .map(PropertyValue::from_json)
                .collect::<Result<Vec<_>>>()
                .map(PropertyValue::Array),
            Value::Object(fields) => fields
                .into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| PropertyValue::from_json(v).map(|v| (k, v)))
                .collect::<Result<BTreeMap<_, _>>>()
                .map(PropertyValue::Dictionary),
        }
    }

    /// Convert into the JSON shape serde expects when decoding structured values
    pub fn to_json(&self) -> Value {
        match self {
            PropertyValue::Bool(b) => Value::Bool(*b),
            PropertyValue::Integer(i) => Value::Number((*i).into()),
            PropertyValue::Real(r) => Number::from_f64(*r).map(Value::Number).unwrap_or(Value::Null),
            PropertyValue::Date(d) => Value::String(d.to_rfc3339()),
            PropertyValue::String(s) => Value::String(s.clone()),
            PropertyValue::Data(b) => Value::Array(b.iter().map(|byte| Value::from(*byte)).collect()),
            PropertyValue::Url(u) => Value::String(u.to_string()),
            PropertyValue::Array(items) => Value::Array(items.iter().map(PropertyValue::to_json).collect()),
            PropertyValue::Dictionary(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect::<Map<_, _>>(),
            ),
        }
    }

    /// Whether this value can be written to a JSON-backed domain file
    pub(crate) fn is_persistable(&self) -> bool {
        match self {
            PropertyValue::Real(r) => r.is_finite(),
            PropertyValue::Array(items) => items.iter().all(PropertyValue::is_persistable),
            PropertyValue::Dictionary(fields) => fields.values().all(PropertyValue::is_persistable),
            _ => true,
        }
    }
}

/// Serde helper storing bytes as base64 text
mod base64_bytes {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(serde::de::Error::custom)
    }
}
