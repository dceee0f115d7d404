//! Native scalar kinds
//!
//! Values of these kinds can be handed to a backend's dedicated accessor
//! without going through structured encoding.

use chrono::{DateTime, Utc};
use url::Url;

/// Tag for a native scalar kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    Integer,
    Float,
    Double,
    Date,
    Text,
    Bytes,
    Url,
    TextList,
}

impl ScalarKind {
    /// Every native kind, in declaration order
    pub const ALL: &'static [ScalarKind] = &[
        ScalarKind::Bool,
        ScalarKind::Integer,
        ScalarKind::Float,
        ScalarKind::Double,
        ScalarKind::Date,
        ScalarKind::Text,
        ScalarKind::Bytes,
        ScalarKind::Url,
        ScalarKind::TextList,
    ];
}

/// A native scalar value
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    Bool(bool),
    Integer(i64),
    Float(f32),
    Double(f64),
    Date(DateTime<Utc>),
    Text(String),
    Bytes(Vec<u8>),
    Url(Url),
    TextList(Vec<String>),
}

impl NativeValue {
    /// The kind tag of this value
    pub fn kind(&self) -> ScalarKind {
        match self {
            NativeValue::Bool(_) => ScalarKind::Bool,
            NativeValue::Integer(_) => ScalarKind::Integer,
            NativeValue::Float(_) => ScalarKind::Float,
            NativeValue::Double(_) => ScalarKind::Double,
            NativeValue::Date(_) => ScalarKind::Date,
            NativeValue::Text(_) => ScalarKind::Text,
            NativeValue::Bytes(_) => ScalarKind::Bytes,
            NativeValue::Url(_) => ScalarKind::Url,
            NativeValue::TextList(_) => ScalarKind::TextList,
        }
    }
}
