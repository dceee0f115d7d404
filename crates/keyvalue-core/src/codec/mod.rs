//! Value codec
//!
//! Bridges typed values to what a backend can hold:
//! - Native scalars pass through unchanged when the backend supports the kind
//! - Everything else is wrapped as the sole element of a JSON array
//!   (`[value]`) and unwrapped again on read

mod native;
mod storable;

use serde_json::Value;

use crate::error::{Result, StorageError};

pub use native::{NativeValue, ScalarKind};
pub use storable::Storable;

/// Backend-storable representation of a value
#[derive(Debug, Clone, PartialEq)]
pub enum Encoded {
    /// A native scalar, handed to the backend's matching accessor
    Native(NativeValue),
    /// A singleton JSON array holding the encoded value
    Structured(Value),
}

impl Encoded {
    /// Wrap a bare structured value into its singleton form
    pub fn wrap(value: Value) -> Self {
        Encoded::Structured(Value::Array(vec![value]))
    }

    /// Take the first element out of a structured singleton
    pub fn unwrap_structured(self) -> Option<Value> {
        match self {
            Encoded::Structured(Value::Array(items)) => items.into_iter().next(),
            _ => None,
        }
    }
}

/// Encode a value for a backend that stores `native_kinds` directly
pub fn encode<T: Storable>(value: &T, native_kinds: &[ScalarKind]) -> Result<Encoded> {
    if let Some(kind) = T::NATIVE_KIND.filter(|kind| native_kinds.contains(kind)) {
        return value.to_native().map(Encoded::Native).ok_or_else(|| {
            StorageError::Unsupported(format!("no native form for {:?} value", kind))
        });
    }

    serde_json::to_value([value])
        .map(Encoded::Structured)
        .map_err(|e| StorageError::EncodingFailure(e.to_string()))
}

/// Decode a stored representation as `T`.
///
/// Returns `None` when the representation cannot be read as `T`; a
/// mismatched read is an expected pattern, not an error.
pub fn decode<T: Storable>(encoded: Encoded) -> Option<T> {
    match encoded {
        Encoded::Native(value) => T::from_native(value),
        structured => structured
            .unwrap_structured()
            .and_then(|value| serde_json::from_value(value).ok()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Pair {
        foo: i64,
        bar: String,
    }

    impl Storable for Pair {}

    #[test]
    fn test_native_kind_passes_through() {
        let encoded = encode(&"qwe".to_string(), ScalarKind::ALL).unwrap();
        assert_eq!(encoded, Encoded::Native(NativeValue::Text("qwe".to_string())));
    }

    #[test]
    fn test_unsupported_native_kind_is_structured() {
        let encoded = encode(&true, &[ScalarKind::Text, ScalarKind::Bytes]).unwrap();
        assert_eq!(encoded, Encoded::Structured(json!([true])));
        assert_eq!(decode::<bool>(encoded), Some(true));
    }

    #[test]
    fn test_struct_is_wrapped_in_singleton() {
        let value = Pair { foo: 123, bar: "qwe".to_string() };
        let encoded = encode(&value, ScalarKind::ALL).unwrap();

        assert_eq!(encoded, Encoded::Structured(json!([{ "foo": 123, "bar": "qwe" }])));
        assert_eq!(decode::<Pair>(encoded), Some(value));
    }

    #[test]
    fn test_decode_mismatch_is_none() {
        assert_eq!(decode::<Pair>(Encoded::Native(NativeValue::Integer(123))), None);
        assert_eq!(decode::<Pair>(Encoded::Structured(json!([123]))), None);
        assert_eq!(decode::<String>(Encoded::Native(NativeValue::Integer(1))), None);
    }

    #[test]
    fn test_decode_requires_singleton_array() {
        assert_eq!(decode::<i32>(Encoded::Structured(json!(5))), None);
        assert_eq!(decode::<i32>(Encoded::Structured(json!([]))), None);
        assert_eq!(decode::<i32>(Encoded::wrap(json!(5))), Some(5));
    }

    #[test]
    fn test_encoding_failure_is_reported() {
        let value: u128 = u128::MAX;
        assert!(matches!(
            encode(&value, ScalarKind::ALL),
            Err(StorageError::EncodingFailure(_))
        ));
    }
}
