//! The `Storable` trait and its implementations for std types

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use super::native::{NativeValue, ScalarKind};

/// A value that can be stored under a key.
///
/// Types with a native scalar kind override all three items. Every other
/// serde type opts in with an empty impl and is stored through structured
/// encoding:
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use keyvalue_core::Storable;
///
/// #[derive(Serialize, Deserialize)]
/// struct Profile {
///     id: i64,
///     name: String,
/// }
///
/// impl Storable for Profile {}
/// ```
pub trait Storable: Serialize + DeserializeOwned {
    /// Native scalar kind of this type, if it has one
    const NATIVE_KIND: Option<ScalarKind> = None;

    /// Convert into the native representation
    fn to_native(&self) -> Option<NativeValue> {
        None
    }

    /// Extract from a native representation. Returns `None` on a kind mismatch.
    fn from_native(_value: NativeValue) -> Option<Self> {
        None
    }
}

macro_rules! native_storable {
    ($ty:ty, $variant:ident) => {
        impl Storable for $ty {
            const NATIVE_KIND: Option<ScalarKind> = Some(ScalarKind::$variant);

            fn to_native(&self) -> Option<NativeValue> {
                Some(NativeValue::$variant(self.to_owned()))
            }

            fn from_native(value: NativeValue) -> Option<Self> {
                match value {
                    NativeValue::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

native_storable!(bool, Bool);
native_storable!(i64, Integer);
native_storable!(f32, Float);
native_storable!(f64, Double);
native_storable!(DateTime<Utc>, Date);
native_storable!(String, Text);
native_storable!(Vec<u8>, Bytes);
native_storable!(Url, Url);
native_storable!(Vec<String>, TextList);

macro_rules! structured_storable {
    ($($ty:ty),* $(,)?) => {
        $(impl Storable for $ty {})*
    };
}

structured_storable!(i8, i16, i32, i128, isize, u8, u16, u32, u64, u128, usize, char);
structured_storable!(serde_json::Value);

impl<V: Storable> Storable for BTreeMap<String, V> {}

impl<V: Storable> Storable for HashMap<String, V> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_kinds() {
        assert_eq!(<bool as Storable>::NATIVE_KIND, Some(ScalarKind::Bool));
        assert_eq!(<i64 as Storable>::NATIVE_KIND, Some(ScalarKind::Integer));
        assert_eq!(<Vec<u8> as Storable>::NATIVE_KIND, Some(ScalarKind::Bytes));
        assert_eq!(<Vec<String> as Storable>::NATIVE_KIND, Some(ScalarKind::TextList));
        assert_eq!(<i32 as Storable>::NATIVE_KIND, None);
    }

    #[test]
    fn test_from_native_rejects_other_kind() {
        assert_eq!(i64::from_native(NativeValue::Integer(7)), Some(7));
        assert_eq!(i64::from_native(NativeValue::Text("7".to_string())), None);
        assert_eq!(String::from_native(NativeValue::Bool(true)), None);
    }

    #[test]
    fn test_structured_types_have_no_native_form() {
        assert_eq!(42_u32.to_native(), None);
        assert_eq!(u32::from_native(NativeValue::Integer(42)), None);
    }
}
