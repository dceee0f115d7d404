//! Storage trait definitions

use tracing::warn;

use crate::codec::{self, Encoded, ScalarKind, Storable};

/// Trait for key-value storage backends.
///
/// Object safe, so backends can be shared as `Arc<dyn Storage>`. Values
/// cross this boundary in codec form; typed access lives on [`StorageExt`].
/// Failures are reported as `false`/`None`, never raised.
pub trait Storage: Send + Sync {
    /// Scalar kinds this backend stores without structured encoding
    fn native_kinds(&self) -> &'static [ScalarKind];

    /// Read the stored representation for a key.
    ///
    /// `kind` is the requested type's native kind when the backend supports
    /// it, so the backend can use the matching native accessor.
    fn read(&self, key: &str, kind: Option<ScalarKind>) -> Option<Encoded>;

    /// Store an encoded value under a key
    fn write(&self, key: &str, value: Encoded) -> bool;

    /// Remove the value stored under a key
    fn remove(&self, key: &str) -> bool;

    /// Remove every value this backend owns
    fn clear(&self) -> bool;

    /// Keys that currently hold a value
    fn list_keys(&self) -> Vec<String>;

    /// Get a human-readable name for this storage backend
    fn backend_name(&self) -> &'static str;
}

/// Typed get/set over any [`Storage`]
pub trait StorageExt: Storage {
    /// Get the value stored under `key` as `T`.
    ///
    /// Absent keys and values that don't decode as `T` both yield `None`.
    fn get<T: Storable>(&self, key: &str) -> Option<T> {
        let kind = T::NATIVE_KIND.filter(|kind| self.native_kinds().contains(kind));
        self.read(key, kind).and_then(codec::decode)
    }

    /// Store `value` under `key`. `None` removes the key.
    fn set<T: Storable>(&self, key: &str, value: Option<&T>) -> bool {
        let Some(value) = value else {
            return self.remove(key);
        };

        match codec::encode(value, self.native_kinds()) {
            Ok(encoded) => self.write(key, encoded),
            Err(e) => {
                warn!("Failed to encode value for key {}: {}", key, e);
                false
            }
        }
    }
}

impl<S: Storage + ?Sized> StorageExt for S {}
