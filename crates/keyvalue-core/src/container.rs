//! Typed containers
//!
//! A [`Container`] is a typed view of one key in one backend, with an
//! optional fallback returned while the key holds nothing readable as `T`.

use std::fmt;
use std::sync::Arc;

use crate::codec::Storable;
use crate::storage::{Storage, StorageExt};

/// Typed handle bound to one backend and one key
pub struct Container<T: Storable> {
    storage: Arc<dyn Storage>,
    key: String,
    default_value: Option<T>,
}

impl<T: Storable> Container<T> {
    /// Bind `key` in `storage`, falling back to `default_value`
    pub fn new(storage: Arc<dyn Storage>, key: impl Into<String>, default_value: Option<T>) -> Self {
        Self {
            storage,
            key: key.into(),
            default_value,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn default_value(&self) -> Option<&T> {
        self.default_value.as_ref()
    }

    /// The backend this container reads and writes
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.storage
    }

    /// Store `value`, or remove the key for `None`.
    ///
    /// The backend's result is discarded; use the backend directly to observe
    /// failures.
    pub fn set_value(&self, value: Option<&T>) {
        let _ = self.storage.set(&self.key, value);
    }
}

impl<T: Storable + Clone> Container<T> {
    /// The stored value, or the fallback when absent or unreadable as `T`.
    ///
    /// Needs `T: Clone` because the fallback is returned by value and the
    /// container keeps its own copy.
    pub fn value(&self) -> Option<T> {
        self.storage
            .get(&self.key)
            .or_else(|| self.default_value.clone())
    }
}

impl<T: Storable + fmt::Debug> fmt::Debug for Container<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("backend", &self.storage.backend_name())
            .field("key", &self.key)
            .field("default_value", &self.default_value)
            .finish()
    }
}

/// Create a container over `storage`
pub fn make_container<T: Storable>(
    storage: Arc<dyn Storage>,
    key: impl Into<String>,
    default_value: Option<T>,
) -> Container<T> {
    Container::new(storage, key, default_value)
}

/// Create a container keyed by the binding's own name.
///
/// `container!(storage, name)` uses `"name"` as the key;
/// `container!(storage, name, default)` adds a fallback value.
///
/// ```
/// use std::sync::Arc;
/// use keyvalue_core::{container, Container, MemoryStore};
///
/// let storage = Arc::new(MemoryStore::new());
/// let launch_count: Container<i64> = container!(storage, launch_count, 0);
///
/// assert_eq!(launch_count.key(), "launch_count");
/// assert_eq!(launch_count.value(), Some(0));
/// ```
#[macro_export]
macro_rules! container {
    ($storage:expr, $name:ident) => {
        $crate::make_container($storage.clone(), stringify!($name), None)
    };
    ($storage:expr, $name:ident, $default:expr) => {
        $crate::make_container($storage.clone(), stringify!($name), Some($default))
    };
}
