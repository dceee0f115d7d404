//! In-process memory storage backend
//!
//! Reads take a shared lock and may run concurrently. Writes, removals and
//! clears take the exclusive lock, so they are serialized in call order and
//! a read issued after a write returns observes it.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use super::Storage;
use crate::codec::{Encoded, ScalarKind};
use crate::key::KeyResolver;
use crate::settings::MemoryStoreConfig;

/// In-memory storage backend
#[derive(Debug, Default)]
pub struct MemoryStore {
    keys: KeyResolver,
    entries: RwLock<HashMap<String, Encoded>>,
}

impl MemoryStore {
    /// Create an empty store with no key prefix
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store that prefixes every key
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            keys: KeyResolver::new(prefix),
            entries: RwLock::default(),
        }
    }

    /// Create a store from its configuration
    pub fn from_config(config: &MemoryStoreConfig) -> Self {
        Self::with_prefix(config.key_prefix.clone())
    }

    /// The configured key prefix
    pub fn key_prefix(&self) -> &str {
        self.keys.prefix()
    }

    // A panicking writer cannot leave the map half-updated, so a poisoned
    // lock is still safe to use.
    fn entries(&self) -> RwLockReadGuard<'_, HashMap<String, Encoded>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn entries_mut(&self) -> RwLockWriteGuard<'_, HashMap<String, Encoded>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Storage for MemoryStore {
    fn native_kinds(&self) -> &'static [ScalarKind] {
        ScalarKind::ALL
    }

    fn read(&self, key: &str, _kind: Option<ScalarKind>) -> Option<Encoded> {
        self.entries().get(&self.keys.resolve(key)).cloned()
    }

    fn write(&self, key: &str, value: Encoded) -> bool {
        self.entries_mut().insert(self.keys.resolve(key), value);
        debug!("Stored key in memory: {}", key);
        true
    }

    fn remove(&self, key: &str) -> bool {
        self.entries_mut().remove(&self.keys.resolve(key));
        debug!("Removed key from memory: {}", key);
        true
    }

    fn clear(&self) -> bool {
        self.entries_mut().clear();
        debug!("Cleared memory storage");
        true
    }

    fn list_keys(&self) -> Vec<String> {
        self.entries()
            .keys()
            .filter_map(|key| self.keys.logical(key))
            .map(str::to_string)
            .collect()
    }

    fn backend_name(&self) -> &'static str {
        "Memory Storage"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageExt;
    use chrono::{DateTime, TimeZone, Utc};
    use serde::{Deserialize, Serialize};
    use std::sync::Arc;
    use url::Url;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct CodableStruct {
        foo: i64,
        bar: String,
    }

    impl crate::Storable for CodableStruct {}

    #[test]
    fn test_default_arguments() {
        let storage = MemoryStore::new();
        assert_eq!(storage.key_prefix(), "");
        assert!(storage.list_keys().is_empty());
    }

    #[test]
    fn test_custom_prefix() {
        let storage = MemoryStore::with_prefix("baz");
        assert_eq!(storage.key_prefix(), "baz");

        assert!(storage.set("foo", Some(&1_i64)));
        assert_eq!(storage.list_keys(), vec!["foo".to_string()]);
    }

    #[test]
    fn test_store_and_retrieve_scalars() {
        let storage = MemoryStore::new();
        let date = Utc.timestamp_opt(978_307_323, 456_000_000).unwrap();
        let url = Url::parse("https://apple.com").unwrap();
        let list = vec!["qwe".to_string(), "asd".to_string(), "zxc".to_string()];

        assert!(storage.set("bool", Some(&true)));
        assert!(storage.set("int", Some(&123_i64)));
        assert!(storage.set("float", Some(&1.23_f32)));
        assert!(storage.set("double", Some(&12.3_f64)));
        assert!(storage.set("date", Some(&date)));
        assert!(storage.set("string", Some(&"qwe".to_string())));
        assert!(storage.set("data", Some(&vec![1_u8, 2, 3])));
        assert!(storage.set("url", Some(&url)));
        assert!(storage.set("list", Some(&list)));

        assert_eq!(storage.get::<bool>("bool"), Some(true));
        assert_eq!(storage.get::<i64>("int"), Some(123));
        assert_eq!(storage.get::<f32>("float"), Some(1.23));
        assert_eq!(storage.get::<f64>("double"), Some(12.3));
        assert_eq!(storage.get::<DateTime<Utc>>("date"), Some(date));
        assert_eq!(storage.get::<String>("string").as_deref(), Some("qwe"));
        assert_eq!(storage.get::<Vec<u8>>("data"), Some(vec![1, 2, 3]));
        assert_eq!(storage.get::<Url>("url"), Some(url));
        assert_eq!(storage.get::<Vec<String>>("list"), Some(list));
    }

    #[test]
    fn test_store_and_retrieve_structured() {
        let storage = MemoryStore::new();
        let value = CodableStruct { foo: 123, bar: "qwe".to_string() };

        assert!(storage.set("struct", Some(&value)));
        assert!(storage.set("primitive", Some(&7_u16)));

        assert_eq!(storage.get::<CodableStruct>("struct"), Some(value));
        assert_eq!(storage.get::<u16>("primitive"), Some(7));
    }

    #[test]
    fn test_mismatched_type_is_none() {
        let storage = MemoryStore::new();
        assert!(storage.set("foobar", Some(&123_i64)));

        assert_eq!(storage.get::<CodableStruct>("foobar"), None);
        assert_eq!(storage.get::<String>("foobar"), None);
    }

    #[test]
    fn test_set_none_removes() {
        let storage = MemoryStore::new();
        assert!(storage.set("foobar", Some(&123_i64)));
        assert!(storage.set::<i64>("foobar", None));

        assert_eq!(storage.get::<i64>("foobar"), None);
        assert!(storage.list_keys().is_empty());
    }

    #[test]
    fn test_last_write_wins() {
        let storage = MemoryStore::with_prefix("ab");
        assert!(storage.set("c", Some(&true)));
        assert!(storage.set("c", Some(&"asd".to_string())));
        assert_eq!(storage.get::<String>("c").as_deref(), Some("asd"));
        assert_eq!(storage.get::<bool>("c"), None);
    }

    #[test]
    fn test_concurrent_writers_to_distinct_keys() {
        let storage = Arc::new(MemoryStore::new());

        std::thread::scope(|scope| {
            for writer in 0..8_i64 {
                let storage = storage.clone();
                scope.spawn(move || {
                    for i in 0..100_i64 {
                        let key = format!("writer-{}-{}", writer, i);
                        assert!(storage.set(&key, Some(&(writer * 1000 + i))));
                    }
                });
            }
        });

        assert_eq!(storage.list_keys().len(), 800);
        for writer in 0..8_i64 {
            for i in 0..100_i64 {
                let key = format!("writer-{}-{}", writer, i);
                assert_eq!(storage.get::<i64>(&key), Some(writer * 1000 + i));
            }
        }
    }

    #[test]
    fn test_write_visible_to_subsequent_read_on_other_thread() {
        let storage = Arc::new(MemoryStore::new());
        assert!(storage.set("foobar", Some(&"qwe".to_string())));

        let reader = storage.clone();
        let seen = std::thread::spawn(move || reader.get::<String>("foobar"))
            .join()
            .unwrap();

        assert_eq!(seen.as_deref(), Some("qwe"));
    }
}
