//! Behaviour every backend shares, checked against each of them

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use keyvalue_core::{
    make_container, MemoryItemStore, MemoryStore, PersistentStore, PersistentStoreConfig,
    SecureStore, SecureStoreConfig, Storable, Storage, StorageExt,
};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;
use url::Url;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CodableStruct {
    foo: i64,
    bar: String,
}

impl Storable for CodableStruct {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Theme {
    Light,
    Dark,
    Custom { accent: String },
}

impl Storable for Theme {}

/// Every backend, each with its own temp directory kept alive alongside
fn backends() -> Vec<(Arc<dyn Storage>, Option<TempDir>)> {
    let temp_dir = TempDir::new().unwrap();
    let persistent = PersistentStore::open(&PersistentStoreConfig {
        suite_name: Some("contract".to_string()),
        key_prefix: String::new(),
        directory: Some(temp_dir.path().to_path_buf()),
    })
    .unwrap();

    let secure = SecureStore::new(
        SecureStoreConfig {
            service: Some("com.example.contract".to_string()),
            ..SecureStoreConfig::default()
        },
        Arc::new(MemoryItemStore::new()),
    );

    let memory: Arc<dyn Storage> = Arc::new(MemoryStore::new());
    let persistent: Arc<dyn Storage> = Arc::new(persistent);
    let secure: Arc<dyn Storage> = Arc::new(secure);

    vec![(memory, None), (persistent, Some(temp_dir)), (secure, None)]
}

#[test]
fn scalars_round_trip() {
    for (storage, _dir) in backends() {
        let name = storage.backend_name();
        let date = Utc.with_ymd_and_hms(2024, 5, 17, 8, 30, 0).unwrap();
        let url = Url::parse("https://example.com/path?q=1").unwrap();
        let list = vec!["a".to_string(), "b".to_string()];

        assert!(storage.set("bool", Some(&true)), "{}", name);
        assert!(storage.set("int", Some(&-42i64)), "{}", name);
        assert!(storage.set("double", Some(&2.5f64)), "{}", name);
        assert!(storage.set("float", Some(&1.25f32)), "{}", name);
        assert!(storage.set("date", Some(&date)), "{}", name);
        assert!(storage.set("text", Some(&"qwe".to_string())), "{}", name);
        assert!(storage.set("bytes", Some(&vec![0u8, 1, 255])), "{}", name);
        assert!(storage.set("url", Some(&url)), "{}", name);
        assert!(storage.set("list", Some(&list)), "{}", name);

        assert_eq!(storage.get::<bool>("bool"), Some(true), "{}", name);
        assert_eq!(storage.get::<i64>("int"), Some(-42), "{}", name);
        assert_eq!(storage.get::<f64>("double"), Some(2.5), "{}", name);
        assert_eq!(storage.get::<f32>("float"), Some(1.25), "{}", name);
        assert_eq!(storage.get::<DateTime<Utc>>("date"), Some(date), "{}", name);
        assert_eq!(storage.get::<String>("text"), Some("qwe".to_string()), "{}", name);
        assert_eq!(storage.get::<Vec<u8>>("bytes"), Some(vec![0u8, 1, 255]), "{}", name);
        assert_eq!(storage.get::<Url>("url"), Some(url), "{}", name);
        assert_eq!(storage.get::<Vec<String>>("list"), Some(list), "{}", name);
    }
}

#[test]
fn structured_values_round_trip() {
    for (storage, _dir) in backends() {
        let name = storage.backend_name();
        let value = CodableStruct { foo: 123, bar: "qwe".to_string() };
        let theme = Theme::Custom { accent: "#ff0000".to_string() };
        let mut map = BTreeMap::new();
        map.insert("one".to_string(), 1i32);
        map.insert("two".to_string(), 2i32);

        assert!(storage.set("struct", Some(&value)), "{}", name);
        assert!(storage.set("theme", Some(&theme)), "{}", name);
        assert!(storage.set("light", Some(&Theme::Light)), "{}", name);
        assert!(storage.set("map", Some(&map)), "{}", name);

        assert_eq!(storage.get::<CodableStruct>("struct"), Some(value), "{}", name);
        assert_eq!(storage.get::<Theme>("theme"), Some(theme), "{}", name);
        assert_eq!(storage.get::<Theme>("light"), Some(Theme::Light), "{}", name);
        assert_eq!(storage.get::<BTreeMap<String, i32>>("map"), Some(map), "{}", name);
        assert_ne!(storage.get::<Theme>("light"), Some(Theme::Dark), "{}", name);
    }
}

#[test]
fn absent_key_is_none() {
    for (storage, _dir) in backends() {
        assert_eq!(storage.get::<String>("missing"), None, "{}", storage.backend_name());
        assert_eq!(storage.get::<CodableStruct>("missing"), None, "{}", storage.backend_name());
    }
}

#[test]
fn mismatched_type_is_none() {
    for (storage, _dir) in backends() {
        storage.set("key", Some(&123i64));
        assert_eq!(storage.get::<CodableStruct>("key"), None, "{}", storage.backend_name());
    }
}

#[test]
fn overwrite_with_another_type() {
    for (storage, _dir) in backends() {
        let name = storage.backend_name();

        assert!(storage.set("key", Some(&true)), "{}", name);
        assert!(storage.set("key", Some(&"asd".to_string())), "{}", name);

        assert_eq!(storage.get::<String>("key"), Some("asd".to_string()), "{}", name);
    }
}

#[test]
fn set_none_removes() {
    for (storage, _dir) in backends() {
        let name = storage.backend_name();

        storage.set("key", Some(&"value".to_string()));
        assert!(storage.set::<String>("key", None), "{}", name);

        assert_eq!(storage.get::<String>("key"), None, "{}", name);
        assert!(!storage.list_keys().contains(&"key".to_string()), "{}", name);
    }
}

#[test]
fn remove_missing_key_succeeds() {
    for (storage, _dir) in backends() {
        assert!(storage.remove("never-written"), "{}", storage.backend_name());
    }
}

#[test]
fn list_keys_and_clear() {
    for (storage, _dir) in backends() {
        let name = storage.backend_name();

        storage.set("a", Some(&1i64));
        storage.set("b", Some(&"two".to_string()));

        let mut keys = storage.list_keys();
        keys.sort();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()], "{}", name);

        assert!(storage.clear(), "{}", name);
        assert!(storage.list_keys().is_empty(), "{}", name);
        assert_eq!(storage.get::<i64>("a"), None, "{}", name);
    }
}

#[test]
fn container_falls_back_until_stored() {
    for (storage, _dir) in backends() {
        let name = storage.backend_name();
        let container = make_container(storage.clone(), "key", Some("asd".to_string()));

        assert_eq!(container.value(), Some("asd".to_string()), "{}", name);

        container.set_value(Some(&"stored".to_string()));
        assert_eq!(container.value(), Some("stored".to_string()), "{}", name);
    }
}
