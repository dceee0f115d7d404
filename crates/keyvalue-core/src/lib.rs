//! # keyvalue-core
//!
//! Typed key-value storage over interchangeable backends:
//! - In-process memory with concurrent readers and ordered writers
//! - Persistent preference files with property-list shaped values
//! - Secure credential items in the OS credential store, with an
//!   AES-256-GCM encrypted file fallback
//! - Typed containers binding one key of one backend to a fallback value

pub mod codec;
pub mod container;
pub mod error;
pub mod key;
pub mod keychain;
pub mod preferences;
pub mod settings;
pub mod storage;

pub use codec::{Encoded, NativeValue, ScalarKind, Storable};
pub use container::{make_container, Container};
pub use error::{Result, StorageError};
pub use key::KeyResolver;
pub use keychain::{
    Accessibility, EncryptedFileItemStore, ItemStore, KeyringItemStore, MemoryItemStore,
};
pub use preferences::{FilePreferences, PreferenceDomain, PropertyValue};
pub use settings::{
    application_identifier, MemoryStoreConfig, PersistentStoreConfig, SecureStoreConfig,
    StorageSettings, Stores,
};
pub use storage::{MemoryStore, PersistentStore, SecureStore, Storage, StorageExt};
