//! Secure credential storage backend
//!
//! Every key maps to one generic-credential item addressed by service,
//! access group, synchronization flag and the resolved key as account.
//! Text is stored as UTF-8, byte sequences pass through raw, and every other
//! value is stored as its JSON singleton array.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use super::Storage;
use crate::codec::{Encoded, NativeValue, ScalarKind};
use crate::error::{Result, StorageError};
use crate::key::KeyResolver;
use crate::keychain::{
    Accessibility, EncryptedFileItemStore, ItemAttributes, ItemError, ItemQuery, ItemStore,
    KdfParams, KeyringItemStore, MatchLimit,
};
use crate::settings::{application_identifier, SecureStoreConfig};

/// File name of the encrypted fallback item store
pub const FALLBACK_FILE_NAME: &str = "secure-store.json";

const SECURE_NATIVE_KINDS: &[ScalarKind] = &[ScalarKind::Text, ScalarKind::Bytes];

/// Secure item storage backend
pub struct SecureStore {
    service: String,
    config: SecureStoreConfig,
    keys: KeyResolver,
    items: Arc<dyn ItemStore>,
}

impl SecureStore {
    /// Create a store over an item store
    pub fn new(config: SecureStoreConfig, items: Arc<dyn ItemStore>) -> Self {
        let service = config
            .service
            .clone()
            .unwrap_or_else(application_identifier);

        Self {
            service,
            keys: KeyResolver::new(config.key_prefix.clone()),
            config,
            items,
        }
    }

    /// Default configuration over the OS credential store
    pub fn standard() -> Self {
        Self::new(SecureStoreConfig::default(), Arc::new(KeyringItemStore::new()))
    }

    /// Use the OS credential store when available, otherwise an encrypted
    /// file in `directory`.
    ///
    /// `passphrase` is only called when the encrypted file is needed.
    pub fn with_fallback(
        config: SecureStoreConfig,
        directory: impl AsRef<Path>,
        passphrase: impl FnOnce() -> Result<String>,
    ) -> Result<Self> {
        let keyring = KeyringItemStore::new();
        if keyring.is_available() {
            info!("Using OS credential store for secure storage");
            return Ok(Self::new(config, Arc::new(keyring)));
        }

        Self::encrypted_file(config, directory, KdfParams::default(), passphrase)
    }

    /// Store items in the encrypted file inside `directory`, creating it with
    /// `params` if missing
    pub fn encrypted_file(
        config: SecureStoreConfig,
        directory: impl AsRef<Path>,
        params: KdfParams,
        passphrase: impl FnOnce() -> Result<String>,
    ) -> Result<Self> {
        let path = directory.as_ref().join(FALLBACK_FILE_NAME);
        let passphrase = Zeroizing::new(passphrase()?);

        info!("Using encrypted file for secure storage: {:?}", path);
        let items = EncryptedFileItemStore::open_with_params(path, &passphrase, params)?;
        Ok(Self::new(config, Arc::new(items)))
    }

    /// Accessibility tier applied to written items
    pub fn accessibility(&self) -> Accessibility {
        self.config.accessibility
    }

    /// Service identifier items are stored under
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Access group items are stored under, if any
    pub fn access_group(&self) -> Option<&str> {
        self.config.access_group.as_deref()
    }

    /// Whether items are marked for synchronization
    pub fn synchronizable(&self) -> bool {
        self.config.synchronizable
    }

    /// The configured key prefix
    pub fn key_prefix(&self) -> &str {
        self.keys.prefix()
    }

    /// The underlying item store
    pub fn item_store(&self) -> &Arc<dyn ItemStore> {
        &self.items
    }

    fn attributes(&self, key: &str) -> ItemAttributes {
        let account = self.keys.resolve(key).into_bytes();
        ItemAttributes {
            service: self.service.clone(),
            access_group: self.config.access_group.clone(),
            generic: account.clone(),
            account,
            accessible: self.config.accessibility,
            synchronizable: self.config.synchronizable,
        }
    }

    /// Query for every item this store's service and access group own
    fn service_query(&self) -> ItemQuery {
        ItemQuery::service(self.service.clone(), self.config.access_group.clone())
    }

    fn payload(value: Encoded) -> Result<Zeroizing<Vec<u8>>> {
        let bytes = match value {
            Encoded::Native(NativeValue::Text(text)) => text.into_bytes(),
            Encoded::Native(NativeValue::Bytes(bytes)) => bytes,
            Encoded::Native(other) => {
                return Err(StorageError::Unsupported(format!(
                    "{:?} is not stored natively in secure storage",
                    other.kind()
                )))
            }
            Encoded::Structured(value) => serde_json::to_vec(&value)?,
        };
        Ok(Zeroizing::new(bytes))
    }

    fn store(&self, key: &str, value: Encoded) -> Result<()> {
        let data = Self::payload(value)?;
        let attributes = self.attributes(key);
        let query = ItemQuery::from(&attributes);

        match self.items.add(attributes, &data) {
            Ok(()) => Ok(()),
            Err(ItemError::DuplicateItem) => Ok(self.items.update(&query, &data)?),
            Err(e) => Err(e.into()),
        }
    }
}

impl Storage for SecureStore {
    fn native_kinds(&self) -> &'static [ScalarKind] {
        SECURE_NATIVE_KINDS
    }

    fn read(&self, key: &str, kind: Option<ScalarKind>) -> Option<Encoded> {
        let query = ItemQuery::from(&self.attributes(key));

        let item = match self.items.copy_matching(&query, MatchLimit::One) {
            Ok(items) => items.into_iter().next()?,
            Err(ItemError::ItemNotFound) => return None,
            Err(e) => {
                warn!("Failed to read secure item {}: {}", key, e);
                return None;
            }
        };

        match kind {
            Some(ScalarKind::Text) => String::from_utf8(item.data.to_vec())
                .ok()
                .map(|text| Encoded::Native(NativeValue::Text(text))),
            Some(ScalarKind::Bytes) => Some(Encoded::Native(NativeValue::Bytes(item.data.to_vec()))),
            _ => serde_json::from_slice(&item.data).ok().map(Encoded::Structured),
        }
    }

    fn write(&self, key: &str, value: Encoded) -> bool {
        match self.store(key, value) {
            Ok(()) => {
                debug!("Stored secure item: {}", key);
                true
            }
            Err(e) => {
                warn!("Failed to store secure item {}: {}", key, e);
                false
            }
        }
    }

    /// Deleting a key that holds no item succeeds
    fn remove(&self, key: &str) -> bool {
        let query = ItemQuery::from(&self.attributes(key));

        match self.items.delete(&query) {
            Ok(()) | Err(ItemError::ItemNotFound) => {
                debug!("Removed secure item: {}", key);
                true
            }
            Err(e) => {
                warn!("Failed to remove secure item {}: {}", key, e);
                false
            }
        }
    }

    /// Delete every item of the service and access group, whatever its
    /// accessibility tier or key prefix
    fn clear(&self) -> bool {
        match self.items.delete(&self.service_query()) {
            Ok(()) | Err(ItemError::ItemNotFound) => {
                debug!("Cleared secure items for service {}", self.service);
                true
            }
            Err(e) => {
                warn!("Failed to clear secure items for service {}: {}", self.service, e);
                false
            }
        }
    }

    /// Accounts that are not valid UTF-8 are skipped
    fn list_keys(&self) -> Vec<String> {
        let items = match self.items.copy_matching(&self.service_query(), MatchLimit::All) {
            Ok(items) => items,
            Err(ItemError::ItemNotFound) => return Vec::new(),
            Err(e) => {
                warn!("Failed to list secure items: {}", e);
                return Vec::new();
            }
        };

        let mut keys: Vec<String> = items
            .iter()
            .filter_map(|item| std::str::from_utf8(&item.attributes.account).ok())
            .filter_map(|account| self.keys.logical(account))
            .map(str::to_string)
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    fn backend_name(&self) -> &'static str {
        self.items.backend_name()
    }
}

impl std::fmt::Debug for SecureStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureStore")
            .field("service", &self.service)
            .field("config", &self.config)
            .field("backend", &self.items.backend_name())
            .finish()
    }
}
