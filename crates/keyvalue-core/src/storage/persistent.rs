//! Persistent preference storage backend
//!
//! Native scalars go through the domain's typed accessors. Any other value
//! is stored as the first element of its structured singleton, converted to
//! a property value, because a preference domain only holds property-list
//! shaped data.

use std::sync::Arc;

use tracing::{debug, warn};

use super::Storage;
use crate::codec::{Encoded, ScalarKind};
use crate::error::{Result, StorageError};
use crate::key::KeyResolver;
use crate::preferences::{FilePreferences, PreferenceDomain, PropertyValue};
use crate::settings::PersistentStoreConfig;

/// Preference file storage backend
pub struct PersistentStore {
    domain: Arc<dyn PreferenceDomain>,
    keys: KeyResolver,
}

impl PersistentStore {
    /// Open the store described by `config`.
    ///
    /// The domain file lives in `config.directory`, or the platform
    /// preferences directory when unset.
    pub fn open(config: &PersistentStoreConfig) -> Result<Self> {
        let directory = match &config.directory {
            Some(directory) => directory.clone(),
            None => FilePreferences::default_directory()?,
        };
        let domain = FilePreferences::open(&directory, config.suite_name.as_deref())?;

        Ok(Self::with_domain(Arc::new(domain), config.key_prefix.clone()))
    }

    /// Open the application's standard domain with no key prefix
    pub fn standard() -> Result<Self> {
        Self::open(&PersistentStoreConfig::default())
    }

    /// Create a store over an existing domain
    pub fn with_domain(domain: Arc<dyn PreferenceDomain>, key_prefix: impl Into<String>) -> Self {
        Self {
            domain,
            keys: KeyResolver::new(key_prefix),
        }
    }

    /// The underlying preference domain
    pub fn domain(&self) -> &Arc<dyn PreferenceDomain> {
        &self.domain
    }

    /// Name of the suite the store is scoped to
    pub fn suite_name(&self) -> Option<&str> {
        self.domain.suite_name()
    }

    /// The configured key prefix
    pub fn key_prefix(&self) -> &str {
        self.keys.prefix()
    }

    fn store_encoded(&self, key: &str, value: Encoded) -> Result<()> {
        let property = match value {
            Encoded::Native(native) => PropertyValue::from(native),
            structured => {
                let first = structured.unwrap_structured().ok_or_else(|| {
                    StorageError::EncodingFailure("structured value is not a singleton".to_string())
                })?;
                PropertyValue::from_json(first)?
            }
        };

        self.domain.set_object(&self.keys.resolve(key), property)
    }

    fn clear_prefixed(&self) -> Result<()> {
        self.domain.remove_where(&|native_key| self.keys.owns(native_key))
    }
}

impl Storage for PersistentStore {
    fn native_kinds(&self) -> &'static [ScalarKind] {
        ScalarKind::ALL
    }

    fn read(&self, key: &str, kind: Option<ScalarKind>) -> Option<Encoded> {
        let object = self.domain.object(&self.keys.resolve(key))?;

        match kind {
            Some(kind) => object.coerce(kind).map(Encoded::Native),
            None => Some(Encoded::wrap(object.to_json())),
        }
    }

    fn write(&self, key: &str, value: Encoded) -> bool {
        match self.store_encoded(key, value) {
            Ok(()) => {
                debug!("Stored key in preferences: {}", key);
                true
            }
            Err(e) => {
                warn!("Failed to store key in preferences: {}: {}", key, e);
                false
            }
        }
    }

    fn remove(&self, key: &str) -> bool {
        match self.domain.remove_object(&self.keys.resolve(key)) {
            Ok(()) => {
                debug!("Removed key from preferences: {}", key);
                true
            }
            Err(e) => {
                warn!("Failed to remove key from preferences: {}: {}", key, e);
                false
            }
        }
    }

    /// Remove every native key whose raw name starts with the prefix.
    ///
    /// With an empty prefix this empties the whole domain, including keys
    /// that were never written through this store.
    fn clear(&self) -> bool {
        match self.clear_prefixed() {
            Ok(()) => {
                debug!("Cleared preferences with prefix {:?}", self.keys.prefix());
                true
            }
            Err(e) => {
                warn!("Failed to clear preferences: {}", e);
                false
            }
        }
    }

    fn list_keys(&self) -> Vec<String> {
        self.domain
            .keys()
            .iter()
            .filter_map(|key| self.keys.logical(key))
            .map(str::to_string)
            .collect()
    }

    fn backend_name(&self) -> &'static str {
        "Persistent Preferences"
    }
}

impl std::fmt::Debug for PersistentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentStore")
            .field("suite_name", &self.suite_name())
            .field("key_prefix", &self.keys.prefix())
            .finish()
    }
}
