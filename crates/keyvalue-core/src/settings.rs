//! Storage settings management
//!
//! Backend configuration lives in a plain JSON file. Every field has a
//! default, so a partial or missing file is fine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::keychain::{Accessibility, ItemStore, KeyringItemStore};
use crate::storage::{MemoryStore, PersistentStore, SecureStore};

/// Fallback application identifier when the executable name is unknown
const DEFAULT_APPLICATION_IDENTIFIER: &str = "SecureStore";

const SETTINGS_VERSION: u32 = 1;

/// Identifier of the running application.
///
/// The executable's file stem, used as the default secure-store service and
/// the default preference suite name.
pub fn application_identifier() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|path| path.file_stem().map(|stem| stem.to_string_lossy().into_owned()))
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| DEFAULT_APPLICATION_IDENTIFIER.to_string())
}

/// Memory store configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MemoryStoreConfig {
    /// Prefix applied to every key
    pub key_prefix: String,
}

/// Persistent store configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistentStoreConfig {
    /// Named preference suite; the application's standard domain when unset
    pub suite_name: Option<String>,
    /// Prefix applied to every key
    pub key_prefix: String,
    /// Directory holding preference files; the platform default when unset
    pub directory: Option<PathBuf>,
}

/// Secure store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecureStoreConfig {
    /// Accessibility tier for written items
    pub accessibility: Accessibility,
    /// Service identifier; the application identifier when unset
    pub service: Option<String>,
    /// Access group shared between applications
    pub access_group: Option<String>,
    /// Whether items synchronize across the user's devices
    pub synchronizable: bool,
    /// Prefix applied to every key
    pub key_prefix: String,
}

impl Default for SecureStoreConfig {
    fn default() -> Self {
        Self {
            accessibility: Accessibility::AfterFirstUnlock,
            service: None,
            access_group: None,
            synchronizable: false,
            key_prefix: String::new(),
        }
    }
}

/// Storage settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageSettings {
    /// Settings file version
    pub version: u32,
    pub memory: MemoryStoreConfig,
    pub persistent: PersistentStoreConfig,
    pub secure: SecureStoreConfig,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION,
            memory: MemoryStoreConfig::default(),
            persistent: PersistentStoreConfig::default(),
            secure: SecureStoreConfig::default(),
        }
    }
}

impl StorageSettings {
    /// Load settings from a JSON file, or defaults if it doesn't exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No settings file found, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let settings: StorageSettings = serde_json::from_str(&contents)?;
        debug!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Save settings to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Write atomically using temp file
        let temp_path = path.with_extension("tmp");
        std::fs::write(&temp_path, &contents)?;
        std::fs::rename(&temp_path, path)?;

        debug!("Saved settings to {:?}", path);
        Ok(())
    }
}

/// One instance of each backend, built from settings and passed explicitly
#[derive(Debug, Clone)]
pub struct Stores {
    pub memory: Arc<MemoryStore>,
    pub persistent: Arc<PersistentStore>,
    pub secure: Arc<SecureStore>,
}

impl Stores {
    /// Build every backend, with secure items in the OS credential store
    pub fn from_settings(settings: &StorageSettings) -> Result<Self> {
        Self::with_item_store(settings, Arc::new(KeyringItemStore::new()))
    }

    /// Build every backend over a given secure item store
    pub fn with_item_store(settings: &StorageSettings, items: Arc<dyn ItemStore>) -> Result<Self> {
        Ok(Self {
            memory: Arc::new(MemoryStore::from_config(&settings.memory)),
            persistent: Arc::new(PersistentStore::open(&settings.persistent)?),
            secure: Arc::new(SecureStore::new(settings.secure.clone(), items)),
        })
    }
}
