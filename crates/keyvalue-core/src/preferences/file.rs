//! JSON file preference domain
//!
//! Each suite lives in its own `<suite>.json` file, guarded by an advisory
//! lock on a sibling `<suite>.lock` file. Nothing is cached: every operation
//! reads the file under the lock, so any number of domains, in this process
//! or another, can share one suite.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{PreferenceDomain, PropertyValue};
use crate::error::{Result, StorageError};
use crate::settings::application_identifier;

/// Current file format version
const FORMAT_VERSION: u32 = 1;

type Entries = BTreeMap<String, PropertyValue>;

/// File format for a preference domain
#[derive(Debug, Serialize, Deserialize)]
struct DomainFile {
    version: u32,
    entries: Entries,
}

/// Preference domain persisted as a JSON file
#[derive(Debug)]
pub struct FilePreferences {
    path: PathBuf,
    lock_path: PathBuf,
    suite_name: Option<String>,
}

impl FilePreferences {
    /// Open (or create) the domain for `suite_name` inside `directory`.
    ///
    /// Without a suite name the application's standard domain is used. An
    /// existing file that cannot be parsed fails here rather than on first
    /// use.
    pub fn open(directory: &Path, suite_name: Option<&str>) -> Result<Self> {
        if let Some(name) = suite_name {
            validate_suite_name(name)?;
        }

        std::fs::create_dir_all(directory)?;

        let stem = match suite_name {
            Some(name) => name.to_string(),
            None => application_identifier(),
        };
        let domain = Self {
            path: directory.join(format!("{}.json", stem)),
            lock_path: directory.join(format!("{}.lock", stem)),
            suite_name: suite_name.map(str::to_string),
        };

        let entries = domain.snapshot()?;
        debug!("Opened preference domain at {:?} ({} entries)", domain.path, entries.len());

        Ok(domain)
    }

    /// Get the default preferences directory
    pub fn default_directory() -> Result<PathBuf> {
        ProjectDirs::from("", "", &application_identifier())
            .map(|dirs| dirs.preference_dir().to_path_buf())
            .ok_or_else(|| {
                StorageError::BackendRejected("Could not determine preferences directory".to_string())
            })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Take the suite lock. It is released when the returned file closes.
    fn lock(&self, exclusive: bool) -> Result<File> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)?;

        if exclusive {
            FileExt::lock_exclusive(&file)?;
        } else {
            FileExt::lock_shared(&file)?;
        }
        Ok(file)
    }

    fn load(&self) -> Result<Entries> {
        if !self.path.exists() {
            return Ok(Entries::new());
        }

        let contents = std::fs::read_to_string(&self.path)?;
        let file: DomainFile = serde_json::from_str(&contents)?;
        Ok(file.entries)
    }

    fn save(&self, entries: Entries) -> Result<()> {
        let count = entries.len();
        let file = DomainFile {
            version: FORMAT_VERSION,
            entries,
        };
        let contents = serde_json::to_string_pretty(&file)?;

        // Write atomically using a temp file
        let temp_path = self.path.with_extension("tmp");
        std::fs::write(&temp_path, contents)?;
        std::fs::rename(&temp_path, &self.path)?;

        debug!("Saved {} preference entries to {:?}", count, self.path);
        Ok(())
    }

    /// Current contents of the file
    fn snapshot(&self) -> Result<Entries> {
        let _lock = self.lock(false)?;
        self.load()
    }

    /// Read, modify and write back the file under the exclusive lock.
    /// `mutate` returns whether anything changed; unchanged files are not
    /// rewritten.
    fn update(&self, mutate: impl FnOnce(&mut Entries) -> bool) -> Result<()> {
        let _lock = self.lock(true)?;
        let mut entries = self.load()?;

        if mutate(&mut entries) {
            self.save(entries)?;
        }
        Ok(())
    }
}

impl PreferenceDomain for FilePreferences {
    fn object(&self, key: &str) -> Option<PropertyValue> {
        match self.snapshot() {
            Ok(mut entries) => entries.remove(key),
            Err(e) => {
                warn!("Failed to read preferences from {:?}: {}", self.path, e);
                None
            }
        }
    }

    fn set_object(&self, key: &str, value: PropertyValue) -> Result<()> {
        if !value.is_persistable() {
            return Err(StorageError::Unsupported(
                "non-finite numbers cannot be persisted".to_string(),
            ));
        }

        self.update(|entries| {
            entries.insert(key.to_string(), value);
            true
        })
    }

    fn remove_object(&self, key: &str) -> Result<()> {
        self.update(|entries| entries.remove(key).is_some())
    }

    fn remove_where(&self, predicate: &dyn Fn(&str) -> bool) -> Result<()> {
        self.update(|entries| {
            let before = entries.len();
            entries.retain(|key, _| !predicate(key.as_str()));
            entries.len() != before
        })
    }

    fn keys(&self) -> Vec<String> {
        match self.snapshot() {
            Ok(entries) => entries.into_keys().collect(),
            Err(e) => {
                warn!("Failed to read preferences from {:?}: {}", self.path, e);
                Vec::new()
            }
        }
    }

    fn suite_name(&self) -> Option<&str> {
        self.suite_name.as_deref()
    }
}

fn validate_suite_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.contains('\0');

    if invalid {
        return Err(StorageError::InvalidSuite(name.to_string()));
    }
    Ok(())
}
