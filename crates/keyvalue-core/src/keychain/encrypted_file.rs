//! Encrypted file item store
//!
//! Keeps items in a single JSON file. Attributes are stored in the clear so
//! queries can run without decrypting; each payload is individually sealed
//! with AES-256-GCM under a key derived from a passphrase.

use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use zeroize::Zeroizing;

use super::cipher::{generate_salt, ItemCipher, KdfParams};
use super::{Item, ItemAttributes, ItemError, ItemQuery, ItemStore, MatchLimit};
use crate::error::{Result, StorageError};

const FILE_VERSION: u32 = 1;
const VERIFICATION_PLAINTEXT: &[u8] = b"keyvalue-secure-store-verification";

/// On-disk layout
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemFile {
    version: u32,
    salt: String,
    kdf: KdfParams,
    verification: String,
    items: Vec<SealedItem>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SealedItem {
    attributes: ItemAttributes,
    data: String,
}

/// Item store kept in a passphrase-encrypted file
#[derive(Debug)]
pub struct EncryptedFileItemStore {
    path: PathBuf,
    salt: String,
    kdf: KdfParams,
    verification: String,
    cipher: ItemCipher,
    items: RwLock<Vec<Item>>,
}

impl EncryptedFileItemStore {
    /// Open or create the store at `path` with default KDF parameters
    pub fn open(path: impl Into<PathBuf>, passphrase: &str) -> Result<Self> {
        Self::open_with_params(path, passphrase, KdfParams::default())
    }

    /// Open or create the store at `path`.
    ///
    /// `params` only apply when the file is created; an existing file keeps
    /// the parameters it was written with. Fails with
    /// [`StorageError::InvalidPassphrase`] if the passphrase does not match.
    pub fn open_with_params(
        path: impl Into<PathBuf>,
        passphrase: &str,
        params: KdfParams,
    ) -> Result<Self> {
        let path = path.into();

        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            let file: ItemFile = serde_json::from_str(&contents)?;
            return Self::unlock(path, file, passphrase);
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let salt = generate_salt();
        let cipher = ItemCipher::derive(passphrase, &salt, &params)?;
        let verification = cipher.seal(VERIFICATION_PLAINTEXT)?;

        let store = Self {
            path,
            salt,
            kdf: params,
            verification,
            cipher,
            items: RwLock::new(Vec::new()),
        };
        store.save(&[])?;

        debug!("Created encrypted item file at {:?}", store.path);
        Ok(store)
    }

    fn unlock(path: PathBuf, file: ItemFile, passphrase: &str) -> Result<Self> {
        if file.version != FILE_VERSION {
            return Err(StorageError::Unsupported(format!(
                "encrypted item file version {}",
                file.version
            )));
        }

        let cipher = ItemCipher::derive(passphrase, &file.salt, &file.kdf)?;

        match cipher.open(&file.verification) {
            Ok(plaintext) if plaintext.as_slice() == VERIFICATION_PLAINTEXT => {}
            _ => return Err(StorageError::InvalidPassphrase),
        }

        let items = file
            .items
            .into_iter()
            .map(|sealed| -> Result<Item> {
                Ok(Item {
                    data: cipher.open(&sealed.data)?,
                    attributes: sealed.attributes,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!("Loaded {} items from {:?}", items.len(), path);

        Ok(Self {
            path,
            salt: file.salt,
            kdf: file.kdf,
            verification: file.verification,
            cipher,
            items: RwLock::new(items),
        })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write `items` to disk atomically
    fn save(&self, items: &[Item]) -> Result<()> {
        let sealed = items
            .iter()
            .map(|item| -> Result<SealedItem> {
                Ok(SealedItem {
                    attributes: item.attributes.clone(),
                    data: self.cipher.seal(&item.data)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let file = ItemFile {
            version: FILE_VERSION,
            salt: self.salt.clone(),
            kdf: self.kdf,
            verification: self.verification.clone(),
            items: sealed,
        };

        let contents = serde_json::to_string_pretty(&file)?;

        let temp_path = self.path.with_extension("tmp");
        std::fs::write(&temp_path, &contents)?;
        std::fs::rename(&temp_path, &self.path)?;

        debug!("Saved {} items to {:?}", items.len(), self.path);
        Ok(())
    }

    /// Apply `change` to a copy of the items, persist it, then publish it
    fn commit<F>(&self, change: F) -> std::result::Result<(), ItemError>
    where
        F: FnOnce(&mut Vec<Item>) -> std::result::Result<(), ItemError>,
    {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);

        let mut next = items.clone();
        change(&mut next)?;

        self.save(&next).map_err(|e| {
            warn!("Failed to save encrypted item file: {}", e);
            ItemError::Backend(e.to_string())
        })?;

        *items = next;
        Ok(())
    }
}

impl ItemStore for EncryptedFileItemStore {
    fn copy_matching(&self, query: &ItemQuery, limit: MatchLimit) -> std::result::Result<Vec<Item>, ItemError> {
        let items = self.items.read().unwrap_or_else(PoisonError::into_inner);
        let matching = items.iter().filter(|item| query.matches(&item.attributes));

        let found: Vec<Item> = match limit {
            MatchLimit::One => matching.take(1).cloned().collect(),
            MatchLimit::All => matching.cloned().collect(),
        };

        if found.is_empty() {
            return Err(ItemError::ItemNotFound);
        }
        Ok(found)
    }

    fn add(&self, attributes: ItemAttributes, data: &[u8]) -> std::result::Result<(), ItemError> {
        self.commit(|items| {
            if items.iter().any(|item| item.attributes.same_identity(&attributes)) {
                return Err(ItemError::DuplicateItem);
            }
            items.push(Item {
                attributes,
                data: Zeroizing::new(data.to_vec()),
            });
            Ok(())
        })
    }

    fn update(&self, query: &ItemQuery, data: &[u8]) -> std::result::Result<(), ItemError> {
        self.commit(|items| {
            let mut updated = false;
            for item in items.iter_mut().filter(|item| query.matches(&item.attributes)) {
                item.data = Zeroizing::new(data.to_vec());
                updated = true;
            }
            if updated {
                Ok(())
            } else {
                Err(ItemError::ItemNotFound)
            }
        })
    }

    fn delete(&self, query: &ItemQuery) -> std::result::Result<(), ItemError> {
        self.commit(|items| {
            let before = items.len();
            items.retain(|item| !query.matches(&item.attributes));
            if items.len() < before {
                Ok(())
            } else {
                Err(ItemError::ItemNotFound)
            }
        })
    }

    fn backend_name(&self) -> &'static str {
        "Encrypted File"
    }
}
