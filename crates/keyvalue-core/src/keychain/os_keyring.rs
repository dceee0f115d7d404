//! OS credential store item backend
//!
//! Uses the system credential store through `keyring`:
//! - macOS: Keychain
//! - Windows: Credential Manager (DPAPI)
//! - Linux: Secret Service (GNOME Keyring, KWallet)
//!
//! Credential stores hold one secret string per (service, user) pair and
//! cannot enumerate entries, so each item is stored as a JSON record carrying
//! its attributes and a base64 payload, and every service keeps an index
//! entry listing its item labels.

use std::sync::{Mutex, PoisonError};

use base64::Engine;
use keyring::Entry;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use zeroize::Zeroizing;

use super::{Item, ItemAttributes, ItemError, ItemQuery, ItemStore, MatchLimit};

/// Service used to probe availability
const PROBE_SERVICE: &str = "keyvalue-core";

/// User name of the per-service index entry
const INDEX_ACCOUNT: &str = "__keyvalue_index__";

const HEX_LABEL_PREFIX: &str = "hex:";
const SYNC_LABEL_SUFFIX: &str = "#synchronizable";

/// Stored form of an item
#[derive(Serialize, Deserialize)]
struct ItemRecord {
    attributes: ItemAttributes,
    data: String,
}

/// Item store over the OS credential store
pub struct KeyringItemStore {
    available: bool,
    index_lock: Mutex<()>,
}

impl KeyringItemStore {
    /// Create a new item store, probing the credential store once
    pub fn new() -> Self {
        let available = Self::test_availability();

        if available {
            debug!("Keyring item store is available");
        } else {
            warn!("Keyring item store is not available");
        }

        Self {
            available,
            index_lock: Mutex::new(()),
        }
    }

    /// Test if the credential store accepts writes
    fn test_availability() -> bool {
        match Entry::new(PROBE_SERVICE, "__test_availability__") {
            Ok(entry) => {
                if entry.set_password("test").is_ok() {
                    let _ = entry.delete_password();
                    true
                } else {
                    false
                }
            }
            Err(_) => false,
        }
    }

    /// Check if the credential store is usable
    pub fn is_available(&self) -> bool {
        self.available
    }

    fn ensure_available(&self) -> Result<(), ItemError> {
        if self.available {
            Ok(())
        } else {
            Err(ItemError::NotAvailable(
                "OS credential store not available".to_string(),
            ))
        }
    }

    /// Credential-store service name for an item service and access group
    fn entry_service(service: &str, access_group: Option<&str>) -> String {
        match access_group {
            Some(group) => format!("{}/{}", group, service),
            None => service.to_string(),
        }
    }

    /// Credential-store user name for an item; distinct for distinct identities
    fn label(account: &[u8], synchronizable: bool) -> String {
        let mut label = match std::str::from_utf8(account) {
            Ok(text) if !text.starts_with(HEX_LABEL_PREFIX) && !text.contains('#') => {
                text.to_string()
            }
            _ => format!("{}{}", HEX_LABEL_PREFIX, hex::encode(account)),
        };
        if synchronizable {
            label.push_str(SYNC_LABEL_SUFFIX);
        }
        label
    }

    fn entry(service: &str, user: &str) -> Result<Entry, ItemError> {
        Entry::new(service, user).map_err(map_error)
    }

    fn read_index(service: &str) -> Result<Vec<String>, ItemError> {
        match Self::entry(service, INDEX_ACCOUNT)?.get_password() {
            Ok(json) => serde_json::from_str(&json)
                .map_err(|e| ItemError::Backend(format!("Corrupt item index: {}", e))),
            Err(keyring::Error::NoEntry) => Ok(Vec::new()),
            Err(e) => Err(map_error(e)),
        }
    }

    fn write_index(service: &str, labels: &[String]) -> Result<(), ItemError> {
        let entry = Self::entry(service, INDEX_ACCOUNT)?;

        if labels.is_empty() {
            return match entry.delete_password() {
                Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
                Err(e) => Err(map_error(e)),
            };
        }

        let json = serde_json::to_string(labels)
            .map_err(|e| ItemError::Backend(e.to_string()))?;
        entry.set_password(&json).map_err(map_error)
    }

    fn read_item(service: &str, label: &str) -> Result<Option<Item>, ItemError> {
        let secret = match Self::entry(service, label)?.get_password() {
            Ok(secret) => Zeroizing::new(secret),
            Err(keyring::Error::NoEntry) => return Ok(None),
            Err(e) => return Err(map_error(e)),
        };

        let record: ItemRecord = serde_json::from_str(&secret)
            .map_err(|e| ItemError::Backend(format!("Corrupt item record: {}", e)))?;
        let data = base64::engine::general_purpose::STANDARD
            .decode(&record.data)
            .map_err(|e| ItemError::Backend(format!("Base64 decode error: {}", e)))?;

        Ok(Some(Item {
            attributes: record.attributes,
            data: Zeroizing::new(data),
        }))
    }

    fn write_item(service: &str, label: &str, attributes: &ItemAttributes, data: &[u8]) -> Result<(), ItemError> {
        let record = ItemRecord {
            attributes: attributes.clone(),
            data: base64::engine::general_purpose::STANDARD.encode(data),
        };
        let secret = Zeroizing::new(
            serde_json::to_string(&record).map_err(|e| ItemError::Backend(e.to_string()))?,
        );

        Self::entry(service, label)?
            .set_password(&secret)
            .map_err(map_error)
    }

    /// Items matching `query` with their (entry service, label) locations
    fn find(&self, query: &ItemQuery) -> Result<Vec<(String, String, Item)>, ItemError> {
        self.ensure_available()?;

        // Without a service there is nothing to enumerate
        let service = query.service.as_deref().ok_or(ItemError::ItemNotFound)?;
        let entry_service = Self::entry_service(service, query.access_group.as_deref());

        let mut found = Vec::new();
        for label in Self::read_index(&entry_service)? {
            if let Some(item) = Self::read_item(&entry_service, &label)? {
                if query.matches(&item.attributes) {
                    found.push((entry_service.clone(), label, item));
                }
            }
        }
        Ok(found)
    }
}

impl Default for KeyringItemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for KeyringItemStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyringItemStore")
            .field("available", &self.available)
            .finish()
    }
}

impl ItemStore for KeyringItemStore {
    fn copy_matching(&self, query: &ItemQuery, limit: MatchLimit) -> Result<Vec<Item>, ItemError> {
        let _guard = self.index_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut items: Vec<Item> = self.find(query)?.into_iter().map(|(_, _, item)| item).collect();
        if limit == MatchLimit::One {
            items.truncate(1);
        }

        if items.is_empty() {
            return Err(ItemError::ItemNotFound);
        }
        Ok(items)
    }

    fn add(&self, attributes: ItemAttributes, data: &[u8]) -> Result<(), ItemError> {
        self.ensure_available()?;
        let _guard = self.index_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let entry_service =
            Self::entry_service(&attributes.service, attributes.access_group.as_deref());
        let label = Self::label(&attributes.account, attributes.synchronizable);

        let mut index = Self::read_index(&entry_service)?;
        if index.contains(&label) && Self::read_item(&entry_service, &label)?.is_some() {
            return Err(ItemError::DuplicateItem);
        }

        Self::write_item(&entry_service, &label, &attributes, data)?;

        if !index.contains(&label) {
            index.push(label);
            Self::write_index(&entry_service, &index)?;
        }

        debug!("Added item to keyring service {}", entry_service);
        Ok(())
    }

    fn update(&self, query: &ItemQuery, data: &[u8]) -> Result<(), ItemError> {
        let _guard = self.index_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let found = self.find(query)?;
        if found.is_empty() {
            return Err(ItemError::ItemNotFound);
        }

        for (entry_service, label, item) in &found {
            Self::write_item(entry_service, label, &item.attributes, data)?;
        }
        Ok(())
    }

    fn delete(&self, query: &ItemQuery) -> Result<(), ItemError> {
        let _guard = self.index_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let found = self.find(query)?;
        if found.is_empty() {
            return Err(ItemError::ItemNotFound);
        }

        for (entry_service, label, _) in &found {
            match Self::entry(entry_service, label)?.delete_password() {
                Ok(()) | Err(keyring::Error::NoEntry) => {}
                Err(e) => return Err(map_error(e)),
            }
        }

        // Every match shares one entry service
        if let Some((entry_service, _, _)) = found.first() {
            let mut index = Self::read_index(entry_service)?;
            index.retain(|label| !found.iter().any(|(_, removed, _)| removed == label));
            Self::write_index(entry_service, &index)?;
        }

        debug!("Deleted {} items from keyring", found.len());
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        #[cfg(target_os = "macos")]
        return "macOS Keychain";

        #[cfg(target_os = "windows")]
        return "Windows Credential Manager";

        #[cfg(target_os = "linux")]
        return "Linux Secret Service";

        #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
        return "System Keychain";
    }
}

fn map_error(err: keyring::Error) -> ItemError {
    match err {
        keyring::Error::NoEntry => ItemError::ItemNotFound,
        keyring::Error::NoStorageAccess(e) => ItemError::NotAvailable(e.to_string()),
        e => ItemError::Backend(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keychain::Accessibility;

    #[test]
    fn test_labels_are_distinct() {
        assert_eq!(KeyringItemStore::label(b"token", false), "token");
        assert_eq!(KeyringItemStore::label(b"token", true), "token#synchronizable");
        assert_eq!(KeyringItemStore::label(&[0xff, 0x00], false), "hex:ff00");
        assert_ne!(
            KeyringItemStore::label(b"hex:ff", false),
            KeyringItemStore::label(&[0xff], false)
        );
        assert_ne!(
            KeyringItemStore::label(b"a#synchronizable", false),
            KeyringItemStore::label(b"a", true)
        );
    }

    #[test]
    fn test_entry_service_includes_group() {
        assert_eq!(KeyringItemStore::entry_service("svc", None), "svc");
        assert_eq!(KeyringItemStore::entry_service("svc", Some("team")), "team/svc");
    }

    #[test]
    fn test_keyring_roundtrip_when_available() {
        let store = KeyringItemStore::new();
        if !store.is_available() {
            // Headless CI hosts often have no credential store
            return;
        }

        let attributes = ItemAttributes {
            service: "keyvalue-core-test".to_string(),
            access_group: None,
            account: b"roundtrip".to_vec(),
            generic: b"roundtrip".to_vec(),
            accessible: Accessibility::AfterFirstUnlock,
            synchronizable: false,
        };
        let query = ItemQuery::from(&attributes);
        let _ = store.delete(&query);

        store.add(attributes.clone(), b"value").unwrap();
        assert!(matches!(
            store.add(attributes.clone(), b"value"),
            Err(ItemError::DuplicateItem)
        ));

        let found = store.copy_matching(&query, MatchLimit::One).unwrap();
        assert_eq!(found[0].data.as_slice(), b"value");

        store.delete(&query).unwrap();
        assert!(matches!(
            store.copy_matching(&query, MatchLimit::One),
            Err(ItemError::ItemNotFound)
        ));
    }
}
