//! In-process item store with keychain semantics

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use zeroize::Zeroizing;

use super::{Item, ItemAttributes, ItemError, ItemQuery, ItemStore, MatchLimit};

/// Item store held in memory
#[derive(Debug)]
pub struct MemoryItemStore {
    items: RwLock<Vec<Item>>,
    passcode_set: bool,
}

impl MemoryItemStore {
    /// Create an empty store on a device with a passcode
    pub fn new() -> Self {
        Self {
            items: RwLock::new(Vec::new()),
            passcode_set: true,
        }
    }

    /// Create an empty store emulating a device without a passcode.
    ///
    /// Items that require a passcode are then rejected.
    pub fn without_passcode() -> Self {
        Self {
            passcode_set: false,
            ..Self::new()
        }
    }

    /// Number of stored items
    pub fn len(&self) -> usize {
        self.items().len()
    }

    /// Whether the store holds no items
    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    fn items(&self) -> RwLockReadGuard<'_, Vec<Item>> {
        self.items.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn items_mut(&self) -> RwLockWriteGuard<'_, Vec<Item>> {
        self.items.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryItemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ItemStore for MemoryItemStore {
    fn copy_matching(&self, query: &ItemQuery, limit: MatchLimit) -> Result<Vec<Item>, ItemError> {
        let items = self.items();
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

    fn add(&self, attributes: ItemAttributes, data: &[u8]) -> Result<(), ItemError> {
        if attributes.accessible.requires_passcode() && !self.passcode_set {
            return Err(ItemError::NotAvailable(
                "no device passcode is set".to_string(),
            ));
        }

        let mut items = self.items_mut();
        if items.iter().any(|item| item.attributes.same_identity(&attributes)) {
            return Err(ItemError::DuplicateItem);
        }

        items.push(Item {
            attributes,
            data: Zeroizing::new(data.to_vec()),
        });
        Ok(())
    }

    fn update(&self, query: &ItemQuery, data: &[u8]) -> Result<(), ItemError> {
        let mut items = self.items_mut();
        let mut updated = 0;

        for item in items.iter_mut().filter(|item| query.matches(&item.attributes)) {
            item.data = Zeroizing::new(data.to_vec());
            updated += 1;
        }

        if updated == 0 {
            return Err(ItemError::ItemNotFound);
        }
        Ok(())
    }

    fn delete(&self, query: &ItemQuery) -> Result<(), ItemError> {
        let mut items = self.items_mut();
        let before = items.len();

        items.retain(|item| !query.matches(&item.attributes));

        if items.len() == before {
            return Err(ItemError::ItemNotFound);
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "Memory Item Store"
    }
}
