//! Secure item stores
//!
//! The secure store consumes a credential store through a narrow
//! query-based surface, modelled on platform keychains:
//! 1. OS credential store via `keyring` (hardware-backed where available)
//! 2. Encrypted file (fallback for hosts without one)
//! 3. In-process memory (tests and ephemeral use)

mod accessibility;
mod cipher;
mod encrypted_file;
mod memory;
mod os_keyring;
mod query;

use thiserror::Error;

pub use accessibility::Accessibility;
pub use cipher::KdfParams;
pub use encrypted_file::EncryptedFileItemStore;
pub use memory::MemoryItemStore;
pub use os_keyring::KeyringItemStore;
pub use query::{Item, ItemAttributes, ItemQuery, MatchLimit};

/// Status of a native item store operation
#[derive(Error, Debug)]
pub enum ItemError {
    #[error("The specified item already exists")]
    DuplicateItem,

    #[error("The specified item could not be found")]
    ItemNotFound,

    #[error("Item store not available: {0}")]
    NotAvailable(String),

    #[error("Item store failure: {0}")]
    Backend(String),
}

/// Trait for native secure item stores
pub trait ItemStore: Send + Sync {
    /// Items matching `query`. Fails with `ItemNotFound` when none match.
    fn copy_matching(&self, query: &ItemQuery, limit: MatchLimit) -> Result<Vec<Item>, ItemError>;

    /// Add a new item. Fails with `DuplicateItem` when its identity exists.
    fn add(&self, attributes: ItemAttributes, data: &[u8]) -> Result<(), ItemError>;

    /// Replace the data of every item matching `query`
    fn update(&self, query: &ItemQuery, data: &[u8]) -> Result<(), ItemError>;

    /// Delete every item matching `query`
    fn delete(&self, query: &ItemQuery) -> Result<(), ItemError>;

    /// Get a human-readable name for this item store
    fn backend_name(&self) -> &'static str;
}
