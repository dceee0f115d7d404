//! Storage backends
//!
//! This module provides three backends behind one [`Storage`] contract:
//! 1. In-process memory
//! 2. Persistent preference files
//! 3. Secure credential items

mod memory;
mod persistent;
mod secure;
mod traits;

pub use memory::MemoryStore;
pub use persistent::PersistentStore;
pub use secure::{SecureStore, FALLBACK_FILE_NAME};
pub use traits::{Storage, StorageExt};
