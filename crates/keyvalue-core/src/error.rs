//! Error types for keyvalue-core
//!
//! The public [`Storage`](crate::Storage) contract reports failures as
//! `bool`/`Option` sentinels. These errors are what the backends see
//! internally before collapsing them, and what constructors return.

use thiserror::Error;

use crate::keychain::ItemError;

/// Result type alias for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// Storage error types
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Encoding failed: {0}")]
    EncodingFailure(String),

    #[error("Backend rejected operation: {0}")]
    BackendRejected(String),

    #[error("Unsupported value: {0}")]
    Unsupported(String),

    #[error("Invalid preference suite name: {0:?}")]
    InvalidSuite(String),

    #[error("Invalid passphrase")]
    InvalidPassphrase,

    #[error("Encryption failed: {0}")]
    EncryptionError(String),

    #[error("Decryption failed: {0}")]
    DecryptionError(String),

    #[error("Keychain error: {0}")]
    KeychainError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl From<ItemError> for StorageError {
    fn from(err: ItemError) -> Self {
        match err {
            ItemError::Backend(message) => StorageError::KeychainError(message),
            other => StorageError::BackendRejected(other.to_string()),
        }
    }
}
