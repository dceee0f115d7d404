//! Passphrase-derived AES-256-GCM sealing for the encrypted item file
//!
//! Sealed format: `{iv_hex}:{auth_tag_hex}:{ciphertext_hex}`

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use argon2::{password_hash::SaltString, Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{Result, StorageError};

const IV_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Parameters for Argon2id key derivation, stored alongside the salt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KdfParams {
    /// Memory cost in KiB (default: 65536 = 64MB)
    pub memory_cost: u32,
    /// Time cost / iterations (default: 3)
    pub time_cost: u32,
    /// Parallelism (default: 4)
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_cost: 65536,
            time_cost: 3,
            parallelism: 4,
        }
    }
}

/// Generate a random salt for key derivation
pub(crate) fn generate_salt() -> String {
    SaltString::generate(&mut OsRng).to_string()
}

/// Item encryption key - zeroed when dropped
#[derive(Zeroize, ZeroizeOnDrop)]
pub(crate) struct ItemCipher {
    key: [u8; 32],
}

impl ItemCipher {
    /// Derive a 256-bit key from a passphrase using Argon2id
    pub(crate) fn derive(passphrase: &str, salt: &str, params: &KdfParams) -> Result<Self> {
        let argon2_params = Params::new(
            params.memory_cost,
            params.time_cost,
            params.parallelism,
            Some(32),
        )
        .map_err(|e| StorageError::EncryptionError(format!("Invalid KDF parameters: {}", e)))?;

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

        let mut key = [0u8; 32];
        argon2
            .hash_password_into(passphrase.as_bytes(), salt.as_bytes(), &mut key)
            .map_err(|e| StorageError::EncryptionError(format!("Key derivation failed: {}", e)))?;

        Ok(Self { key })
    }

    /// Encrypt `plaintext` under a fresh random IV
    pub(crate) fn seal(&self, plaintext: &[u8]) -> Result<String> {
        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| StorageError::EncryptionError(e.to_string()))?;

        let mut iv = [0u8; IV_LEN];
        rand::thread_rng().fill_bytes(&mut iv);

        // aes-gcm appends the auth tag to the ciphertext
        let sealed = cipher
            .encrypt(Nonce::from_slice(&iv), plaintext)
            .map_err(|e| StorageError::EncryptionError(e.to_string()))?;

        let tag_start = sealed
            .len()
            .checked_sub(TAG_LEN)
            .ok_or_else(|| StorageError::EncryptionError("Ciphertext too short".to_string()))?;

        Ok(format!(
            "{}:{}:{}",
            hex::encode(iv),
            hex::encode(&sealed[tag_start..]),
            hex::encode(&sealed[..tag_start])
        ))
    }

    /// Decrypt a value produced by [`ItemCipher::seal`]
    pub(crate) fn open(&self, sealed: &str) -> Result<Zeroizing<Vec<u8>>> {
        let parts: Vec<&str> = sealed.split(':').collect();
        if parts.len() != 3 {
            return Err(StorageError::DecryptionError(
                "Invalid encrypted data format: expected iv:tag:ciphertext".to_string(),
            ));
        }

        let decode = |part: &str, what: &str| {
            hex::decode(part)
                .map_err(|e| StorageError::DecryptionError(format!("Invalid {} hex: {}", what, e)))
        };
        let iv = decode(parts[0], "IV")?;
        let tag = decode(parts[1], "auth tag")?;
        let mut ciphertext = decode(parts[2], "ciphertext")?;

        if iv.len() != IV_LEN || tag.len() != TAG_LEN {
            return Err(StorageError::DecryptionError(format!(
                "Invalid IV/tag length: {}/{}",
                iv.len(),
                tag.len()
            )));
        }
        ciphertext.extend_from_slice(&tag);

        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| StorageError::DecryptionError(e.to_string()))?;

        cipher
            .decrypt(Nonce::from_slice(&iv), ciphertext.as_slice())
            .map(Zeroizing::new)
            .map_err(|e| StorageError::DecryptionError(e.to_string()))
    }
}

impl std::fmt::Debug for ItemCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemCipher")
            .field("key", &"[REDACTED]")
            .finish()
    }
}
