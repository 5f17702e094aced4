/*
    encryption.rs - At-rest encryption for vault payloads

    Encrypts record payloads and the full vault state with AES-256-GCM
    under the location's key (see keys.rs).

    Security properties:
    - Authenticated encryption (AEAD): tampering and wrong-key decryption
      are detected, never returned as garbage
    - Unique random nonce per encryption, prepended to the ciphertext
*/

use crate::core_vault::store::errors::{StoreError, StoreResult};
use crate::core_vault::store::keys::VaultKey;
use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::OsRng;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use serde::{de::DeserializeOwned, Serialize};

/// Nonce length for AES-GCM
pub const NONCE_LEN: usize = 12;

/// Authentication tag length for AES-GCM
pub const TAG_LEN: usize = 16;

/// Authenticated cipher bound to one vault key
#[derive(Clone)]
pub struct Cipher {
    cipher: Aes256Gcm,
}

impl Cipher {
    pub fn new(key: &VaultKey) -> Self {
        let key = Key::<Aes256Gcm>::from_slice(key.as_bytes());
        Cipher {
            cipher: Aes256Gcm::new(key),
        }
    }

    /// Encrypt data, returning `nonce || ciphertext`
    pub fn encrypt(&self, plaintext: &[u8]) -> StoreResult<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| StoreError::Encryption(e.to_string()))?;

        let mut result = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        result.extend_from_slice(&nonce_bytes);
        result.extend_from_slice(&ciphertext);
        Ok(result)
    }

    /// Decrypt `nonce || ciphertext`
    pub fn decrypt(&self, data: &[u8]) -> StoreResult<Vec<u8>> {
        if data.len() < NONCE_LEN + TAG_LEN {
            return Err(StoreError::Decryption(format!(
                "ciphertext truncated ({} bytes)",
                data.len()
            )));
        }

        let (nonce, ciphertext) = data.split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| {
                StoreError::Decryption("authentication failed (tampered or wrong key)".to_string())
            })
    }

    /// Serialize to JSON, then encrypt
    pub fn encrypt_json<T: Serialize>(&self, value: &T) -> StoreResult<Vec<u8>> {
        let plaintext =
            serde_json::to_vec(value).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.encrypt(&plaintext)
    }

    /// Decrypt, then parse JSON. A payload that authenticates but does not
    /// parse is reported as a decryption failure.
    pub fn decrypt_json<T: DeserializeOwned>(&self, data: &[u8]) -> StoreResult<T> {
        let plaintext = self.decrypt(data)?;
        serde_json::from_slice(&plaintext)
            .map_err(|e| StoreError::Decryption(format!("payload is not valid JSON: {}", e)))
    }
}
