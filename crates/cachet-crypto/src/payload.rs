//! Message payload encryption (the symmetric codec).
//!
//! Plaintext is encrypted under a content key with AES-256-GCM. A fresh
//! random 96-bit nonce is sampled on every call; nonce reuse under the same
//! key is a protocol violation and is structurally prevented by never
//! accepting a caller-chosen nonce. No compression, no padding beyond what
//! GCM requires.

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, KeyInit},
};
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::{NONCE_SIZE, b64, content_key::ContentKey, error::CryptoError};

/// GCM authentication tag size (16 bytes).
const TAG_SIZE: usize = 16;

/// Message plaintext encrypted under a content key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedPayload {
    /// The 96-bit AES-GCM nonce.
    #[serde(with = "b64::array")]
    pub iv: [u8; NONCE_SIZE],
    /// Ciphertext including the 16-byte authentication tag.
    #[serde(with = "b64")]
    pub ciphertext: Vec<u8>,
}

impl EncryptedPayload {
    /// Plaintext length in bytes (ciphertext length minus the tag).
    pub fn plaintext_len(&self) -> usize {
        self.ciphertext.len().saturating_sub(TAG_SIZE)
    }
}

/// Encrypt UTF-8 plaintext under a content key.
pub fn encrypt_message<R: CryptoRng + RngCore>(
    rng: &mut R,
    plaintext: &str,
    key: &ContentKey,
) -> EncryptedPayload {
    let mut iv = [0u8; NONCE_SIZE];
    rng.fill_bytes(&mut iv);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    let Ok(ciphertext) = cipher.encrypt(Nonce::from_slice(&iv), plaintext.as_bytes()) else {
        unreachable!("AES-256-GCM encryption cannot fail with valid inputs");
    };

    EncryptedPayload { iv, ciphertext }
}

/// Decrypt a payload under a content key.
///
/// # Errors
///
/// Returns [`CryptoError::Integrity`] when the authentication tag does not
/// verify or the recovered bytes are not valid UTF-8. Never returns altered
/// plaintext.
pub fn decrypt_message(payload: &EncryptedPayload, key: &ContentKey) -> Result<String, CryptoError> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&payload.iv), payload.ciphertext.as_slice())
        .map_err(|_| CryptoError::Integrity { context: "message payload" })?;

    String::from_utf8(plaintext)
        .map_err(|_| CryptoError::Integrity { context: "message payload utf-8" })
}
