//! Symmetric content keys.
//!
//! A content key encrypts exactly one message (1:1 case) or one group's
//! message stream until rotated (group case). It is never persisted in the
//! clear; it travels only inside [`crate::Envelope`]s.

use core::fmt;

use rand_core::{CryptoRng, RngCore};
use zeroize::Zeroize;

use crate::error::CryptoError;

/// Content key size in bytes (256-bit).
pub const CONTENT_KEY_SIZE: usize = 32;

/// A random 256-bit symmetric key for AES-256-GCM.
///
/// Zeroized on drop. Cloning is allowed because protocol layers cache group
/// keys for the session lifetime; clones zeroize independently.
#[derive(Clone)]
pub struct ContentKey {
    bytes: [u8; CONTENT_KEY_SIZE],
}

impl ContentKey {
    /// Sample a fresh content key from the caller's RNG.
    pub fn generate<R: CryptoRng + RngCore>(rng: &mut R) -> Self {
        let mut bytes = [0u8; CONTENT_KEY_SIZE];
        rng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Rebuild a content key from raw bytes (e.g., an unwrapped envelope).
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeyLength`] unless exactly
    /// [`CONTENT_KEY_SIZE`] bytes are provided.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let bytes: [u8; CONTENT_KEY_SIZE] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidKeyLength { expected: CONTENT_KEY_SIZE, actual: bytes.len() }
        })?;
        Ok(Self { bytes })
    }

    /// Raw key bytes for AEAD use.
    pub fn as_bytes(&self) -> &[u8; CONTENT_KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for ContentKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

// Never print key material.
impl fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ContentKey(..)")
    }
}
