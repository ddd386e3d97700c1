//! Password-based private-key backup and recovery.
//!
//! The serialized private key is encrypted under a key derived from the
//! account password with PBKDF2-HMAC-SHA256 (deliberately slow, 100,000
//! iterations) and a fresh random salt, then stored server-side. This is
//! the only path by which private key material can be reconstructed on a
//! new device; its absence is a valid state ("no recovery possible, must
//! re-key").

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, KeyInit},
};
use pbkdf2::pbkdf2_hmac;
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::{Zeroize, Zeroizing};

use crate::{
    NONCE_SIZE, b64, content_key::CONTENT_KEY_SIZE, error::CryptoError, keys::PrivateKeyBlob,
};

/// PBKDF2 iteration count. Deliberately slow to resist offline guessing.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Salt size in bytes (128-bit).
pub const SALT_SIZE: usize = 16;

/// A serialized private key encrypted under a password-derived key.
///
/// Created at registration or key rotation; consumed at login when local
/// key material is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordBackup {
    /// The PKCS#8 private key, AES-256-GCM encrypted (tag included).
    #[serde(with = "b64")]
    pub encrypted_private_key: Vec<u8>,
    /// The PBKDF2 salt.
    #[serde(with = "b64::array")]
    pub salt: [u8; SALT_SIZE],
    /// The 96-bit AES-GCM nonce.
    #[serde(with = "b64::array")]
    pub iv: [u8; NONCE_SIZE],
}

/// Encrypt a private key blob under a password for server-side escrow.
///
/// # Errors
///
/// Returns [`CryptoError::Encoding`] if the blob is not valid base64.
pub fn backup_private_key<R: CryptoRng + RngCore>(
    rng: &mut R,
    private_key: &PrivateKeyBlob,
    password: &str,
) -> Result<PasswordBackup, CryptoError> {
    let der = private_key.der_bytes()?;

    let mut salt = [0u8; SALT_SIZE];
    rng.fill_bytes(&mut salt);
    let mut iv = [0u8; NONCE_SIZE];
    rng.fill_bytes(&mut iv);

    let mut wrap_key = derive_password_key(password, &salt);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&wrap_key));
    let Ok(encrypted_private_key) = cipher.encrypt(Nonce::from_slice(&iv), der.as_slice()) else {
        unreachable!("AES-256-GCM encryption cannot fail with valid inputs");
    };
    wrap_key.zeroize();

    Ok(PasswordBackup { encrypted_private_key, salt, iv })
}

/// Decrypt a password backup back into a private key blob.
///
/// # Errors
///
/// Returns [`CryptoError::Recovery`] when authentication fails. This is the
/// expected outcome of a wrong or changed password, not necessarily
/// corruption, and is deliberately distinct from
/// [`CryptoError::Integrity`].
pub fn recover_private_key(
    backup: &PasswordBackup,
    password: &str,
) -> Result<PrivateKeyBlob, CryptoError> {
    let mut wrap_key = derive_password_key(password, &backup.salt);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&wrap_key));
    let result =
        cipher.decrypt(Nonce::from_slice(&backup.iv), backup.encrypted_private_key.as_slice());
    wrap_key.zeroize();

    let der = Zeroizing::new(result.map_err(|_| CryptoError::Recovery)?);
    Ok(PrivateKeyBlob::from_der(&der))
}

fn derive_password_key(password: &str, salt: &[u8]) -> [u8; CONTENT_KEY_SIZE] {
    let mut key = [0u8; CONTENT_KEY_SIZE];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ITERATIONS, &mut key);
    key
}
