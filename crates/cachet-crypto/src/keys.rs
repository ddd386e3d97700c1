//! Account key pairs and their serialized forms.
//!
//! Each account holds one active NIST P-256 key-agreement pair per device
//! identity. Public keys are exported as SPKI DER, private keys as PKCS#8
//! DER, both base64-encoded for transport and storage. Export and import
//! round-trip byte-exact.

use core::fmt;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use p256::{
    PublicKey, SecretKey,
    pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey},
};
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

use crate::error::CryptoError;

/// A P-256 key-agreement pair.
///
/// The private half never leaves the client except inside a
/// [`crate::PasswordBackup`]. Generated keys are used for key agreement
/// only, never for signing.
#[derive(Clone)]
pub struct KeyPair {
    secret: SecretKey,
    public: PublicKey,
}

impl KeyPair {
    /// Generate a fresh key pair from the caller's RNG.
    pub fn generate<R: CryptoRng + RngCore>(rng: &mut R) -> Self {
        let secret = SecretKey::random(rng);
        let public = secret.public_key();
        Self { secret, public }
    }

    /// Rebuild a key pair from a serialized private key. The public half is
    /// derived from the secret scalar.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidPrivateKey`] or
    /// [`CryptoError::Encoding`] when the blob does not decode to PKCS#8.
    pub fn from_private_blob(blob: &PrivateKeyBlob) -> Result<Self, CryptoError> {
        let secret = blob.import()?;
        let public = secret.public_key();
        Ok(Self { secret, public })
    }

    /// Public half, for wrapping envelopes to self.
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Private half, for unwrapping envelopes addressed to this account.
    pub fn secret_key(&self) -> &SecretKey {
        &self.secret
    }

    /// Export the public key as base64-encoded SPKI DER.
    pub fn export_public(&self) -> PublicKeyBlob {
        let Ok(der) = self.public.to_public_key_der() else {
            unreachable!("a valid P-256 public key always encodes to SPKI");
        };
        PublicKeyBlob(STANDARD.encode(der.as_bytes()))
    }

    /// Export the private key as base64-encoded PKCS#8 DER.
    pub fn export_private(&self) -> PrivateKeyBlob {
        let Ok(der) = self.secret.to_pkcs8_der() else {
            unreachable!("a valid P-256 private key always encodes to PKCS#8");
        };
        PrivateKeyBlob(STANDARD.encode(der.as_bytes()))
    }
}

// SecretKey's own Debug already redacts the scalar; keep ours equally terse.
impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair").field("public", &self.public).finish_non_exhaustive()
    }
}

/// A base64-encoded SPKI DER public key, as published to the key directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicKeyBlob(String);

impl PublicKeyBlob {
    /// Wrap an already-encoded blob (e.g., fetched from the directory).
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// The base64 text form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse the blob back into a usable public key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Encoding`] on bad base64 and
    /// [`CryptoError::InvalidPublicKey`] on a malformed SPKI document.
    pub fn import(&self) -> Result<PublicKey, CryptoError> {
        let der = STANDARD.decode(&self.0)?;
        PublicKey::from_public_key_der(&der).map_err(|_| CryptoError::InvalidPublicKey)
    }
}

/// A base64-encoded PKCS#8 DER private key.
///
/// Zeroized on drop. Debug output is redacted.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrivateKeyBlob(String);

impl PrivateKeyBlob {
    /// Wrap an already-encoded blob (e.g., loaded from local storage).
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// The base64 text form, for handing to opaque storage.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse the blob back into a usable private key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Encoding`] on bad base64 and
    /// [`CryptoError::InvalidPrivateKey`] on a malformed PKCS#8 document.
    pub fn import(&self) -> Result<SecretKey, CryptoError> {
        let der = Zeroizing::new(STANDARD.decode(&self.0)?);
        SecretKey::from_pkcs8_der(&der).map_err(|_| CryptoError::InvalidPrivateKey)
    }

    pub(crate) fn from_der(der: &[u8]) -> Self {
        Self(STANDARD.encode(der))
    }

    pub(crate) fn der_bytes(&self) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        Ok(Zeroizing::new(STANDARD.decode(&self.0)?))
    }
}

impl Drop for PrivateKeyBlob {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl fmt::Debug for PrivateKeyBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKeyBlob(..)")
    }
}

#[cfg(test)]
mod tests {
    use rand_chacha::ChaCha20Rng;
    use rand_core::SeedableRng;

    use super::*;

    fn test_pair(seed: u64) -> KeyPair {
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        KeyPair::generate(&mut rng)
    }

    #[test]
    fn public_export_import_roundtrips_byte_exact() {
        let pair = test_pair(1);
        let blob = pair.export_public();
        let imported = blob.import().unwrap();
        assert_eq!(&imported, pair.public_key());

        // Re-exporting the imported key yields the identical blob.
        let Ok(der) = imported.to_public_key_der() else {
            unreachable!("imported key must re-encode");
        };
        assert_eq!(STANDARD.encode(der.as_bytes()), blob.as_str());
    }

    #[test]
    fn private_export_import_roundtrips() {
        let pair = test_pair(2);
        let blob = pair.export_private();
        let rebuilt = KeyPair::from_private_blob(&blob).unwrap();

        assert_eq!(rebuilt.public_key(), pair.public_key());
        assert_eq!(rebuilt.export_private().as_str(), blob.as_str());
    }

    #[test]
    fn distinct_seeds_produce_distinct_pairs() {
        let a = test_pair(3);
        let b = test_pair(4);
        assert_ne!(a.public_key(), b.public_key());
    }

    #[test]
    fn import_rejects_garbage_base64() {
        let result = PublicKeyBlob::new("not base64 at all!!!").import();
        assert!(matches!(result, Err(CryptoError::Encoding(_))));
    }

    #[test]
    fn import_rejects_non_spki_bytes() {
        let blob = PublicKeyBlob::new(STANDARD.encode(b"definitely not DER"));
        assert!(matches!(blob.import(), Err(CryptoError::InvalidPublicKey)));
    }

    #[test]
    fn private_import_rejects_non_pkcs8_bytes() {
        let blob = PrivateKeyBlob::new(STANDARD.encode(b"definitely not DER"));
        assert!(matches!(blob.import(), Err(CryptoError::InvalidPrivateKey)));
    }

    #[test]
    fn private_blob_debug_is_redacted() {
        let blob = test_pair(5).export_private();
        assert_eq!(format!("{blob:?}"), "PrivateKeyBlob(..)");
    }
}
