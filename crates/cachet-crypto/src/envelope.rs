//! Content-key envelopes (hybrid ECIES-style wrap).
//!
//! An [`Envelope`] is one content key encrypted for exactly one recipient
//! public key: a fresh ephemeral P-256 pair performs ECDH with the
//! recipient key, HKDF-SHA256 (context `"encryption"`, no salt) derives a
//! wrap key from the shared secret, and AES-256-GCM seals the content key
//! under a fresh 96-bit nonce. The routine has no knowledge of "message"
//! versus "group key" semantics; both protocol paths reuse it unchanged.

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, KeyInit},
};
use hkdf::Hkdf;
use p256::{
    PublicKey, SecretKey,
    ecdh::{self, EphemeralSecret},
    pkcs8::{DecodePublicKey, EncodePublicKey},
};
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use zeroize::Zeroize;

use crate::{
    NONCE_SIZE, b64,
    content_key::{CONTENT_KEY_SIZE, ContentKey},
    error::CryptoError,
};

/// HKDF domain-separation context for envelope wrap keys.
const ENVELOPE_CONTEXT: &[u8] = b"encryption";

/// A content key wrapped for one specific recipient public key.
///
/// One envelope exists per (content key, recipient) pair: two per 1:1
/// message (recipient + sender-self), one per member for group keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// SPKI DER encoding of the ephemeral public key used for ECDH.
    #[serde(with = "b64")]
    pub ephemeral_public_key: Vec<u8>,
    /// The 96-bit AES-GCM nonce.
    #[serde(with = "b64::array")]
    pub nonce: [u8; NONCE_SIZE],
    /// The wrapped content key, including the 16-byte authentication tag.
    #[serde(with = "b64")]
    pub ciphertext: Vec<u8>,
}

/// Wrap a content key for a recipient.
///
/// Generates a fresh ephemeral key pair per call, so each envelope has
/// independent forward secrecy and a (shared secret, nonce) pair is never
/// reused.
pub fn wrap_content_key<R: CryptoRng + RngCore>(
    rng: &mut R,
    content_key: &ContentKey,
    recipient: &PublicKey,
) -> Envelope {
    let ephemeral = EphemeralSecret::random(rng);
    let Ok(ephemeral_der) = ephemeral.public_key().to_public_key_der() else {
        unreachable!("a fresh P-256 public key always encodes to SPKI");
    };

    let shared = ephemeral.diffie_hellman(recipient);
    let mut wrap_key = derive_wrap_key(shared.raw_secret_bytes().as_slice());

    let mut nonce = [0u8; NONCE_SIZE];
    rng.fill_bytes(&mut nonce);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&wrap_key));
    let Ok(ciphertext) = cipher.encrypt(Nonce::from_slice(&nonce), content_key.as_bytes().as_slice())
    else {
        unreachable!("AES-256-GCM encryption cannot fail with valid inputs");
    };
    wrap_key.zeroize();

    Envelope { ephemeral_public_key: ephemeral_der.as_bytes().to_vec(), nonce, ciphertext }
}

/// Unwrap an envelope addressed to the holder of `recipient_secret`.
///
/// # Errors
///
/// - [`CryptoError::InvalidPublicKey`] if the ephemeral key does not parse
/// - [`CryptoError::Integrity`] if the authentication tag does not verify
///   (tampered ciphertext, wrong key, or corrupted transport)
/// - [`CryptoError::InvalidKeyLength`] if the sealed key is not 32 bytes
pub fn unwrap_content_key(
    envelope: &Envelope,
    recipient_secret: &SecretKey,
) -> Result<ContentKey, CryptoError> {
    let ephemeral = PublicKey::from_public_key_der(&envelope.ephemeral_public_key)
        .map_err(|_| CryptoError::InvalidPublicKey)?;

    let shared = ecdh::diffie_hellman(recipient_secret.to_nonzero_scalar(), ephemeral.as_affine());
    let mut wrap_key = derive_wrap_key(shared.raw_secret_bytes().as_slice());

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&wrap_key));
    let result = cipher.decrypt(Nonce::from_slice(&envelope.nonce), envelope.ciphertext.as_slice());
    wrap_key.zeroize();

    let mut key_bytes =
        result.map_err(|_| CryptoError::Integrity { context: "content key envelope" })?;
    let content_key = ContentKey::from_bytes(&key_bytes);
    key_bytes.zeroize();
    content_key
}

/// Derive the AES-256 wrap key from an ECDH shared secret.
fn derive_wrap_key(shared_secret: &[u8]) -> [u8; CONTENT_KEY_SIZE] {
    let hkdf = Hkdf::<Sha256>::new(None, shared_secret);
    let mut key = [0u8; CONTENT_KEY_SIZE];
    let Ok(()) = hkdf.expand(ENVELOPE_CONTEXT, &mut key) else {
        unreachable!("32 bytes is a valid HKDF-SHA256 output length");
    };
    key
}
