//! Cachet Cryptographic Primitives
//!
//! Cryptographic building blocks for the Cachet messaging client. Pure
//! functions with no IO; callers provide randomness through
//! [`rand_core`] traits, which keeps every primitive deterministically
//! testable and lets the same protocol logic run against a software or a
//! hardware-backed entropy source.
//!
//! # Key Lifecycle
//!
//! Every message is protected by a fresh symmetric content key, which is
//! itself wrapped asymmetrically for each recipient:
//!
//! ```text
//! P-256 Key Pair (per account, long-lived)
//!        │
//!        ▼
//! ECDH (fresh ephemeral pair per wrap) → HKDF-SHA256 → wrap key
//!        │
//!        ▼
//! AES-256-GCM over ContentKey → Envelope (one per recipient)
//!
//! ContentKey (fresh per message / per group key version)
//!        │
//!        ▼
//! AES-256-GCM over plaintext → EncryptedPayload
//! ```
//!
//! The account private key can additionally be escrowed server-side under a
//! password-derived key ([`backup_private_key`] / [`recover_private_key`]),
//! which is the only path by which key material moves between devices.
//!
//! # Security
//!
//! - A fresh ephemeral key pair per [`wrap_content_key`] call gives every
//!   envelope independent forward secrecy at the wrap layer and rules out
//!   (shared secret, nonce) reuse.
//! - All AEAD nonces are sampled fresh from the caller's RNG on every call.
//! - Content keys, derived wrap keys, and private-key blobs are zeroized on
//!   drop.
//! - Authentication failures surface as [`CryptoError::Integrity`] (or
//!   [`CryptoError::Recovery`] on the password path) and never as garbage
//!   plaintext.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod b64;
pub mod content_key;
pub mod envelope;
pub mod error;
pub mod keys;
pub mod password;
pub mod payload;

pub use content_key::{CONTENT_KEY_SIZE, ContentKey};
pub use envelope::{Envelope, unwrap_content_key, wrap_content_key};
pub use error::CryptoError;
pub use keys::{KeyPair, PrivateKeyBlob, PublicKeyBlob};
// Re-exported so protocol crates share one curve implementation.
pub use p256::{PublicKey, SecretKey};
pub use password::{
    PBKDF2_ITERATIONS, PasswordBackup, SALT_SIZE, backup_private_key, recover_private_key,
};
pub use payload::{EncryptedPayload, decrypt_message, encrypt_message};

/// AEAD nonce size in bytes (96-bit, AES-256-GCM).
pub const NONCE_SIZE: usize = 12;
