//! Client-side session and protocol layer for Cachet.
//!
//! Builds the messaging protocols on top of [`cachet_crypto`]: direct (1:1)
//! messages with dual envelopes, versioned group keys with rotation, the
//! login ladder (load local keys, recover from a password backup, or
//! register fresh), and a per-session decryption cache.
//!
//! ```text
//!                 +-----------------+
//!                 |  CryptoSession  |
//!                 +--------+--------+
//!                          |
//!         +----------------+----------------+
//!         |                |                |
//!   +-----v-----+    +-----v-----+    +-----v------+
//!   | KeyStore  |    | Directory |    | Decryption |
//!   | (local)   |    | (remote)  |    |   cache    |
//!   +-----------+    +-----------+    +------------+
//! ```
//!
//! All network and storage access goes through traits ([`KeyDirectory`],
//! [`GroupKeyService`], [`KeyStore`]); the session itself never performs
//! I/O directly and never inspects plaintext beyond handing it back to the
//! caller.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod cache;
pub mod direct;
pub mod directory;
pub mod env;
pub mod error;
pub mod group;
pub mod key_store;
pub mod session;

pub use cache::DecryptionCache;
pub use direct::{DirectMessage, Party, open_direct_message, seal_direct_message};
pub use directory::{DirectoryError, GroupKeyDelivery, GroupKeyService, KeyDirectory};
pub use env::{Environment, OsEnvironment};
pub use error::SessionError;
pub use group::{
    GroupKeyRecord, GroupPayload, GroupRotation, decrypt_group_message, encrypt_group_message,
    issue_group_key,
};
pub use key_store::{KeyStore, KeyStoreError, MemoryKeyStore, StoredKeyPair};
pub use session::{CryptoSession, LoginOutcome};

/// Account identifier, assigned by the backend.
pub type UserId = u64;

/// Group conversation identifier.
pub type GroupId = u64;

/// Message identifier, unique per conversation.
pub type MessageId = u64;
