//! Local persistence for account key pairs.
//!
//! The store holds serialized key blobs as opaque strings; it never parses
//! or interprets key material. Production implementations wrap whatever the
//! platform offers (keychain, encrypted file); [`MemoryKeyStore`] backs
//! tests and ephemeral sessions.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use cachet_crypto::{PrivateKeyBlob, PublicKeyBlob};
use thiserror::Error;

use crate::UserId;

/// Errors from local key storage.
#[derive(Debug, Error)]
pub enum KeyStoreError {
    /// The backing store failed to read or write.
    #[error("key store I/O failed: {reason}")]
    Io {
        /// Platform-specific failure description.
        reason: String,
    },
}

/// A key pair in its at-rest form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredKeyPair {
    /// Base64 SPKI public key.
    pub public: PublicKeyBlob,
    /// Base64 PKCS#8 private key.
    pub private: PrivateKeyBlob,
}

/// Durable storage for this device's key pair.
///
/// A missing entry is `Ok(None)`, not an error; the login ladder treats it
/// as "try recovery next".
pub trait KeyStore: Clone + Send + Sync + 'static {
    /// Persist a key pair for an account, replacing any previous one.
    fn persist(&self, user: UserId, pair: StoredKeyPair) -> Result<(), KeyStoreError>;

    /// Load the stored key pair for an account.
    fn load(&self, user: UserId) -> Result<Option<StoredKeyPair>, KeyStoreError>;

    /// Remove the stored key pair for an account.
    fn remove(&self, user: UserId) -> Result<(), KeyStoreError>;
}

/// In-memory [`KeyStore`] for tests and ephemeral sessions.
#[derive(Debug, Clone, Default)]
pub struct MemoryKeyStore {
    entries: Arc<Mutex<HashMap<UserId, StoredKeyPair>>>,
}

impl MemoryKeyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<UserId, StoredKeyPair>> {
        // A poisoned lock only means another thread panicked mid-operation;
        // the map itself is still coherent.
        self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl KeyStore for MemoryKeyStore {
    fn persist(&self, user: UserId, pair: StoredKeyPair) -> Result<(), KeyStoreError> {
        self.lock().insert(user, pair);
        Ok(())
    }

    fn load(&self, user: UserId) -> Result<Option<StoredKeyPair>, KeyStoreError> {
        Ok(self.lock().get(&user).cloned())
    }

    fn remove(&self, user: UserId) -> Result<(), KeyStoreError> {
        self.lock().remove(&user);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pair(tag: &str) -> StoredKeyPair {
        StoredKeyPair {
            public: PublicKeyBlob::new(format!("pub-{tag}")),
            private: PrivateKeyBlob::new(format!("priv-{tag}")),
        }
    }

    #[test]
    fn persist_then_load_roundtrips() {
        let store = MemoryKeyStore::new();
        store.persist(1, sample_pair("a")).unwrap();
        assert_eq!(store.load(1).unwrap(), Some(sample_pair("a")));
    }

    #[test]
    fn missing_entry_is_none_not_error() {
        let store = MemoryKeyStore::new();
        assert_eq!(store.load(99).unwrap(), None);
    }

    #[test]
    fn persist_replaces_previous_pair() {
        let store = MemoryKeyStore::new();
        store.persist(1, sample_pair("old")).unwrap();
        store.persist(1, sample_pair("new")).unwrap();
        assert_eq!(store.load(1).unwrap(), Some(sample_pair("new")));
    }

    #[test]
    fn remove_clears_the_entry() {
        let store = MemoryKeyStore::new();
        store.persist(1, sample_pair("a")).unwrap();
        store.remove(1).unwrap();
        assert_eq!(store.load(1).unwrap(), None);
    }

    #[test]
    fn clones_share_the_same_backing_map() {
        let store = MemoryKeyStore::new();
        let clone = store.clone();
        store.persist(1, sample_pair("shared")).unwrap();
        assert_eq!(clone.load(1).unwrap(), Some(sample_pair("shared")));
    }
}
