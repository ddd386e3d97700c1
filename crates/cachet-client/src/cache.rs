//! Per-session decryption cache.
//!
//! Decrypting a message costs an ECDH plus two AEAD passes; re-rendering a
//! conversation should not repeat that work. The cache maps message IDs to
//! already-decrypted plaintext and lives exactly as long as the session.
//! Nothing here is ever persisted.

use std::collections::HashMap;

use crate::MessageId;

/// Session-scoped plaintext cache.
///
/// Put-once semantics: a message's plaintext never changes under the same
/// ID, so later puts for a cached ID are ignored. Edits arrive as new
/// ciphertext for the same ID and go through [`DecryptionCache::invalidate`]
/// first.
#[derive(Debug, Default)]
pub struct DecryptionCache {
    entries: HashMap<MessageId, String>,
}

impl DecryptionCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached plaintext for a message, if present.
    pub fn get(&self, id: MessageId) -> Option<&str> {
        self.entries.get(&id).map(String::as_str)
    }

    /// Store decrypted plaintext. Ignored if the ID is already cached.
    pub fn put(&mut self, id: MessageId, plaintext: String) -> &str {
        self.entries.entry(id).or_insert(plaintext)
    }

    /// Drop a cached entry, forcing the next read to decrypt fresh.
    pub fn invalidate(&mut self, id: MessageId) {
        self.entries.remove(&id);
    }

    /// Number of cached messages.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
