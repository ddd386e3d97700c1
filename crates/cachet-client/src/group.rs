//! Group message protocol with versioned keys.
//!
//! A group shares one content key per key version. Rotation issues a fresh
//! key under `version + 1` and wraps it once per member; messages carry the
//! version they were encrypted under, so history encrypted under older
//! versions stays readable while members who joined after a rotation cannot
//! open anything sealed before it.

use std::collections::{BTreeMap, HashMap};

use cachet_crypto::{
    ContentKey, CryptoError, EncryptedPayload, Envelope, PublicKey, decrypt_message,
    encrypt_message, wrap_content_key,
};
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::UserId;

/// All key versions of one group known to this session.
///
/// Versions accumulate; old ones are kept for decrypting history and are
/// only discarded with the session itself.
#[derive(Debug, Default)]
pub struct GroupKeyRecord {
    versions: BTreeMap<u64, ContentKey>,
}

impl GroupKeyRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Learn a key version. Re-inserting a known version is ignored; a key
    /// version's material never changes once issued.
    pub fn insert(&mut self, version: u64, key: ContentKey) {
        self.versions.entry(version).or_insert(key);
    }

    /// The newest known version and its key, used for sending.
    pub fn current(&self) -> Option<(u64, &ContentKey)> {
        self.versions.last_key_value().map(|(v, k)| (*v, k))
    }

    /// The newest known version number.
    pub fn current_version(&self) -> Option<u64> {
        self.versions.last_key_value().map(|(v, _)| *v)
    }

    /// The key for a specific version, used for reading history.
    pub fn key_for(&self, version: u64) -> Option<&ContentKey> {
        self.versions.get(&version)
    }

    /// Number of versions this session has learned.
    pub fn version_count(&self) -> usize {
        self.versions.len()
    }
}

/// A group message body tagged with the key version that sealed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupPayload {
    /// Version of the group key used for this message.
    pub key_version: u64,
    /// The message body, encrypted under that version's key.
    pub payload: EncryptedPayload,
}

/// The output of issuing one group key version.
#[derive(Debug)]
pub struct GroupRotation {
    /// The version being issued.
    pub version: u64,
    /// The freshly generated group key, for the issuer's own record.
    pub content_key: ContentKey,
    /// One envelope per member whose public key was available.
    pub envelopes: HashMap<UserId, Envelope>,
    /// Members skipped because no public key could be resolved. They stay
    /// in the group but cannot read this version until the next rotation.
    pub skipped: Vec<UserId>,
}

/// Generate a group key at `version` and wrap it for every resolvable
/// member.
///
/// Members whose public key is `None` are recorded in
/// [`GroupRotation::skipped`] rather than failing the whole rotation;
/// partial delivery beats no group at all.
pub fn issue_group_key<R: CryptoRng + RngCore>(
    rng: &mut R,
    version: u64,
    members: &[(UserId, Option<PublicKey>)],
) -> GroupRotation {
    let content_key = ContentKey::generate(rng);
    let mut envelopes = HashMap::with_capacity(members.len());
    let mut skipped = Vec::new();

    for (member, public_key) in members {
        match public_key {
            Some(key) => {
                envelopes.insert(*member, wrap_content_key(rng, &content_key, key));
            }
            None => skipped.push(*member),
        }
    }

    GroupRotation { version, content_key, envelopes, skipped }
}

/// Encrypt a message under the group's newest key version.
///
/// Returns `None` when the record holds no versions (the caller is not a
/// member, or has not yet fetched the group key).
pub fn encrypt_group_message<R: CryptoRng + RngCore>(
    rng: &mut R,
    plaintext: &str,
    record: &GroupKeyRecord,
) -> Option<GroupPayload> {
    let (key_version, key) = record.current()?;
    let payload = encrypt_message(rng, plaintext, key);
    Some(GroupPayload { key_version, payload })
}

/// Decrypt a group message with the version it names.
///
/// Returns `Ok(None)` when that version is not in the record (a rotation
/// this session has not learned yet); the caller decides whether to refetch.
///
/// # Errors
///
/// Propagates [`CryptoError::Integrity`] when the version is known but the
/// ciphertext does not verify under it.
pub fn decrypt_group_message(
    message: &GroupPayload,
    record: &GroupKeyRecord,
) -> Result<Option<String>, CryptoError> {
    let Some(key) = record.key_for(message.key_version) else {
        return Ok(None);
    };
    decrypt_message(&message.payload, key).map(Some)
}
