//! The client crypto session.
//!
//! [`CryptoSession`] ties the pieces together: it owns the account key pair,
//! the per-group key records, and the decryption cache, and it brokers all
//! directory access. Directory fetches that fail transiently are retried
//! exactly once; a second transient failure surfaces as
//! [`SessionError::KeyUnavailable`] so callers can distinguish "try again
//! later" from hard protocol failures.

use std::collections::HashMap;

use cachet_crypto::{
    Envelope, KeyPair, PasswordBackup, PublicKey, PublicKeyBlob, backup_private_key,
    recover_private_key, unwrap_content_key,
};
use tracing::{debug, info, warn};

use crate::{
    GroupId, MessageId, UserId,
    cache::DecryptionCache,
    direct::{DirectMessage, Party, open_direct_message, seal_direct_message},
    directory::{GroupKeyDelivery, GroupKeyService, KeyDirectory},
    env::{EnvRng, Environment},
    error::SessionError,
    group::{self, GroupKeyRecord, GroupPayload, issue_group_key},
    key_store::{KeyStore, StoredKeyPair},
};

/// How the session obtained its key pair at login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The key pair was already in local storage.
    Existing,
    /// The key pair was recovered from the password backup on a new device.
    Recovered,
    /// No key material existed anywhere; a fresh pair was registered.
    Registered,
}

/// One logged-in account's cryptographic state.
///
/// Holds the account key pair, every group key version learned during this
/// session, and the plaintext cache. All state is session-scoped: dropping
/// the session drops decrypted material and unwrapped keys.
pub struct CryptoSession<E, S, D> {
    env: E,
    store: S,
    directory: D,
    user_id: UserId,
    key_pair: KeyPair,
    groups: HashMap<GroupId, GroupKeyRecord>,
    cache: DecryptionCache,
}

impl<E, S, D> CryptoSession<E, S, D>
where
    E: Environment,
    S: KeyStore,
    D: KeyDirectory + GroupKeyService,
{
    /// Establish a session, obtaining key material down the ladder: local
    /// store first, then password recovery, then fresh registration.
    ///
    /// # Errors
    ///
    /// Fails with [`cachet_crypto::CryptoError::Recovery`] (wrapped in
    /// [`SessionError::Crypto`]) when a backup exists but the password is
    /// wrong; the caller may re-prompt or fall back to [`Self::rekey`]
    /// after a fresh registration decision.
    pub async fn login(
        env: E,
        store: S,
        directory: D,
        user_id: UserId,
        password: &str,
    ) -> Result<(Self, LoginOutcome), SessionError> {
        if let Some(stored) = store.load(user_id)? {
            let key_pair = KeyPair::from_private_blob(&stored.private)?;
            debug!(user_id, "restored key pair from local store");
            let session = Self::assemble(env, store, directory, user_id, key_pair);
            return Ok((session, LoginOutcome::Existing));
        }

        if let Some(backup) = fetch_backup_with_retry(&directory, user_id).await? {
            let private = recover_private_key(&backup, password)?;
            let key_pair = KeyPair::from_private_blob(&private)?;
            store.persist(user_id, StoredKeyPair { public: key_pair.export_public(), private })?;
            info!(user_id, "recovered key pair from password backup");
            let session = Self::assemble(env, store, directory, user_id, key_pair);
            return Ok((session, LoginOutcome::Recovered));
        }

        let (key_pair, backup) = {
            let mut rng = EnvRng(&env);
            let key_pair = KeyPair::generate(&mut rng);
            let backup = backup_private_key(&mut rng, &key_pair.export_private(), password)?;
            (key_pair, backup)
        };
        directory.register_public_key(user_id, key_pair.export_public(), backup).await?;
        store.persist(
            user_id,
            StoredKeyPair { public: key_pair.export_public(), private: key_pair.export_private() },
        )?;
        info!(user_id, "registered fresh key pair");
        let session = Self::assemble(env, store, directory, user_id, key_pair);
        Ok((session, LoginOutcome::Registered))
    }

    fn assemble(env: E, store: S, directory: D, user_id: UserId, key_pair: KeyPair) -> Self {
        Self {
            env,
            store,
            directory,
            user_id,
            key_pair,
            groups: HashMap::new(),
            cache: DecryptionCache::new(),
        }
    }

    /// The account this session belongs to.
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// This session's public key.
    pub fn public_key(&self) -> &PublicKey {
        self.key_pair.public_key()
    }

    /// The decryption cache, for inspection.
    pub fn cache(&self) -> &DecryptionCache {
        &self.cache
    }

    /// Newest known key version for a group, if any was learned.
    pub fn group_version(&self, group: GroupId) -> Option<u64> {
        self.groups.get(&group).and_then(GroupKeyRecord::current_version)
    }

    /// Replace the account key pair, publish the new public key, and
    /// re-seal the password backup.
    ///
    /// Messages and group envelopes addressed to the old key become
    /// unreadable on other devices; group keys already unwrapped in this
    /// session survive.
    pub async fn rekey(&mut self, password: &str) -> Result<(), SessionError> {
        let (key_pair, backup) = {
            let mut rng = EnvRng(&self.env);
            let key_pair = KeyPair::generate(&mut rng);
            let backup = backup_private_key(&mut rng, &key_pair.export_private(), password)?;
            (key_pair, backup)
        };
        self.directory.rotate_public_key(self.user_id, key_pair.export_public(), backup).await?;
        self.store.persist(
            self.user_id,
            StoredKeyPair { public: key_pair.export_public(), private: key_pair.export_private() },
        )?;
        self.key_pair = key_pair;
        info!(user_id = self.user_id, "rotated account key pair");
        Ok(())
    }

    /// Look up another account's public key, retrying once on transient
    /// failure.
    ///
    /// # Errors
    ///
    /// [`SessionError::KeyUnavailable`] when the directory has no entry or
    /// stayed unreachable through the retry.
    pub async fn fetch_public_key(&self, user: UserId) -> Result<PublicKey, SessionError> {
        let blob = self.fetch_directory_key(user).await?.ok_or_else(|| {
            SessionError::KeyUnavailable { what: format!("public key for user {user}") }
        })?;
        Ok(blob.import()?)
    }

    /// Seal a 1:1 message for a recipient, including the sender-readable
    /// copy.
    pub async fn send_direct_message(
        &self,
        recipient: UserId,
        plaintext: &str,
    ) -> Result<DirectMessage, SessionError> {
        let recipient_key = self.fetch_public_key(recipient).await?;
        let mut rng = EnvRng(&self.env);
        Ok(seal_direct_message(&mut rng, plaintext, &recipient_key, self.key_pair.public_key()))
    }

    /// Open a 1:1 message, serving repeated reads from the cache.
    ///
    /// `party` selects which envelope to open: [`Party::Sender`] for this
    /// session's own outgoing history, [`Party::Recipient`] otherwise.
    pub fn receive_direct_message(
        &mut self,
        id: MessageId,
        message: &DirectMessage,
        party: Party,
    ) -> Result<String, SessionError> {
        if let Some(hit) = self.cache.get(id) {
            return Ok(hit.to_string());
        }
        let plaintext = open_direct_message(message, self.key_pair.secret_key(), party)?;
        Ok(self.cache.put(id, plaintext).to_string())
    }

    /// Note that a message was edited: drop its cached plaintext so the
    /// next read decrypts the replacement ciphertext.
    pub fn apply_edit(&mut self, id: MessageId) {
        self.cache.invalidate(id);
    }

    /// Create a group at key version 1, wrapping the key for every member
    /// whose public key resolves. Returns the members that were skipped.
    ///
    /// Creating a group this session already holds a key for issues the
    /// next version instead, so the issuer's record and the published
    /// envelopes always name the same key.
    pub async fn create_group(
        &mut self,
        group: GroupId,
        members: &[UserId],
    ) -> Result<Vec<UserId>, SessionError> {
        let version = match self.group_version(group) {
            Some(current) => current + 1,
            None => 1,
        };
        self.issue_and_publish(group, version, members).await
    }

    /// Rotate a group's key to the next version (for example after a
    /// member leaves), re-wrapping for the remaining members only.
    pub async fn rotate_group(
        &mut self,
        group: GroupId,
        members: &[UserId],
    ) -> Result<Vec<UserId>, SessionError> {
        let version = match self.group_version(group) {
            Some(current) => current + 1,
            None => match self.fetch_group_delivery(group).await? {
                Some(delivery) => delivery.version + 1,
                None => 1,
            },
        };
        self.issue_and_publish(group, version, members).await
    }

    async fn issue_and_publish(
        &mut self,
        group: GroupId,
        version: u64,
        members: &[UserId],
    ) -> Result<Vec<UserId>, SessionError> {
        let mut resolved = Vec::with_capacity(members.len());
        for &member in members {
            if member == self.user_id {
                resolved.push((member, Some(*self.key_pair.public_key())));
                continue;
            }
            let key = match self.fetch_directory_key(member).await {
                Ok(Some(blob)) => Some(blob.import()?),
                Ok(None) => {
                    warn!(member, group, "no public key on record, skipping member");
                    None
                }
                Err(err) if err.is_recoverable() => {
                    warn!(member, group, error = %err, "key fetch exhausted retries, skipping member");
                    None
                }
                Err(err) => return Err(err),
            };
            resolved.push((member, key));
        }

        let rotation = {
            let mut rng = EnvRng(&self.env);
            issue_group_key(&mut rng, version, &resolved)
        };
        self.directory.publish_rotation(group, version, &rotation.envelopes).await?;
        self.groups.entry(group).or_default().insert(version, rotation.content_key);
        info!(
            group,
            version,
            delivered = rotation.envelopes.len(),
            skipped = rotation.skipped.len(),
            "published group key rotation"
        );
        Ok(rotation.skipped)
    }

    /// Fetch and unwrap this account's current group key envelope.
    ///
    /// Returns the delivered version.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotAMember`] when the service has no envelope for
    /// this account in that group.
    pub async fn sync_group_key(&mut self, group: GroupId) -> Result<u64, SessionError> {
        if self.refresh_group_key(group).await? {
            let Some(version) = self.group_version(group) else {
                unreachable!("refresh just inserted a version");
            };
            Ok(version)
        } else {
            Err(SessionError::NotAMember { group })
        }
    }

    /// Encrypt a message under the group's newest key version.
    ///
    /// Fetches the group key first when this session has not learned any
    /// version yet.
    pub async fn encrypt_group_message(
        &mut self,
        group: GroupId,
        plaintext: &str,
    ) -> Result<GroupPayload, SessionError> {
        if !self.groups.contains_key(&group) && !self.refresh_group_key(group).await? {
            return Err(SessionError::NotAMember { group });
        }
        let Some(record) = self.groups.get(&group) else {
            unreachable!("record was just confirmed or inserted");
        };
        let mut rng = EnvRng(&self.env);
        group::encrypt_group_message(&mut rng, plaintext, record)
            .ok_or(SessionError::NotAMember { group })
    }

    /// Decrypt a group message, serving repeated reads from the cache.
    ///
    /// If the message names a key version this session has not learned, the
    /// group key is refetched once before giving up with
    /// [`SessionError::KeyUnavailable`].
    pub async fn decrypt_group_message(
        &mut self,
        group: GroupId,
        id: MessageId,
        message: &GroupPayload,
    ) -> Result<String, SessionError> {
        if let Some(hit) = self.cache.get(id) {
            return Ok(hit.to_string());
        }
        if !self.groups.contains_key(&group) {
            self.refresh_group_key(group).await?;
        }

        let attempt = match self.groups.get(&group) {
            Some(record) => group::decrypt_group_message(message, record)?,
            None => None,
        };
        let plaintext = match attempt {
            Some(plaintext) => plaintext,
            None => {
                debug!(group, version = message.key_version, "unknown group key version, refetching");
                self.refresh_group_key(group).await?;
                let retried = match self.groups.get(&group) {
                    Some(record) => group::decrypt_group_message(message, record)?,
                    None => None,
                };
                retried.ok_or_else(|| SessionError::KeyUnavailable {
                    what: format!("group {group} key version {}", message.key_version),
                })?
            }
        };
        Ok(self.cache.put(id, plaintext).to_string())
    }

    /// Apply a rotation announcement pushed by the service.
    ///
    /// Returns `true` when the version was new and its key was recorded;
    /// stale announcements (version at or below the newest known) are
    /// ignored and return `false`.
    ///
    /// A push whose envelope does not unwrap changes nothing: the group map
    /// is only touched after the key is validated, so a corrupt push never
    /// shadows the valid envelope still held by the directory.
    pub fn observe_rotation(
        &mut self,
        group: GroupId,
        version: u64,
        envelope: &Envelope,
    ) -> Result<bool, SessionError> {
        let current = self.groups.get(&group).and_then(GroupKeyRecord::current_version);
        if current.is_some_and(|current| version <= current) {
            warn!(group, version, "ignoring stale group key rotation");
            return Ok(false);
        }
        let key = unwrap_content_key(envelope, self.key_pair.secret_key())?;
        self.groups.entry(group).or_default().insert(version, key);
        debug!(group, version, "learned rotated group key");
        Ok(true)
    }

    /// Fetch this account's group envelope and fold it into the record.
    /// Returns whether an envelope existed.
    async fn refresh_group_key(&mut self, group: GroupId) -> Result<bool, SessionError> {
        match self.fetch_group_delivery(group).await? {
            Some(delivery) => {
                let key = unwrap_content_key(&delivery.envelope, self.key_pair.secret_key())?;
                self.groups.entry(group).or_default().insert(delivery.version, key);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn fetch_directory_key(
        &self,
        user: UserId,
    ) -> Result<Option<PublicKeyBlob>, SessionError> {
        match self.directory.fetch_public_key(user).await {
            Ok(found) => Ok(found),
            Err(first) if first.is_transient() => {
                debug!(user, error = %first, "public key fetch failed, retrying once");
                match self.directory.fetch_public_key(user).await {
                    Ok(found) => Ok(found),
                    Err(second) if second.is_transient() => Err(SessionError::KeyUnavailable {
                        what: format!("public key for user {user}"),
                    }),
                    Err(second) => Err(second.into()),
                }
            }
            Err(first) => Err(first.into()),
        }
    }

    async fn fetch_group_delivery(
        &self,
        group: GroupId,
    ) -> Result<Option<GroupKeyDelivery>, SessionError> {
        match self.directory.fetch_group_envelope(group, self.user_id).await {
            Ok(found) => Ok(found),
            Err(first) if first.is_transient() => {
                debug!(group, error = %first, "group key fetch failed, retrying once");
                match self.directory.fetch_group_envelope(group, self.user_id).await {
                    Ok(found) => Ok(found),
                    Err(second) if second.is_transient() => Err(SessionError::KeyUnavailable {
                        what: format!("group {group} key"),
                    }),
                    Err(second) => Err(second.into()),
                }
            }
            Err(first) => Err(first.into()),
        }
    }
}

async fn fetch_backup_with_retry<D: KeyDirectory>(
    directory: &D,
    user: UserId,
) -> Result<Option<PasswordBackup>, SessionError> {
    match directory.fetch_backup(user).await {
        Ok(found) => Ok(found),
        Err(first) if first.is_transient() => {
            debug!(user, error = %first, "backup fetch failed, retrying once");
            match directory.fetch_backup(user).await {
                Ok(found) => Ok(found),
                Err(second) if second.is_transient() => Err(SessionError::KeyUnavailable {
                    what: format!("password backup for user {user}"),
                }),
                Err(second) => Err(second.into()),
            }
        }
        Err(first) => Err(first.into()),
    }
}
