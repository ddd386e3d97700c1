#![allow(dead_code)]

//! Shared test doubles: an in-memory directory and a seeded environment.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use cachet_client::{
    DirectoryError, Environment, GroupId, GroupKeyDelivery, GroupKeyService, KeyDirectory, UserId,
};
use cachet_crypto::{Envelope, PasswordBackup, PublicKeyBlob};
use rand_chacha::ChaCha20Rng;
use rand_core::{RngCore, SeedableRng};

#[derive(Default)]
struct DirectoryState {
    keys: HashMap<UserId, PublicKeyBlob>,
    backups: HashMap<UserId, PasswordBackup>,
    group_keys: HashMap<(GroupId, UserId), GroupKeyDelivery>,
    fail_next: u32,
}

/// In-memory stand-in for the backend directory and group key service.
///
/// `fail_next_requests` injects transient transport failures into the next
/// N calls, for exercising the retry-once policy.
#[derive(Clone, Default)]
pub struct MockDirectory {
    state: Arc<Mutex<DirectoryState>>,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_requests(&self, count: u32) {
        self.lock().fail_next = count;
    }

    pub fn public_key_of(&self, user: UserId) -> Option<PublicKeyBlob> {
        self.lock().keys.get(&user).cloned()
    }

    pub fn backup_of(&self, user: UserId) -> Option<PasswordBackup> {
        self.lock().backups.get(&user).cloned()
    }

    pub fn delivery_for(&self, group: GroupId, member: UserId) -> Option<GroupKeyDelivery> {
        self.lock().group_keys.get(&(group, member)).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, DirectoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check_failure(&self) -> Result<(), DirectoryError> {
        let mut state = self.lock();
        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(DirectoryError::Transport { reason: "injected failure".into() });
        }
        Ok(())
    }
}

#[async_trait]
impl KeyDirectory for MockDirectory {
    async fn fetch_public_key(
        &self,
        user: UserId,
    ) -> Result<Option<PublicKeyBlob>, DirectoryError> {
        self.check_failure()?;
        Ok(self.lock().keys.get(&user).cloned())
    }

    async fn register_public_key(
        &self,
        user: UserId,
        public_key: PublicKeyBlob,
        backup: PasswordBackup,
    ) -> Result<(), DirectoryError> {
        self.check_failure()?;
        let mut state = self.lock();
        if state.keys.contains_key(&user) {
            return Err(DirectoryError::Rejected { reason: format!("user {user} already registered") });
        }
        state.keys.insert(user, public_key);
        state.backups.insert(user, backup);
        Ok(())
    }

    async fn rotate_public_key(
        &self,
        user: UserId,
        public_key: PublicKeyBlob,
        backup: PasswordBackup,
    ) -> Result<(), DirectoryError> {
        self.check_failure()?;
        let mut state = self.lock();
        state.keys.insert(user, public_key);
        state.backups.insert(user, backup);
        Ok(())
    }

    async fn fetch_backup(&self, user: UserId) -> Result<Option<PasswordBackup>, DirectoryError> {
        self.check_failure()?;
        Ok(self.lock().backups.get(&user).cloned())
    }
}

#[async_trait]
impl GroupKeyService for MockDirectory {
    async fn fetch_group_envelope(
        &self,
        group: GroupId,
        member: UserId,
    ) -> Result<Option<GroupKeyDelivery>, DirectoryError> {
        self.check_failure()?;
        Ok(self.lock().group_keys.get(&(group, member)).cloned())
    }

    async fn publish_rotation(
        &self,
        group: GroupId,
        version: u64,
        envelopes: &HashMap<UserId, Envelope>,
    ) -> Result<(), DirectoryError> {
        self.check_failure()?;
        let mut state = self.lock();
        for (member, envelope) in envelopes {
            state
                .group_keys
                .insert((group, *member), GroupKeyDelivery { version, envelope: envelope.clone() });
        }
        Ok(())
    }
}

/// Deterministic [`Environment`] backed by a seeded ChaCha20 stream.
#[derive(Clone)]
pub struct SeededEnv {
    rng: Arc<Mutex<ChaCha20Rng>>,
}

impl SeededEnv {
    pub fn new(seed: u64) -> Self {
        Self { rng: Arc::new(Mutex::new(ChaCha20Rng::seed_from_u64(seed))) }
    }
}

impl Environment for SeededEnv {
    fn random_bytes(&self, buffer: &mut [u8]) {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner).fill_bytes(buffer);
    }
}
