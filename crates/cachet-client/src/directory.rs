//! Remote key directory and group key service seams.
//!
//! The backend is trusted for availability and routing only, never for
//! confidentiality: everything that crosses these traits is either a public
//! key, a password-sealed backup, or an envelope only the addressee can
//! open. Implementations own the transport; the session owns retry policy.

use std::collections::HashMap;

use async_trait::async_trait;
use cachet_crypto::{Envelope, PasswordBackup, PublicKeyBlob};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{GroupId, UserId};

/// Errors from directory and group-service calls.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The request did not complete (network failure, timeout).
    #[error("directory transport failed: {reason}")]
    Transport {
        /// Transport-level failure description.
        reason: String,
    },

    /// The directory understood the request and refused it.
    #[error("directory rejected request: {reason}")]
    Rejected {
        /// Why the directory said no.
        reason: String,
    },
}

impl DirectoryError {
    /// Whether the same request might succeed if retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

/// One member's copy of a group key as delivered by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupKeyDelivery {
    /// Monotonically increasing key version within the group.
    pub version: u64,
    /// The group content key, wrapped for this member.
    pub envelope: Envelope,
}

/// Remote directory of account public keys and password backups.
///
/// A missing entry is `Ok(None)`; [`DirectoryError`] is reserved for calls
/// that failed rather than found nothing.
#[async_trait]
pub trait KeyDirectory: Send + Sync + 'static {
    /// Look up an account's current public key.
    async fn fetch_public_key(&self, user: UserId)
    -> Result<Option<PublicKeyBlob>, DirectoryError>;

    /// Publish a new account's public key and password-sealed backup.
    async fn register_public_key(
        &self,
        user: UserId,
        public_key: PublicKeyBlob,
        backup: PasswordBackup,
    ) -> Result<(), DirectoryError>;

    /// Replace an account's public key and backup after a re-key.
    async fn rotate_public_key(
        &self,
        user: UserId,
        public_key: PublicKeyBlob,
        backup: PasswordBackup,
    ) -> Result<(), DirectoryError>;

    /// Fetch an account's password-sealed private key backup.
    async fn fetch_backup(&self, user: UserId) -> Result<Option<PasswordBackup>, DirectoryError>;
}

/// Remote storage for per-member group key envelopes.
#[async_trait]
pub trait GroupKeyService: Send + Sync + 'static {
    /// Fetch the latest group key envelope addressed to a member.
    async fn fetch_group_envelope(
        &self,
        group: GroupId,
        member: UserId,
    ) -> Result<Option<GroupKeyDelivery>, DirectoryError>;

    /// Publish a new key version's envelopes, one per reachable member.
    async fn publish_rotation(
        &self,
        group: GroupId,
        version: u64,
        envelopes: &HashMap<UserId, Envelope>,
    ) -> Result<(), DirectoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_failures_are_transient() {
        let err = DirectoryError::Transport { reason: "connection reset".into() };
        assert!(err.is_transient());
    }

    #[test]
    fn rejections_are_not_transient() {
        let err = DirectoryError::Rejected { reason: "unknown account".into() };
        assert!(!err.is_transient());
        assert_eq!(err.to_string(), "directory rejected request: unknown account");
    }
}
