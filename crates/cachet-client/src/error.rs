//! Session-level errors.

use cachet_crypto::CryptoError;
use thiserror::Error;

use crate::{GroupId, directory::DirectoryError, key_store::KeyStoreError};

/// Errors surfaced by [`crate::CryptoSession`] operations.
///
/// Absence of optional material (no backup on file, no cached message) is
/// modeled as `Option`, not as an error. These variants cover genuine
/// failures only.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A cryptographic operation failed (integrity, recovery, malformed
    /// key material).
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Required key material could not be obtained, even after retrying.
    ///
    /// Covers missing directory entries, exhausted transient-failure
    /// retries, and group key versions this session never learned.
    #[error("key unavailable: {what}")]
    KeyUnavailable {
        /// What was being looked up.
        what: String,
    },

    /// The directory rejected a request outright.
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// Local key storage failed.
    #[error(transparent)]
    Store(#[from] KeyStoreError),

    /// A group operation was attempted without holding that group's key.
    #[error("not a member of group {group}")]
    NotAMember {
        /// The group in question.
        group: GroupId,
    },
}

impl SessionError {
    /// Whether the caller can reasonably retry after refreshed state.
    ///
    /// Key-unavailable conditions clear up once the directory converges or
    /// a rotation arrives; crypto failures and rejections do not.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::KeyUnavailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_unavailable_is_recoverable() {
        let err = SessionError::KeyUnavailable { what: "public key for user 7".into() };
        assert!(err.is_recoverable());
        assert_eq!(err.to_string(), "key unavailable: public key for user 7");
    }

    #[test]
    fn crypto_errors_are_not_recoverable() {
        let err = SessionError::from(CryptoError::Recovery);
        assert!(!err.is_recoverable());
    }

    #[test]
    fn not_a_member_names_the_group() {
        let err = SessionError::NotAMember { group: 42 };
        assert_eq!(err.to_string(), "not a member of group 42");
    }
}
