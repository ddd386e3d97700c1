//! Error types for cryptographic operations.

use thiserror::Error;

/// Errors from envelope, payload, key, and backup operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Authentication tag verification failed (tampered ciphertext, wrong
    /// key, or corrupted transport). Always terminal for that decrypt
    /// attempt; never retried with the same inputs.
    #[error("integrity check failed: {context}")]
    Integrity {
        /// Which ciphertext failed authentication.
        context: &'static str,
    },

    /// Password-backup decryption failed. Distinct from [`Self::Integrity`]
    /// so callers can phrase this as "wrong password, or account
    /// re-registered" rather than corruption.
    #[error("key recovery failed: wrong password or superseded backup")]
    Recovery,

    /// Public key blob could not be parsed as a P-256 SPKI document.
    #[error("invalid public key encoding")]
    InvalidPublicKey,

    /// Private key blob could not be parsed as a P-256 PKCS#8 document.
    #[error("invalid private key encoding")]
    InvalidPrivateKey,

    /// Key material had the wrong length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },

    /// A base64 field failed to decode.
    #[error("invalid base64: {0}")]
    Encoding(#[from] base64::DecodeError),
}

impl CryptoError {
    /// Returns true when the failure is expected user-facing behavior
    /// (wrong password) rather than a protocol violation or corruption.
    pub fn is_recovery(&self) -> bool {
        matches!(self, Self::Recovery)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integrity_display_names_context() {
        let err = CryptoError::Integrity { context: "content key envelope" };
        assert_eq!(err.to_string(), "integrity check failed: content key envelope");
    }

    #[test]
    fn recovery_is_distinct_from_integrity() {
        assert!(CryptoError::Recovery.is_recovery());
        assert!(!CryptoError::Integrity { context: "message payload" }.is_recovery());
    }

    #[test]
    fn key_length_display() {
        let err = CryptoError::InvalidKeyLength { expected: 32, actual: 16 };
        assert_eq!(err.to_string(), "invalid key length: expected 32, got 16");
    }
}
