//! Direct (1:1) message protocol.
//!
//! Each message gets a fresh content key, wrapped twice: once for the
//! recipient and once for the sender's own key, so the sender can re-read
//! their outgoing history without keeping plaintext around. Both envelopes
//! seal the identical key; the transcript contains no plaintext and no
//! reusable key material.

use cachet_crypto::{
    ContentKey, CryptoError, EncryptedPayload, Envelope, PublicKey, SecretKey, decrypt_message,
    encrypt_message, unwrap_content_key, wrap_content_key,
};
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

/// Which party's envelope to open a direct message with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    /// The account that sealed the message.
    Sender,
    /// The account the message was addressed to.
    Recipient,
}

/// A sealed 1:1 message: one encrypted payload plus the per-message key
/// wrapped for each party.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectMessage {
    /// The message body, encrypted under the per-message content key.
    pub payload: EncryptedPayload,
    /// The content key, wrapped for the recipient.
    pub recipient_envelope: Envelope,
    /// The content key, wrapped for the sender's own key.
    pub sender_envelope: Envelope,
}

/// Seal a plaintext for a recipient, keeping a sender-readable copy.
pub fn seal_direct_message<R: CryptoRng + RngCore>(
    rng: &mut R,
    plaintext: &str,
    recipient: &PublicKey,
    sender: &PublicKey,
) -> DirectMessage {
    let key = ContentKey::generate(rng);
    let payload = encrypt_message(rng, plaintext, &key);
    let recipient_envelope = wrap_content_key(rng, &key, recipient);
    let sender_envelope = wrap_content_key(rng, &key, sender);
    DirectMessage { payload, recipient_envelope, sender_envelope }
}

/// Open a direct message with the given party's private key.
///
/// # Errors
///
/// Propagates [`CryptoError::Integrity`] from the envelope or the payload
/// when the message was tampered with or the wrong key is used.
pub fn open_direct_message(
    message: &DirectMessage,
    secret: &SecretKey,
    party: Party,
) -> Result<String, CryptoError> {
    let envelope = match party {
        Party::Sender => &message.sender_envelope,
        Party::Recipient => &message.recipient_envelope,
    };
    let key = unwrap_content_key(envelope, secret)?;
    decrypt_message(&message.payload, &key)
}
