//! Base64 field encoding for wire types.
//!
//! All binary fields (ciphertext, nonces, ephemeral keys, salts) cross the
//! client/server boundary base64-encoded. These helpers plug into serde via
//! `#[serde(with = "crate::b64")]` for variable-length fields and
//! `#[serde(with = "crate::b64::array")]` for fixed-size ones.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Deserializer, Serializer};

pub(crate) fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(bytes))
}

pub(crate) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let encoded = String::deserialize(deserializer)?;
    STANDARD.decode(&encoded).map_err(serde::de::Error::custom)
}

pub(crate) mod array {
    use serde::Deserializer;

    pub(crate) use super::serialize;

    pub(crate) fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        deserializer: D,
    ) -> Result<[u8; N], D::Error> {
        let bytes = super::deserialize(deserializer)?;
        let len = bytes.len();
        <[u8; N]>::try_from(bytes)
            .map_err(|_| serde::de::Error::custom(format!("expected {N} bytes, got {len}")))
    }
}
