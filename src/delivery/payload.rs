//! Payload model consumed by the delivery engine.

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use serde::{Deserialize, Serialize};

use crate::transport::FreshnessToken;

/// A signed write operation ready for broadcast.
///
/// Tokens may only be attached before signing. Attaching one to an already
/// signed payload does not re-sign it; callers that refresh a token on a
/// pre-signed payload own the consequences.
pub trait Payload: Send {
    /// Wire bytes to broadcast.
    fn serialize(&self) -> Vec<u8>;

    /// Whether this payload must carry a freshness token to be accepted.
    fn requires_freshness(&self) -> bool;

    fn freshness_token(&self) -> Option<&FreshnessToken>;

    fn attach_freshness(&mut self, token: FreshnessToken);
}

/// Pre-signed transaction bytes.
///
/// Durable-nonce transactions carry their own nonce and never need a recent
/// blockhash; everything else does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTransaction {
    #[serde(with = "base64_bytes", rename = "transaction")]
    pub bytes: Vec<u8>,
    #[serde(default)]
    pub durable_nonce: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freshness: Option<FreshnessToken>,
}

impl RawTransaction {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            durable_nonce: false,
            freshness: None,
        }
    }

    pub fn with_durable_nonce(mut self) -> Self {
        self.durable_nonce = true;
        self
    }
}

impl Payload for RawTransaction {
    fn serialize(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    fn requires_freshness(&self) -> bool {
        !self.durable_nonce
    }

    fn freshness_token(&self) -> Option<&FreshnessToken> {
        self.freshness.as_ref()
    }

    fn attach_freshness(&mut self, token: FreshnessToken) {
        self.freshness = Some(token);
    }
}

mod base64_bytes {
    use super::BASE64_STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64_STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        BASE64_STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
