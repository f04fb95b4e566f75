//! Wire envelope for enriched messages
//!
//! The body is the compact JSON encoding of an [`EnrichedMessage`]. Struct
//! fields serialize in declaration order, so equal messages always produce
//! byte-identical bodies and therefore equal digests.

use crate::domain::{EnrichedMessage, GroupKey, HarvestError, Result};
use sha2::{Digest, Sha256};

/// Message ready to hand to a publisher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    body: String,
    group_key: GroupKey,
    digest: String,
}

impl OutboundMessage {
    /// Encode `message` for the lane `group_key`
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the message cannot be encoded.
    pub fn encode(message: &EnrichedMessage, group_key: GroupKey) -> Result<Self> {
        let body = serde_json::to_string(message)
            .map_err(|e| HarvestError::Serialization(format!("Failed to encode message: {e}")))?;
        let digest = content_digest(body.as_bytes());

        Ok(Self {
            body,
            group_key,
            digest,
        })
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn group_key(&self) -> &GroupKey {
        &self.group_key
    }

    /// Hex SHA-256 of the body, usable as a deduplication id
    pub fn digest(&self) -> &str {
        &self.digest
    }
}

/// Hex-encoded SHA-256 of raw bytes (64 characters)
///
/// # Examples
///
/// ```
/// use harvester::core::publish::content_digest;
///
/// let digest = content_digest(b"{}");
/// assert_eq!(digest.len(), 64);
/// ```
pub fn content_digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    format!("{result:x}")
}
