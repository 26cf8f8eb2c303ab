// ============================================
// File: crates/fleetmock-common/src/types.rs
// ============================================
//! # Core Type Definitions
//!
//! ## Creation Reason
//! Centralizes the identifiers shared by the protocol responder, the log
//! normalizer and the storage sinks, so each layer agrees on their
//! representation.
//!
//! ## Main Functionality
//! - `NodeKey`: Shared secret every gated request must echo back
//! - `RecordId`: Synthetic identifier attached to each normalized record
//!
//! ## ⚠️ Important Note for Next Developer
//! - `NodeKey` is zeroized on drop (manual `Drop`, zeroize 1.3 has no derive)
//! - `NodeKey` Debug output is redacted, use `as_str()` when the raw value
//!   must go on the wire (enroll response)
//! - `RecordId` must come from a CSPRNG, records from concurrent submissions
//!   share one collection
//!
//! ## Last Modified
//! v0.1.0 - Initial identifier types

use std::fmt;
use std::str::FromStr;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::error::CommonError;

// ============================================
// Constants
// ============================================

/// Node key used when none is configured.
pub const DEFAULT_NODE_KEY: &str = "mock-node-key";

/// Size of a `RecordId` in bytes.
pub const RECORD_ID_SIZE: usize = 16;

// ============================================
// NodeKey
// ============================================

/// Shared-secret node identifier.
///
/// The server knows exactly one key for its whole lifetime. Enrollment
/// hands it out, every other endpoint compares the claimed key against it
/// with exact string equality.
///
/// # Example
/// ```
/// use fleetmock_common::types::NodeKey;
///
/// let key = NodeKey::new("abc");
/// assert!(key.matches("abc"));
/// assert!(!key.matches("ABC"));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct NodeKey(String);

impl Drop for NodeKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl NodeKey {
    /// Creates a node key from any string-like value.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns `true` if `claimed` is exactly this key.
    #[must_use]
    pub fn matches(&self, claimed: &str) -> bool {
        self.0 == claimed
    }

    /// Returns the raw key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the key is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for NodeKey {
    fn default() -> Self {
        Self::new(DEFAULT_NODE_KEY)
    }
}

impl fmt::Debug for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeKey(<{} chars>)", self.0.chars().count())
    }
}

impl Serialize for NodeKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for NodeKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Self)
    }
}

// ============================================
// RecordId
// ============================================

/// Synthetic unique identifier of a normalized log record.
///
/// # Wire Format
/// 16 random bytes, rendered as 32 lowercase hex characters.
///
/// # Example
/// ```
/// use fleetmock_common::types::RecordId;
///
/// let id = RecordId::generate();
/// let restored: RecordId = id.to_string().parse().unwrap();
/// assert_eq!(id, restored);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId([u8; RECORD_ID_SIZE]);

impl RecordId {
    /// Generates a new random record id.
    #[must_use]
    pub fn generate() -> Self {
        let mut id = [0u8; RECORD_ID_SIZE];
        rand::thread_rng().fill_bytes(&mut id);
        Self(id)
    }

    /// Creates a record id from raw bytes.
    ///
    /// Returns `None` unless exactly 16 bytes are given.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let id: [u8; RECORD_ID_SIZE] = bytes.try_into().ok()?;
        Some(Self(id))
    }

    /// Returns the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; RECORD_ID_SIZE] {
        &self.0
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", hex::encode(self.0))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for RecordId {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        Self::from_bytes(&bytes)
            .ok_or_else(|| CommonError::invalid_length(RECORD_ID_SIZE, bytes.len()))
    }
}

impl Serialize for RecordId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_node_key_exact_match() {
        let key = NodeKey::new("abc");
        assert!(key.matches("abc"));
        assert!(!key.matches("abc "));
        assert!(!key.matches("xyz"));
        assert!(!key.matches(""));
    }

    #[test]
    fn test_node_key_default() {
        assert_eq!(NodeKey::default().as_str(), DEFAULT_NODE_KEY);
    }

    #[test]
    fn test_node_key_debug_redacted() {
        let key = NodeKey::new("super-secret");
        let debug = format!("{:?}", key);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("12 chars"));
    }

    #[test]
    fn test_node_key_serde_as_string() {
        let key: NodeKey = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(key.as_str(), "abc");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"abc\"");
    }

    #[test]
    fn test_record_id_unique() {
        let ids: HashSet<RecordId> = (0..1000).map(|_| RecordId::generate()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_record_id_display_is_hex() {
        let id = RecordId::generate();
        let text = id.to_string();
        assert_eq!(text.len(), RECORD_ID_SIZE * 2);
        assert!(text.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_record_id_from_str_rejects_bad_input() {
        assert!("zz".parse::<RecordId>().is_err());
        assert!("abcd".parse::<RecordId>().is_err());
    }

    #[test]
    fn test_record_id_serde() {
        let id = RecordId::generate();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
        let restored: RecordId = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, id);
    }
}
