// ============================================
// File: crates/fleetmock-server/src/services/gate.rs
// ============================================
//! # Node Key Gate
//!
//! ## Creation Reason
//! Every endpoint except enrollment only answers agents that present the
//! node key handed out at enrollment.
//!
//! ## Main Functionality
//! - `NodeKeyGate::check()`: Accepts or rejects a request body
//! - `NodeKeyGate::node_key()`: Key returned on enrollment
//!
//! ## ⚠️ Important Note for Next Developer
//! - Comparison is exact: no trimming, no case folding
//! - A missing or non-string `node_key` is a mismatch
//! - Never log the claimed key on rejection
//!
//! ## Last Modified
//! v0.1.0 - Initial gate implementation

use serde_json::Value;

use fleetmock_common::types::NodeKey;
use fleetmock_core::protocol::claimed_node_key;

use crate::error::{Result, ServerError};

/// Shared-secret gate in front of the gated endpoints.
#[derive(Debug, Clone)]
pub struct NodeKeyGate {
    key: NodeKey,
}

impl NodeKeyGate {
    /// Creates a gate accepting `key`.
    #[must_use]
    pub const fn new(key: NodeKey) -> Self {
        Self { key }
    }

    /// Returns the key handed out on enrollment.
    #[must_use]
    pub fn node_key(&self) -> &str {
        self.key.as_str()
    }

    /// Checks the `node_key` field of a request body.
    ///
    /// # Errors
    /// Returns `Unauthorized` if the field is missing or does not match.
    pub fn check(&self, body: &Value) -> Result<()> {
        self.check_claimed(claimed_node_key(body))
    }

    /// Checks an already extracted claimed key.
    ///
    /// # Errors
    /// Returns `Unauthorized` if `claimed` is `None` or does not match.
    pub fn check_claimed(&self, claimed: Option<&str>) -> Result<()> {
        match claimed {
            Some(claimed) if self.key.matches(claimed) => Ok(()),
            _ => Err(ServerError::Unauthorized),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn gate() -> NodeKeyGate {
        NodeKeyGate::new(NodeKey::new("abc"))
    }

    #[test]
    fn test_matching_key_accepted() {
        assert!(gate().check(&json!({"node_key": "abc"})).is_ok());
    }

    #[test]
    fn test_mismatch_rejected() {
        let gate = gate();
        for body in [
            json!({"node_key": "xyz"}),
            json!({"node_key": "ABC"}),
            json!({"node_key": " abc"}),
            json!({"node_key": 42}),
            json!({}),
            json!([]),
        ] {
            let err = gate.check(&body).unwrap_err();
            assert!(matches!(err, ServerError::Unauthorized), "{body}");
        }
    }

    #[test]
    fn test_node_key_exposed_for_enrollment() {
        assert_eq!(gate().node_key(), "abc");
    }
}
