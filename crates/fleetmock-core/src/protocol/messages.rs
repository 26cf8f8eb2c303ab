// ============================================
// File: crates/fleetmock-core/src/protocol/messages.rs
// ============================================
//! # Protocol Messages
//!
//! ## Creation Reason
//! Defines the JSON bodies exchanged between an agent and the remote API
//! responder, shared by the server handlers and the probe client.
//!
//! ## Main Functionality
//! - `Endpoint`: The five request types and their paths
//! - Request/response structures for each endpoint
//! - `LogType`: Discriminator between status and result logs
//!
//! ## Message Flow
//! ```text
//!  Agent                                   Server
//!    │ ── POST /enroll {..} ─────────────────► │
//!    │ ◄──────── {node_key, node_invalid} ──── │
//!    │ ── POST /config {node_key} ───────────► │
//!    │ ◄──────────────── config document ───── │
//!    │ ── POST /log {node_key, log_type, ..} ► │
//!    │ ◄──────────────────────────────── {} ── │
//!    │ ── POST /read {node_key} ─────────────► │  (may wait)
//!    │ ◄──────────────── {queries: {..}} ───── │
//!    │ ── POST /write {node_key, queries} ───► │
//!    │ ◄──────────────────────────────── {} ── │
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Server handlers accept bodies as raw JSON and probe fields out of
//!   them; agents add fields freely and the mock must not reject them
//! - Every response must serialize to a JSON object
//!
//! ## Last Modified
//! v0.1.0 - Initial protocol definitions

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoreError, Result};

// ============================================
// Constants
// ============================================

/// Field every gated request carries.
pub const NODE_KEY_FIELD: &str = "node_key";

/// Field selecting the kind of log submission.
pub const LOG_TYPE_FIELD: &str = "log_type";

/// Prefix of the synthetic key a distributed query is emitted under.
pub const QUERY_KEY_PREFIX: &str = "query";

/// Returns the synthetic key for the query at `index`.
///
/// # Example
/// ```
/// use fleetmock_core::protocol::messages::query_key;
///
/// assert_eq!(query_key(3), "query3");
/// ```
#[must_use]
pub fn query_key(index: usize) -> String {
    format!("{QUERY_KEY_PREFIX}{index}")
}

/// Extracts the claimed node key from a request body.
///
/// Returns `None` when the body is not an object, the field is absent, or
/// the field is not a string.
#[must_use]
pub fn claimed_node_key(body: &Value) -> Option<&str> {
    body.get(NODE_KEY_FIELD).and_then(Value::as_str)
}

/// Placeholder written over the node key in logged request bodies.
pub const REDACTED_NODE_KEY: &str = "<redacted>";

/// Copies a request body for logging with its `node_key` masked.
///
/// # Example
/// ```
/// use fleetmock_core::protocol::messages::redact_node_key;
/// use serde_json::json;
///
/// let body = json!({"node_key": "abc", "log_type": "status"});
/// let logged = redact_node_key(body.as_object().unwrap());
/// assert_eq!(logged["node_key"], "<redacted>");
/// assert_eq!(logged["log_type"], "status");
/// ```
#[must_use]
pub fn redact_node_key(body: &Map<String, Value>) -> Map<String, Value> {
    let mut logged = body.clone();
    if let Some(key) = logged.get_mut(NODE_KEY_FIELD) {
        *key = Value::String(REDACTED_NODE_KEY.to_string());
    }
    logged
}

// ============================================
// Endpoint
// ============================================

/// The five request types of the remote API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Node enrollment (ungated).
    Enroll,
    /// Configuration fetch.
    Config,
    /// Log submission.
    Log,
    /// Distributed-query poll.
    Read,
    /// Distributed-query result write-back.
    Write,
}

impl Endpoint {
    /// Returns the HTTP path of this endpoint.
    #[must_use]
    pub const fn path(&self) -> &'static str {
        match self {
            Self::Enroll => "/enroll",
            Self::Config => "/config",
            Self::Log => "/log",
            Self::Read => "/read",
            Self::Write => "/write",
        }
    }

    /// Returns the label used when echoing requests to the log.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Enroll => "Enroll",
            Self::Config => "Config",
            Self::Log => "Log",
            Self::Read => "Read",
            Self::Write => "Write",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

// ============================================
// Enrollment
// ============================================

/// Enrollment request as sent by the probe client.
///
/// The server accepts any JSON body on `/enroll`; this struct only fixes
/// what the probe sends.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrollRequest {
    /// Enrollment secret, if the agent has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enroll_secret: Option<String>,
    /// Host identifier reported by the agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_identifier: Option<String>,
}

/// Enrollment response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollResponse {
    /// Node key the agent must echo on every later request.
    pub node_key: String,
    /// Always `false` on success.
    pub node_invalid: bool,
}

impl EnrollResponse {
    /// Creates a successful enrollment response for `node_key`.
    #[must_use]
    pub fn accepted(node_key: impl Into<String>) -> Self {
        Self {
            node_key: node_key.into(),
            node_invalid: false,
        }
    }
}

// ============================================
// Gated requests
// ============================================

/// Minimal gated request body (`/config`, `/read`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRequest {
    /// Claimed node key.
    pub node_key: String,
}

impl NodeRequest {
    /// Creates a request claiming `node_key`.
    #[must_use]
    pub fn new(node_key: impl Into<String>) -> Self {
        Self {
            node_key: node_key.into(),
        }
    }
}

/// Rejection body sent when the node key does not match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInvalidResponse {
    /// Always `true`: the agent should re-enroll.
    pub node_invalid: bool,
    /// Human-readable reason.
    pub error: String,
}

impl NodeInvalidResponse {
    /// Creates a rejection with the given reason.
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            node_invalid: true,
            error: error.into(),
        }
    }
}

/// Empty acknowledgement, serialized as `{}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {}

// ============================================
// Logs
// ============================================

/// Kind of a log submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogType {
    /// Agent status/diagnostic lines. Never persisted.
    Status,
    /// Scheduled query results. Normalized and persisted.
    Result,
    /// Any other kind; handled like results.
    Other(String),
}

impl LogType {
    /// Returns the wire name of this log type.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Status => "status",
            Self::Result => "result",
            Self::Other(s) => s,
        }
    }

    /// Returns `true` for status logs.
    #[must_use]
    pub const fn is_status(&self) -> bool {
        matches!(self, Self::Status)
    }

    /// Reads the log type from a submission body.
    ///
    /// # Errors
    /// Returns `MissingField` if `log_type` is absent or not a string.
    pub fn from_body(body: &Value) -> Result<Self> {
        body.get(LOG_TYPE_FIELD)
            .and_then(Value::as_str)
            .map(Self::from)
            .ok_or(CoreError::missing_field(LOG_TYPE_FIELD))
    }
}

impl From<&str> for LogType {
    fn from(s: &str) -> Self {
        match s {
            "status" => Self::Status,
            "result" => Self::Result,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for LogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for LogType {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LogType {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s.as_str()))
    }
}

/// Log submission as sent by the probe client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRequest {
    /// Claimed node key.
    pub node_key: String,
    /// Kind of log.
    pub log_type: LogType,
    /// Layout version marker; omitted for the default layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_version: Option<u64>,
    /// Entries (list) or table-keyed entries (object).
    pub data: Value,
}

// ============================================
// Distributed queries
// ============================================

/// Distributed-read response.
///
/// Contains at most one query per poll; an empty map means "nothing to do".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadResponse {
    /// Query key to SQL text.
    pub queries: BTreeMap<String, String>,
}

impl ReadResponse {
    /// A response carrying no work.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// A response carrying exactly one query.
    #[must_use]
    pub fn single(key: impl Into<String>, query: impl Into<String>) -> Self {
        let mut queries = BTreeMap::new();
        queries.insert(key.into(), query.into());
        Self { queries }
    }

    /// Returns `true` if no query is carried.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

/// Distributed-write request: results for previously handed-out queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WriteRequest {
    /// Claimed node key.
    #[serde(default)]
    pub node_key: String,
    /// Query key to result rows.
    #[serde(default)]
    pub queries: Map<String, Value>,
    /// Query key to execution status code (0 = success).
    #[serde(default)]
    pub statuses: Map<String, Value>,
}

impl WriteRequest {
    /// Leniently reads a write-back body; unknown or mistyped fields are
    /// treated as absent.
    #[must_use]
    pub fn from_body(body: &Value) -> Self {
        serde_json::from_value(body.clone()).unwrap_or_default()
    }

    /// Total number of result rows across all queries.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.queries
            .values()
            .map(|rows| rows.as_array().map_or(0, Vec::len))
            .sum()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_endpoint_paths() {
        assert_eq!(Endpoint::Enroll.path(), "/enroll");
        assert_eq!(Endpoint::Read.path(), "/read");
        assert_eq!(Endpoint::Write.to_string(), "/write");
        assert_eq!(Endpoint::Log.label(), "Log");
    }

    #[test]
    fn test_redact_node_key() {
        let body = json!({"node_key": "abc", "data": [{"node_key": "inner"}]});
        let logged = redact_node_key(body.as_object().unwrap());
        assert_eq!(logged["node_key"], REDACTED_NODE_KEY);
        assert_eq!(logged["data"][0]["node_key"], "inner");

        let body = json!({"enroll_secret": "s"});
        assert!(!redact_node_key(body.as_object().unwrap()).contains_key("node_key"));
    }

    #[test]
    fn test_claimed_node_key() {
        assert_eq!(claimed_node_key(&json!({"node_key": "abc"})), Some("abc"));
        assert_eq!(claimed_node_key(&json!({"node_key": 5})), None);
        assert_eq!(claimed_node_key(&json!({})), None);
        assert_eq!(claimed_node_key(&json!(["node_key"])), None);
    }

    #[test]
    fn test_enroll_response_shape() {
        let value = serde_json::to_value(EnrollResponse::accepted("abc")).unwrap();
        assert_eq!(value, json!({"node_key": "abc", "node_invalid": false}));
    }

    #[test]
    fn test_ack_is_empty_object() {
        assert_eq!(serde_json::to_value(Ack {}).unwrap(), json!({}));
    }

    #[test]
    fn test_log_type_from_body() {
        assert_eq!(LogType::from_body(&json!({"log_type": "status"})).unwrap(), LogType::Status);
        assert_eq!(LogType::from_body(&json!({"log_type": "result"})).unwrap(), LogType::Result);
        assert_eq!(
            LogType::from_body(&json!({"log_type": "snapshot"})).unwrap(),
            LogType::Other("snapshot".into())
        );
        assert!(LogType::from_body(&json!({})).is_err());
        assert!(LogType::from_body(&json!({"log_type": 1})).is_err());
    }

    #[test]
    fn test_read_response_shapes() {
        assert_eq!(serde_json::to_value(ReadResponse::empty()).unwrap(), json!({"queries": {}}));
        assert_eq!(
            serde_json::to_value(ReadResponse::single(query_key(0), "select 1;")).unwrap(),
            json!({"queries": {"query0": "select 1;"}})
        );
    }

    #[test]
    fn test_write_request_lenient() {
        let body = json!({
            "node_key": "abc",
            "queries": {"query0": [{"a": 1}, {"a": 2}], "query1": []},
            "statuses": {"query0": 0, "query1": 0}
        });
        let req = WriteRequest::from_body(&body);
        assert_eq!(req.row_count(), 2);
        assert_eq!(req.statuses.len(), 2);

        let garbage = WriteRequest::from_body(&json!({"queries": "nope"}));
        assert_eq!(garbage.row_count(), 0);
    }

    #[test]
    fn test_log_request_omits_default_version() {
        let req = LogRequest {
            node_key: "abc".into(),
            log_type: LogType::Result,
            log_version: None,
            data: json!([]),
        };
        let value = serde_json::to_value(req).unwrap();
        assert!(value.get("log_version").is_none());
        assert_eq!(value["log_type"], "result");
    }
}
