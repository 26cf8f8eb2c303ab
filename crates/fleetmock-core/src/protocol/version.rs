// ============================================
// File: crates/fleetmock-core/src/protocol/version.rs
// ============================================
//! # Log Submission Format Versions
//!
//! ## Creation Reason
//! Agents submit result logs in one of two layouts. The layout is selected
//! by an explicit version marker on the submission body, read once here so
//! the normalizer never has to guess from the payload contents alone.
//!
//! ## Version History
//! - **1** (default, marker absent): `data` is a list of entries, each
//!   carrying its own table `name`
//! - **2** (versioned): `data` is an object keyed by table name, each value
//!   a list of entries without a `name`
//!
//! ## ⚠️ Important Note for Next Developer
//! - The marker may arrive as a number or a numeric string
//! - Unknown future versions (> 2) are read with the versioned layout
//!
//! ## Last Modified
//! v0.1.0 - Initial version definitions

use serde_json::{Map, Value};

// ============================================
// Constants
// ============================================

/// Field carrying the log format version marker.
pub const LOG_VERSION_FIELD: &str = "log_version";

/// Lowest marker value that selects the table-keyed layout.
pub const VERSIONED_LAYOUT_MIN: u64 = 2;

// ============================================
// LogFormat
// ============================================

/// Layout of a result-log submission.
///
/// # Example
/// ```
/// use fleetmock_core::protocol::LogFormat;
/// use serde_json::json;
///
/// let body = json!({"log_version": 2, "data": {}});
/// assert_eq!(LogFormat::detect(body.as_object().unwrap()), LogFormat::Versioned);
///
/// let body = json!({"data": []});
/// assert_eq!(LogFormat::detect(body.as_object().unwrap()), LogFormat::Default);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LogFormat {
    /// Top-level entry list, table name inside each entry.
    #[default]
    Default,
    /// Table-keyed mapping of entry lists.
    Versioned,
}

impl LogFormat {
    /// Reads the version marker from a submission body.
    ///
    /// A missing, non-numeric or too-low marker selects [`LogFormat::Default`].
    #[must_use]
    pub fn detect(body: &Map<String, Value>) -> Self {
        match body.get(LOG_VERSION_FIELD).and_then(parse_marker) {
            Some(v) if v >= VERSIONED_LAYOUT_MIN => Self::Versioned,
            _ => Self::Default,
        }
    }
}

fn parse_marker(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn detect(body: Value) -> LogFormat {
        LogFormat::detect(body.as_object().unwrap())
    }

    #[test]
    fn test_marker_absent_is_default() {
        assert_eq!(detect(json!({"data": []})), LogFormat::Default);
    }

    #[test]
    fn test_numeric_marker() {
        assert_eq!(detect(json!({"log_version": 1})), LogFormat::Default);
        assert_eq!(detect(json!({"log_version": 2})), LogFormat::Versioned);
        assert_eq!(detect(json!({"log_version": 3})), LogFormat::Versioned);
    }

    #[test]
    fn test_string_marker() {
        assert_eq!(detect(json!({"log_version": "2"})), LogFormat::Versioned);
        assert_eq!(detect(json!({"log_version": " 2 "})), LogFormat::Versioned);
        assert_eq!(detect(json!({"log_version": "two"})), LogFormat::Default);
    }

    #[test]
    fn test_garbage_marker_is_default() {
        assert_eq!(detect(json!({"log_version": -2})), LogFormat::Default);
        assert_eq!(detect(json!({"log_version": [2]})), LogFormat::Default);
        assert_eq!(detect(json!({"log_version": null})), LogFormat::Default);
    }
}
