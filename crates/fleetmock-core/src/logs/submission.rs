// ============================================
// File: crates/fleetmock-core/src/logs/submission.rs
// ============================================
//! # Log Submission Shapes
//!
//! ## Creation Reason
//! Result-log bodies arrive in two layouts with two kinds of entries each.
//! This module probes the raw JSON once and classifies it into borrowed sum
//! types, so the normalizer works on typed variants only.
//!
//! ## Main Functionality
//! - `LogSubmission`: Default list, versioned table map, or unrecognized
//! - `LogEntry`: Snapshot, differential, or unrecognized
//!
//! ## Shapes
//! ```text
//! default:    {"data": [{"name": "t", "snapshot": [{..}, {..}]},
//!                       {"name": "t", "columns": {..}}]}
//! versioned:  {"log_version": 2,
//!              "data": {"t": [{"snapshot": [..]}, {"columns": {..}}]}}
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - `snapshot` is checked before `columns`; an entry carrying both is a
//!   snapshot
//! - Probing never clones; variants borrow from the request body
//!
//! ## Last Modified
//! v0.1.0 - Initial shape probing

use serde_json::{Map, Value};

use crate::protocol::LogFormat;

// ============================================
// Field Names
// ============================================

/// Top-level field carrying the submitted entries.
pub const DATA_FIELD: &str = "data";

/// Entry field carrying a list of point-in-time rows.
pub const SNAPSHOT_FIELD: &str = "snapshot";

/// Entry field carrying a single row delta.
pub const COLUMNS_FIELD: &str = "columns";

/// Entry field carrying the table name (default layout only).
pub const NAME_FIELD: &str = "name";

/// Entry fields dropped from every normalized record.
pub const HOUSEKEEPING_FIELDS: [&str; 3] = [SNAPSHOT_FIELD, NAME_FIELD, COLUMNS_FIELD];

// ============================================
// LogSubmission
// ============================================

/// Classified result-log submission.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogSubmission<'a> {
    /// Ordered entry list, table name inside each entry.
    Default(&'a [Value]),
    /// Table name to ordered entry list.
    Versioned(&'a Map<String, Value>),
    /// Neither layout matched.
    Unrecognized {
        /// Why the body was not recognized
        reason: &'static str,
    },
}

impl<'a> LogSubmission<'a> {
    /// Classifies a submission body.
    ///
    /// The version marker picks which layout `data` must have; a `data`
    /// field of the wrong type makes the whole submission unrecognized.
    #[must_use]
    pub fn probe(body: &'a Map<String, Value>) -> Self {
        let Some(data) = body.get(DATA_FIELD) else {
            return Self::Unrecognized {
                reason: "missing data field",
            };
        };

        match (LogFormat::detect(body), data) {
            (LogFormat::Versioned, Value::Object(tables)) => Self::Versioned(tables),
            (LogFormat::Versioned, _) => Self::Unrecognized {
                reason: "versioned submission data is not an object",
            },
            (LogFormat::Default, Value::Array(entries)) => Self::Default(entries),
            (LogFormat::Default, _) => Self::Unrecognized {
                reason: "data is not a list",
            },
        }
    }

    /// Returns the layout of a recognized submission.
    #[must_use]
    pub const fn format(&self) -> Option<LogFormat> {
        match self {
            Self::Default(_) => Some(LogFormat::Default),
            Self::Versioned(_) => Some(LogFormat::Versioned),
            Self::Unrecognized { .. } => None,
        }
    }
}

// ============================================
// LogEntry
// ============================================

/// Classified log entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogEntry<'a> {
    /// Full point-in-time row set.
    Snapshot {
        /// The whole entry, housekeeping fields included
        entry: &'a Map<String, Value>,
        /// Nested rows
        rows: &'a [Value],
    },
    /// Single row delta.
    Differential {
        /// The whole entry, housekeeping fields included
        entry: &'a Map<String, Value>,
        /// The row
        columns: &'a Map<String, Value>,
    },
    /// Neither discriminator present with the right type.
    Unrecognized,
}

impl<'a> LogEntry<'a> {
    /// Classifies one entry.
    #[must_use]
    pub fn probe(value: &'a Value) -> Self {
        let Some(entry) = value.as_object() else {
            return Self::Unrecognized;
        };

        if let Some(rows) = entry.get(SNAPSHOT_FIELD).and_then(Value::as_array) {
            return Self::Snapshot { entry, rows };
        }
        if let Some(columns) = entry.get(COLUMNS_FIELD).and_then(Value::as_object) {
            return Self::Differential { entry, columns };
        }
        Self::Unrecognized
    }

    /// Returns the table name an entry declares for itself, if any.
    #[must_use]
    pub fn declared_table(&self) -> Option<&'a str> {
        match self {
            Self::Snapshot { entry, .. } | Self::Differential { entry, .. } => {
                entry.get(NAME_FIELD).and_then(Value::as_str)
            }
            Self::Unrecognized => None,
        }
    }

    /// Returns a short label for log output.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Snapshot { .. } => "snapshot",
            Self::Differential { .. } => "differential",
            Self::Unrecognized => "unrecognized",
        }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn probe(body: &Value) -> LogSubmission<'_> {
        LogSubmission::probe(body.as_object().unwrap())
    }

    #[test]
    fn test_default_submission() {
        let body = json!({"log_type": "result", "data": [{"name": "t"}]});
        let submission = probe(&body);
        assert!(matches!(submission, LogSubmission::Default(entries) if entries.len() == 1));
        assert_eq!(submission.format(), Some(LogFormat::Default));
    }

    #[test]
    fn test_versioned_submission() {
        let body = json!({"log_version": 2, "data": {"t": []}});
        let submission = probe(&body);
        assert!(matches!(submission, LogSubmission::Versioned(tables) if tables.contains_key("t")));
        assert_eq!(submission.format(), Some(LogFormat::Versioned));
    }

    #[test]
    fn test_unrecognized_submissions() {
        for body in [
            json!({"log_type": "result"}),
            json!({"data": {"t": []}}),
            json!({"data": "text"}),
            json!({"log_version": 2, "data": []}),
        ] {
            let submission = probe(&body);
            assert!(matches!(submission, LogSubmission::Unrecognized { .. }), "{body}");
            assert_eq!(submission.format(), None);
        }
    }

    #[test]
    fn test_entry_kinds() {
        let snapshot = json!({"name": "t", "snapshot": [{"a": 1}]});
        let differential = json!({"name": "t", "columns": {"a": 1}});
        let neither = json!({"name": "t", "action": "added"});
        let bad_columns = json!({"name": "t", "columns": [1, 2]});

        assert_eq!(LogEntry::probe(&snapshot).kind(), "snapshot");
        assert_eq!(LogEntry::probe(&differential).kind(), "differential");
        assert_eq!(LogEntry::probe(&neither), LogEntry::Unrecognized);
        assert_eq!(LogEntry::probe(&bad_columns), LogEntry::Unrecognized);
        assert_eq!(LogEntry::probe(&json!(42)), LogEntry::Unrecognized);
    }

    #[test]
    fn test_snapshot_wins_over_columns() {
        let both = json!({"snapshot": [], "columns": {"a": 1}});
        assert_eq!(LogEntry::probe(&both).kind(), "snapshot");
    }

    #[test]
    fn test_declared_table() {
        let named = json!({"name": "t1", "columns": {}});
        let unnamed = json!({"columns": {}});
        assert_eq!(LogEntry::probe(&named).declared_table(), Some("t1"));
        assert_eq!(LogEntry::probe(&unnamed).declared_table(), None);
    }
}
