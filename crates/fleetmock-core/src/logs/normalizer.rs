// ============================================
// File: crates/fleetmock-core/src/logs/normalizer.rs
// ============================================
//! # Log Normalizer
//!
//! ## Creation Reason
//! Reshapes both result-log layouts into one representation: per-table
//! batches of flat records, each tagged with a fresh synthetic id.
//!
//! ## Main Functionality
//! - `normalize()`: Submission body to `NormalizedBatches`
//! - `NormalizedRecord`: Flat row plus `_id`
//! - `NormalizedBatches`: Table batches in first-seen order
//!
//! ## Normalization Flow
//! ```text
//! body ──► LogSubmission::probe
//!            │
//!            ├─ Default(entries)    ── table = entry.name ──┐
//!            ├─ Versioned(tables)   ── table = outer key ───┤
//!            └─ Unrecognized        ── warn, empty result   │
//!                                                           ▼
//!                                          LogEntry::probe(entry)
//!            ┌──────────────────────────────────┼──────────────────┐
//!            ▼                                  ▼                  ▼
//!     Snapshot: one record per row   Differential: one record   warn, skip
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - One bad entry never aborts the submission; it is counted in
//!   `NormalizedBatches::skipped` and logged
//! - Row fields overwrite entry fields with the same name
//! - A row's own `_id` is discarded, the synthetic id always wins
//!
//! ## Last Modified
//! v0.1.0 - Initial normalizer

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use fleetmock_common::types::RecordId;

use super::submission::{LogEntry, LogSubmission, HOUSEKEEPING_FIELDS};

/// Field name of the synthetic record id.
pub const RECORD_ID_FIELD: &str = "_id";

// ============================================
// NormalizedRecord
// ============================================

/// One flat log row ready for storage.
///
/// Serializes as the row's fields with `_id` first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRecord {
    /// Synthetic unique id.
    #[serde(rename = "_id")]
    pub id: RecordId,
    /// Row fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl NormalizedRecord {
    /// Builds a record from an entry's own fields overlaid with `row`.
    fn merge(entry: &Map<String, Value>, row: &Map<String, Value>) -> Self {
        let mut fields: Map<String, Value> = entry
            .iter()
            .filter(|(k, _)| !HOUSEKEEPING_FIELDS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (k, v) in row {
            fields.insert(k.clone(), v.clone());
        }
        fields.remove(RECORD_ID_FIELD);

        Self {
            id: RecordId::generate(),
            fields,
        }
    }

    /// Returns the record as a JSON document.
    #[must_use]
    pub fn to_document(&self) -> Value {
        let mut doc = Map::with_capacity(self.fields.len() + 1);
        doc.insert(RECORD_ID_FIELD.to_string(), Value::String(self.id.to_string()));
        doc.extend(self.fields.iter().map(|(k, v)| (k.clone(), v.clone())));
        Value::Object(doc)
    }
}

// ============================================
// NormalizedBatches
// ============================================

/// Records of one table, in submission order.
#[derive(Debug, Clone, PartialEq)]
pub struct TableBatch {
    /// Table (collection) name.
    pub table: String,
    /// Records in submission order.
    pub records: Vec<NormalizedRecord>,
}

/// Normalizer output: table batches in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedBatches {
    batches: Vec<TableBatch>,
    /// Entries or rows dropped because their shape was not recognized.
    pub skipped: usize,
}

impl NormalizedBatches {
    fn push(&mut self, table: &str, record: NormalizedRecord) {
        // Submissions carry a handful of tables; a linear scan is enough
        match self.batches.iter_mut().find(|b| b.table == table) {
            Some(batch) => batch.records.push(record),
            None => self.batches.push(TableBatch {
                table: table.to_string(),
                records: vec![record],
            }),
        }
    }

    /// Returns the records of `table`, if any were produced.
    #[must_use]
    pub fn get(&self, table: &str) -> Option<&[NormalizedRecord]> {
        self.batches
            .iter()
            .find(|b| b.table == table)
            .map(|b| b.records.as_slice())
    }

    /// Table names in first-seen order.
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        self.batches.iter().map(|b| b.table.as_str())
    }

    /// Iterates over the batches.
    pub fn iter(&self) -> std::slice::Iter<'_, TableBatch> {
        self.batches.iter()
    }

    /// Number of tables with at least one record.
    #[must_use]
    pub fn table_count(&self) -> usize {
        self.batches.len()
    }

    /// Total number of records across all tables.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.batches.iter().map(|b| b.records.len()).sum()
    }

    /// Returns `true` if no record was produced.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }
}

impl IntoIterator for NormalizedBatches {
    type Item = TableBatch;
    type IntoIter = std::vec::IntoIter<TableBatch>;

    fn into_iter(self) -> Self::IntoIter {
        self.batches.into_iter()
    }
}

impl<'a> IntoIterator for &'a NormalizedBatches {
    type Item = &'a TableBatch;
    type IntoIter = std::slice::Iter<'a, TableBatch>;

    fn into_iter(self) -> Self::IntoIter {
        self.batches.iter()
    }
}

// ============================================
// Normalization
// ============================================

/// Normalizes a result-log submission body.
///
/// Never fails: unrecognized submissions, entries and rows are logged at
/// `warn` and skipped.
///
/// # Example
/// ```
/// use fleetmock_core::logs::normalize;
/// use serde_json::json;
///
/// let body = json!({"data": [{"name": "t1", "columns": {"x": 1}}]});
/// let batches = normalize(body.as_object().unwrap());
///
/// let records = batches.get("t1").unwrap();
/// assert_eq!(records.len(), 1);
/// assert_eq!(records[0].fields["x"], 1);
/// ```
#[must_use]
pub fn normalize(body: &Map<String, Value>) -> NormalizedBatches {
    let mut out = NormalizedBatches::default();

    match LogSubmission::probe(body) {
        LogSubmission::Default(entries) => {
            for (index, value) in entries.iter().enumerate() {
                let entry = LogEntry::probe(value);
                match entry.declared_table() {
                    Some(table) => collect(&mut out, table, entry, index),
                    None => {
                        warn!(index, entry = %value, "Skipping log entry without table name or known shape");
                        out.skipped += 1;
                    }
                }
            }
        }
        LogSubmission::Versioned(tables) => {
            for (table, entries) in tables {
                let Some(entries) = entries.as_array() else {
                    warn!(table = %table, "Skipping versioned table whose entries are not a list");
                    out.skipped += 1;
                    continue;
                };
                for (index, value) in entries.iter().enumerate() {
                    collect(&mut out, table, LogEntry::probe(value), index);
                }
            }
        }
        LogSubmission::Unrecognized { reason } => {
            warn!(reason, "Unrecognized log submission");
        }
    }

    debug!(
        tables = out.table_count(),
        records = out.record_count(),
        skipped = out.skipped,
        "Log submission normalized"
    );
    out
}

fn collect(out: &mut NormalizedBatches, table: &str, entry: LogEntry<'_>, index: usize) {
    match entry {
        LogEntry::Snapshot { entry, rows } => {
            for (row_index, row) in rows.iter().enumerate() {
                match row.as_object() {
                    Some(row) => out.push(table, NormalizedRecord::merge(entry, row)),
                    None => {
                        warn!(table, index, row_index, "Skipping snapshot row that is not an object");
                        out.skipped += 1;
                    }
                }
            }
        }
        LogEntry::Differential { entry, columns } => {
            out.push(table, NormalizedRecord::merge(entry, columns));
        }
        LogEntry::Unrecognized => {
            warn!(table, index, "Skipping log entry of unrecognized shape");
            out.skipped += 1;
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
    use std::collections::HashSet;

    fn run(body: Value) -> NormalizedBatches {
        normalize(body.as_object().unwrap())
    }

    #[test]
    fn test_differential_entry() {
        let batches = run(json!({
            "node_key": "abc",
            "log_type": "result",
            "data": [{"name": "t1", "columns": {"x": 1}}]
        }));

        assert_eq!(batches.table_count(), 1);
        let records = batches.get("t1").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(Value::Object(records[0].fields.clone()), json!({"x": 1}));
    }

    #[test]
    fn test_snapshot_yields_one_record_per_row() {
        let rows: Vec<Value> = (0..25).map(|i| json!({"pid": i})).collect();
        let batches = run(json!({
            "data": [{"name": "processes", "hostIdentifier": "h1", "snapshot": rows}]
        }));

        let records = batches.get("processes").unwrap();
        assert_eq!(records.len(), 25);

        let ids: HashSet<RecordId> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids.len(), 25);

        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.fields["pid"], i);
            assert_eq!(record.fields["hostIdentifier"], "h1");
            assert!(!record.fields.contains_key("snapshot"));
            assert!(!record.fields.contains_key("name"));
        }
    }

    #[test]
    fn test_partial_failure_keeps_good_entries() {
        let batches = run(json!({
            "data": [
                {"name": "a", "columns": {"v": 1}},
                {"name": "a", "action": "mystery"},
                {"name": "b", "snapshot": [{"v": 2}, {"v": 3}]},
                "not an entry",
                {"columns": {"v": 4}},
                {"name": "a", "columns": {"v": 5}}
            ]
        }));

        assert_eq!(batches.skipped, 3);
        assert_eq!(batches.record_count(), 4);
        let a: Vec<&Value> = batches.get("a").unwrap().iter().map(|r| &r.fields["v"]).collect();
        assert_eq!(a, [&json!(1), &json!(5)]);
        assert_eq!(batches.get("b").unwrap().len(), 2);
    }

    #[test]
    fn test_versioned_layout_uses_outer_key() {
        let batches = run(json!({
            "log_version": 2,
            "data": {
                "users": [{"snapshot": [{"uid": 0}, {"uid": 501}]}],
                "mounts": [{"columns": {"path": "/"}, "action": "added"}],
                "broken": "nope"
            }
        }));

        assert_eq!(batches.tables().collect::<Vec<_>>(), ["users", "mounts"]);
        assert_eq!(batches.get("users").unwrap().len(), 2);
        let mount = &batches.get("mounts").unwrap()[0];
        assert_eq!(mount.fields["path"], "/");
        assert_eq!(mount.fields["action"], "added");
        assert_eq!(batches.skipped, 1);
    }

    #[test]
    fn test_unrecognized_submission_is_empty() {
        let batches = run(json!({"log_type": "result", "data": "text"}));
        assert!(batches.is_empty());
        assert_eq!(batches.record_count(), 0);
    }

    #[test]
    fn test_row_fields_win_and_synthetic_id_wins() {
        let batches = run(json!({
            "data": [{"name": "t", "counter": 1, "snapshot": [{"counter": 9, "_id": "row-id"}]}]
        }));
        let record = &batches.get("t").unwrap()[0];
        assert_eq!(record.fields["counter"], 9);
        assert!(!record.fields.contains_key(RECORD_ID_FIELD));

        let doc = record.to_document();
        assert_eq!(doc[RECORD_ID_FIELD], record.id.to_string());
    }

    #[test]
    fn test_table_order_is_first_seen() {
        let batches = run(json!({
            "data": [
                {"name": "z", "columns": {}},
                {"name": "a", "columns": {}},
                {"name": "z", "columns": {}}
            ]
        }));
        assert_eq!(batches.tables().collect::<Vec<_>>(), ["z", "a"]);
        assert_eq!(batches.get("z").unwrap().len(), 2);
    }

    #[test]
    fn test_record_serializes_with_id() {
        let batches = run(json!({"data": [{"name": "t", "columns": {"x": 1}}]}));
        let record = &batches.get("t").unwrap()[0];
        let value = serde_json::to_value(record).unwrap();
        assert_eq!(value["x"], 1);
        assert_eq!(value["_id"], record.id.to_string());
        assert_eq!(value, record.to_document());
    }
}
