// ============================================
// File: crates/fleetmock-core/src/logs/mod.rs
// ============================================
//! # Result Log Handling
//!
//! ## Main Functionality
//! - [`submission`]: Shape probing of raw submissions into sum types
//! - [`normalizer`]: Conversion into per-table record batches
//!
//! ## Last Modified
//! v0.1.0 - Initial log handling

pub mod normalizer;
pub mod submission;

pub use normalizer::{normalize, NormalizedBatches, NormalizedRecord, TableBatch, RECORD_ID_FIELD};
pub use submission::{LogEntry, LogSubmission};
