// ============================================
// File: crates/fleetmock-sink/src/memory.rs
// ============================================
//! # In-Memory Sink
//!
//! ## Creation Reason
//! Lets pipeline and handler tests observe exactly which batches were
//! written, and make chosen collections fail, without a database.
//!
//! ## Usage in Tests
//! ```ignore
//! use fleetmock_sink::{LogSink, MemorySink};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let sink = MemorySink::new();
//! sink.fail_collection("broken");
//!
//! assert!(sink.store("broken", &[]).await.is_err());
//! assert_eq!(sink.batch_count(), 0);
//! # }
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - This is for testing only - do not use in production
//! - Failure injection applies to every later `store` into that collection
//!
//! ## Last Modified
//! v0.1.0 - Initial mock implementation

use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::Mutex;

use fleetmock_core::logs::NormalizedRecord;

use crate::error::{Result, SinkError};
use crate::traits::LogSink;

// ============================================
// MemorySink
// ============================================

/// One recorded `store` call.
#[derive(Debug, Clone)]
pub struct StoredBatch {
    /// Target collection
    pub collection: String,
    /// Records as passed in
    pub records: Vec<NormalizedRecord>,
}

/// Sink that keeps every batch in memory.
#[derive(Default)]
pub struct MemorySink {
    batches: Mutex<Vec<StoredBatch>>,
    failing: Mutex<HashSet<String>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later `store` into `collection` fail.
    pub fn fail_collection(&self, collection: impl Into<String>) {
        self.failing.lock().insert(collection.into());
    }

    /// Returns all records stored into `collection`, oldest first.
    #[must_use]
    pub fn records(&self, collection: &str) -> Vec<NormalizedRecord> {
        self.batches
            .lock()
            .iter()
            .filter(|b| b.collection == collection)
            .flat_map(|b| b.records.iter().cloned())
            .collect()
    }

    /// Number of successful `store` calls.
    #[must_use]
    pub fn batch_count(&self) -> usize {
        self.batches.lock().len()
    }

    /// Takes all recorded batches, clearing the sink.
    #[must_use]
    pub fn take_batches(&self) -> Vec<StoredBatch> {
        std::mem::take(&mut *self.batches.lock())
    }
}

#[async_trait]
impl LogSink for MemorySink {
    async fn store(&self, collection: &str, records: &[NormalizedRecord]) -> Result<usize> {
        if self.failing.lock().contains(collection) {
            return Err(SinkError::insert_failed(collection, "injected failure"));
        }

        self.batches.lock().push(StoredBatch {
            collection: collection.to_string(),
            records: records.to_vec(),
        });
        Ok(records.len())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

impl std::fmt::Debug for MemorySink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySink")
            .field("batches", &self.batch_count())
            .field("failing", &self.failing.lock().len())
            .finish()
    }
}

// ============================================
// Tests
// ============================================
