// ============================================
// File: crates/fleetmock-sink/src/traits.rs
// ============================================
//! # Sink Traits
//!
//! ## Creation Reason
//! Defines the storage capability the log pipeline depends on, so the
//! server can run against SQLite in production and an in-memory sink in
//! tests.
//!
//! ## Main Functionality
//! - `LogSink`: Bulk insert of normalized records into a named collection
//!
//! ## ⚠️ Important Note for Next Developer
//! - Implementations must be Send + Sync, one sink is shared by all
//!   request handlers
//! - One `store` call is one bulk insert; there is no cross-collection
//!   transaction
//!
//! ## Last Modified
//! v0.1.0 - Initial trait definitions

use async_trait::async_trait;

use fleetmock_core::logs::NormalizedRecord;

use crate::error::Result;

// ============================================
// LogSink
// ============================================

/// Durable destination for normalized log records.
///
/// # Example Implementation
/// ```ignore
/// #[async_trait]
/// impl LogSink for MySink {
///     async fn store(&self, collection: &str, records: &[NormalizedRecord]) -> Result<usize> {
///         self.client.insert_many(collection, records).await
///     }
///
///     fn name(&self) -> &str {
///         "my-sink"
///     }
/// }
/// ```
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Inserts `records` into `collection` as one batch.
    ///
    /// # Returns
    /// Number of records written.
    ///
    /// # Errors
    /// Returns `InsertFailed` if the batch could not be written; nothing of
    /// the batch is kept in that case.
    async fn store(&self, collection: &str, records: &[NormalizedRecord]) -> Result<usize>;

    /// Short name of the sink for log output.
    fn name(&self) -> &str;
}
