// ============================================
// File: crates/fleetmock-sink/src/error.rs
// ============================================
//! # Sink Error Types
//!
//! ## Creation Reason
//! Defines error types for opening a document store and writing record
//! batches into it.
//!
//! ## Main Functionality
//! - `SinkError`: Primary error enum for sink operations
//! - Error conversion from `rusqlite` and I/O errors
//!
//! ## Error Categories
//! 1. **Setup Errors**: Opening the store, creating the schema
//! 2. **Write Errors**: A batch insert into one collection failed
//! 3. **Runtime Errors**: Blocking task panicked or was cancelled
//!
//! ## ⚠️ Important Note for Next Developer
//! - A write error concerns one collection only; callers keep going with
//!   the remaining collections of a submission
//! - No retry logic lives here
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use std::path::PathBuf;

use thiserror::Error;

use fleetmock_common::error::CommonError;

// ============================================
// Result Type Alias
// ============================================

/// Result type for sink operations.
pub type Result<T> = std::result::Result<T, SinkError>;

// ============================================
// SinkError
// ============================================

/// Sink error types.
#[derive(Error, Debug)]
pub enum SinkError {
    // ========================================
    // Setup Errors
    // ========================================

    /// Failed to open the document store.
    #[error("Failed to open store at {path}: {reason}")]
    OpenFailed {
        /// Store location
        path: PathBuf,
        /// Why opening failed
        reason: String,
    },

    /// Failed to create or migrate the schema.
    #[error("Schema setup failed: {reason}")]
    SchemaFailed {
        /// Why setup failed
        reason: String,
    },

    // ========================================
    // Write Errors
    // ========================================

    /// Bulk insert into a collection failed.
    #[error("Insert into '{collection}' failed: {reason}")]
    InsertFailed {
        /// Target collection
        collection: String,
        /// Why the insert failed
        reason: String,
    },

    /// Query against the store failed.
    #[error("Query failed: {reason}")]
    QueryFailed {
        /// Why the query failed
        reason: String,
    },

    // ========================================
    // Runtime Errors
    // ========================================

    /// The blocking worker running a store operation did not complete.
    #[error("Store worker failed: {reason}")]
    WorkerFailed {
        /// Join error description
        reason: String,
    },

    /// Error from common crate.
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl SinkError {
    // ========================================
    // Convenience Constructors
    // ========================================

    /// Creates an `OpenFailed` error.
    pub fn open_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::OpenFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `InsertFailed` error.
    pub fn insert_failed(collection: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InsertFailed {
            collection: collection.into(),
            reason: reason.into(),
        }
    }

    // ========================================
    // Error Classification
    // ========================================

    /// Returns the collection a write error concerns, if any.
    #[must_use]
    pub fn collection(&self) -> Option<&str> {
        match self {
            Self::InsertFailed { collection, .. } => Some(collection),
            _ => None,
        }
    }
}

// ============================================
// Error Conversions
// ============================================

impl From<rusqlite::Error> for SinkError {
    fn from(err: rusqlite::Error) -> Self {
        Self::QueryFailed {
            reason: err.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for SinkError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::WorkerFailed {
            reason: err.to_string(),
        }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SinkError::insert_failed("processes", "disk full");
        assert!(err.to_string().contains("processes"));
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_error_classification() {
        let open = SinkError::open_failed("/nonexistent/x.db", "no such directory");
        assert_eq!(open.collection(), None);

        let insert = SinkError::insert_failed("users", "constraint");
        assert_eq!(insert.collection(), Some("users"));
    }

    #[test]
    fn test_rusqlite_error_conversion() {
        let err: SinkError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, SinkError::QueryFailed { .. }));
    }
}
