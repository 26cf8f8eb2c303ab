// ============================================
// File: crates/fleetmock-core/src/error.rs
// ============================================
//! # Core Error Types
//!
//! ## Creation Reason
//! Defines error types for parsing agent request bodies at the protocol
//! boundary.
//!
//! ## Main Functionality
//! - `CoreError`: Primary error enum for core operations
//! - Every variant is an agent mistake; the HTTP layer maps them to 400
//!
//! ## ⚠️ Important Note for Next Developer
//! - Unrecognized log shapes are NOT errors: the normalizer logs and skips
//!   them, agents must not be made to retry accepted data
//! - Never echo the claimed node key back in an error message
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

use fleetmock_common::error::CommonError;

// ============================================
// Result Type Alias
// ============================================

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

// ============================================
// CoreError
// ============================================

/// Core error types for request parsing.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The request body is not a JSON object.
    #[error("Malformed request: {reason}")]
    MalformedRequest {
        /// What's wrong with the body
        reason: String,
    },

    /// A required field is absent or has the wrong type.
    #[error("Missing or invalid field '{field}'")]
    MissingField {
        /// Name of the field
        field: &'static str,
    },

    /// Error from common crate.
    #[error(transparent)]
    Common(#[from] CommonError),
}

impl CoreError {
    /// Creates a `MalformedRequest` error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedRequest {
            reason: reason.into(),
        }
    }

    /// Creates a `MissingField` error.
    #[must_use]
    pub const fn missing_field(field: &'static str) -> Self {
        Self::MissingField { field }
    }
}
