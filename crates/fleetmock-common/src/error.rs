// ============================================
// File: crates/fleetmock-common/src/error.rs
// ============================================
//! # Common Error Types
//!
//! ## Creation Reason
//! Parsing the shared identifier types can fail. The other crates wrap
//! `CommonError` in their own error enums.
//!
//! ## Main Functionality
//! - `CommonError`: Identifier parse failures
//! - `Result<T>`: Type alias using `CommonError`
//!
//! ## ⚠️ Important Note for Next Developer
//! - Never include the configured node key in error messages
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions

use thiserror::Error;

/// Common result type for operations that may fail.
pub type Result<T> = std::result::Result<T, CommonError>;

/// Errors raised while parsing shared identifiers.
///
/// # Example
/// ```
/// use fleetmock_common::error::CommonError;
/// use fleetmock_common::types::RecordId;
///
/// let err = "abcd".parse::<RecordId>().unwrap_err();
/// assert!(matches!(err, CommonError::InvalidLength { expected: 16, actual: 2 }));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommonError {
    /// Input is not valid hex.
    #[error("Invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// Decoded bytes have the wrong length.
    #[error("Invalid length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected length in bytes
        expected: usize,
        /// Actual length received
        actual: usize,
    },
}

impl CommonError {
    /// Creates an `InvalidLength` error.
    #[must_use]
    pub const fn invalid_length(expected: usize, actual: usize) -> Self {
        Self::InvalidLength { expected, actual }
    }
}
