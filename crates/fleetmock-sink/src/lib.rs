// ============================================
// File: crates/fleetmock-sink/src/lib.rs
// ============================================
//! # fleetmock Sink - Record Storage Layer
//!
//! ## Creation Reason
//! Provides the storage abstraction normalized log records are written
//! through, with a durable SQLite implementation and an in-memory one for
//! tests.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`traits`]: The `LogSink` bulk-insert interface
//! - [`sqlite`]: `SQLite` document store
//! - `memory`: In-memory sink with failure injection (`mock` feature)
//! - [`error`]: Sink-specific error types
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              fleetmock-server                       │
//! │                    │                                │
//! │         ┌──────────┴──────────┐                     │
//! │         ▼                     ▼                     │
//! │   fleetmock-core  ◄──   fleetmock-sink              │
//! │                         You are here                │
//! │         │                     │                     │
//! │         └──────────┬──────────┘                     │
//! │                    ▼                                │
//! │             fleetmock-common                        │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Always go through the `LogSink` trait for testability
//! - No retry or backoff here; a failed batch is reported and dropped
//!
//! ## Last Modified
//! v0.1.0 - Initial storage layer

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod memory;
pub mod sqlite;
pub mod traits;

// Re-export primary types
pub use error::{Result, SinkError};
#[cfg(any(test, feature = "mock"))]
pub use memory::{MemorySink, StoredBatch};
pub use sqlite::SqliteSink;
pub use traits::LogSink;
