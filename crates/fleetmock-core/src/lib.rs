// ============================================
// File: crates/fleetmock-core/src/lib.rs
// ============================================
//! # fleetmock Core - Protocol & Log Normalization Library
//!
//! ## Creation Reason
//! Holds everything about the remote API that does not depend on a
//! transport or a runtime: the JSON message types and the conversion of
//! submitted result logs into storable records.
//!
//! ## Main Functionality
//!
//! ### Protocol Module ([`protocol`])
//! - Endpoint list and request/response bodies
//! - Log layout version detection
//!
//! ### Logs Module ([`logs`])
//! - Submission and entry sum types decided once at the boundary
//! - Normalizer producing per-table batches of flat records
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              fleetmock-server                       │
//! │                    │                                │
//! │         ┌──────────┴──────────┐                     │
//! │         ▼                     ▼                     │
//! │   fleetmock-core  ◄──   fleetmock-sink              │
//! │   You are here        │                             │
//! │         │             │                             │
//! │         └──────────┬──────────┘                     │
//! │                    ▼                                │
//! │             fleetmock-common                        │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - No I/O in this crate; it must stay usable from the probe client and
//!   the sinks alike
//! - Malformed log data is skipped with a warning, never an error
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod logs;
pub mod protocol;

// Re-export commonly used items
pub use error::{CoreError, Result};
pub use logs::{normalize, NormalizedBatches, NormalizedRecord, TableBatch};
pub use protocol::{Endpoint, LogFormat, LogType, ReadResponse};
