// ============================================
// File: crates/fleetmock-common/src/lib.rs
// ============================================
//! # fleetmock Common - Shared Utilities Library
//!
//! ## Creation Reason
//! Provides foundational types and utilities shared across all fleetmock
//! crates, ensuring consistency and reducing code duplication.
//!
//! ## Main Functionality
//! - [`types`]: Identifier types (`NodeKey`, `RecordId`)
//! - [`time`]: Unix timestamps
//! - [`error`]: Common error types and result aliases
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │              fleetmock-server                       │
//! │                    │                                │
//! │         ┌──────────┴──────────┐                    │
//! │         ▼                     ▼                    │
//! │   fleetmock-core  ◄──  fleetmock-sink              │
//! │         │                     │                    │
//! │         └──────────┬──────────┘                    │
//! │                    ▼                               │
//! │            fleetmock-common  ◄── You are here     │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dependencies
//! - No internal crate dependencies (leaf node)
//!
//! ## ⚠️ Important Note for Next Developer
//! - This crate is the foundation - changes affect everything
//! - Keep dependencies minimal
//! - The node key is a secret: never log it through `Debug`
//!
//! ## Last Modified
//! v0.1.0 - Initial implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod time;
pub mod types;

// Re-export commonly used items at crate root
pub use error::{CommonError, Result};
pub use time::Timestamp;
pub use types::{NodeKey, RecordId};
