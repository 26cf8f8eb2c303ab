// ============================================
// File: crates/fleetmock-core/src/protocol/mod.rs
// ============================================
//! # Protocol Module
//!
//! ## Creation Reason
//! Defines the JSON remote API spoken between agents and the responder.
//!
//! ## Main Functionality
//!
//! ### Submodules
//! - [`messages`]: Request/response bodies for the five endpoints
//! - [`version`]: Log submission layout versions
//!
//! ## Protocol Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Enrollment Phase                         │
//! │                                                             │
//! │  Agent ──────── POST /enroll ──────────────────────► Server │
//! │  Agent ◄─────── {node_key, node_invalid: false} ──── Server │
//! │                                                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    Steady State (node_key gated)            │
//! │                                                             │
//! │  Agent ══════ /config, /log, /read, /write ═════════ Server │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - All endpoints are POST with JSON bodies
//! - Every response body must be a JSON object
//!
//! ## Last Modified
//! v0.1.0 - Initial protocol definitions

pub mod messages;
pub mod version;

// Re-export primary types
pub use messages::{
    claimed_node_key, query_key, redact_node_key, Ack, EnrollRequest, EnrollResponse, Endpoint, LogRequest,
    LogType, NodeInvalidResponse, NodeRequest, ReadResponse, WriteRequest,
};
pub use version::{LogFormat, LOG_VERSION_FIELD};
