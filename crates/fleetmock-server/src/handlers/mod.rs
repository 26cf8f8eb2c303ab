// ============================================
// File: crates/fleetmock-server/src/handlers/mod.rs
// ============================================
//! # Request Handlers
//!
//! ## Creation Reason
//! Provides the remote API request processing and its HTTP binding.
//!
//! ## Main Functionality
//!
//! ### Submodules
//! - [`protocol`]: The five calls, independent of HTTP
//! - [`http`]: axum router over `ProtocolHandler`
//!
//! ## Handler Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Handlers                                │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │   POST /enroll /config /log /read /write   (http::router)   │
//! │                         │                                   │
//! │                         ▼                                   │
//! │  ┌───────────────────────────────────────────────────────┐ │
//! │  │                 ProtocolHandler                       │ │
//! │  │   NodeKeyGate · QueryScheduler · LogPipeline          │ │
//! │  └───────────────────────────────────────────────────────┘ │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Keep HTTP concerns in `http`; `protocol` must stay testable
//!   without a server
//!
//! ## Last Modified
//! v0.1.0 - Initial handlers structure

pub mod http;
pub mod protocol;

pub use http::router;
pub use protocol::ProtocolHandler;
