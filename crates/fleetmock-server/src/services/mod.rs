// ============================================
// File: crates/fleetmock-server/src/services/mod.rs
// ============================================
//! # Server Services
//!
//! ## Creation Reason
//! Holds the decision logic behind the endpoints, separated from HTTP
//! and protocol concerns.
//!
//! ## Main Functionality
//!
//! ### Submodules
//! - [`gate`]: Node key check for the gated endpoints
//! - [`scheduler`]: Distributed query cadence
//! - [`pipeline`]: Result log normalization and storage
//!
//! ## Service Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Service Layer                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌─────────────────┐   ┌─────────────────────────────────┐ │
//! │  │  NodeKeyGate     │   │      QueryScheduler             │ │
//! │  │                  │   │  - Counter / rotation state    │ │
//! │  │  - Exact match   │   │  - Held empty polls            │ │
//! │  └─────────────────┘   └─────────────────────────────────┘ │
//! │                                                             │
//! │  ┌─────────────────────────────────────────────────────────┐ │
//! │  │  LogPipeline  normalize ──► LogSink (per table batch)   │ │
//! │  └─────────────────────────────────────────────────────────┘ │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Services are shared across request tasks; keep them Send + Sync
//! - The gate runs before any other service sees a request
//!
//! ## Last Modified
//! v0.1.0 - Initial services structure

pub mod gate;
pub mod pipeline;
pub mod scheduler;

// Re-export primary types
pub use gate::NodeKeyGate;
pub use pipeline::{LogPipeline, SubmitReport, TableOutcome};
pub use scheduler::{CadenceState, QueryScheduler};
