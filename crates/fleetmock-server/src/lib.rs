// ============================================
// File: crates/fleetmock-server/src/lib.rs
// ============================================
//! # Fleetmock Server Library
//!
//! ## Creation Reason
//! Provides a mock host-management remote API server that endpoint agents
//! can enroll with, fetch configuration from, ship logs to and poll for
//! distributed queries, for agent development and testing.
//!
//! ## Main Functionality
//!
//! ### Modules
//! - [`config`]: Server configuration management
//! - [`server`]: Main server orchestration
//! - [`services`]: Business logic services
//!   - [`services::gate`]: Node key check
//!   - [`services::scheduler`]: Distributed query cadence
//!   - [`services::pipeline`]: Result log storage
//! - [`handlers`]: Remote API handlers and HTTP routes
//! - [`tls`]: Self-signed certificate management
//! - [`probe`]: Agent-side client for manual and end-to-end checks
//! - [`error`]: Server-specific error types
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Fleetmock Server                          │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌─────────────┐     ┌─────────────┐     ┌─────────────────┐  │
//! │  │   Config    │────►│   Server    │────►│    Handlers     │  │
//! │  │  Manager    │     │ Orchestrator│     │ (axum routes)   │  │
//! │  └─────────────┘     └──────┬──────┘     └────────┬────────┘  │
//! │                             │                     │           │
//! │         ┌───────────────────┼───────────────────┬─┘           │
//! │         ▼                   ▼                   ▼             │
//! │  ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     │
//! │  │ NodeKeyGate │     │   Query     │     │    Log      │     │
//! │  │             │     │  Scheduler  │     │  Pipeline   │     │
//! │  └─────────────┘     └─────────────┘     └──────┬──────┘     │
//! │                                                  │            │
//! ├──────────────────────────────────────────────────┼────────────┤
//! │                     Sink Layer                   ▼            │
//! │  ┌─────────────────────┐     ┌─────────────────────────────┐ │
//! │  │   Console (echo)    │     │       SqliteSink            │ │
//! │  └─────────────────────┘     └─────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Data Flow
//! ```text
//! Agent → HTTPS → Gate → Normalize → Sink
//! Agent ← HTTPS ← Gate ← Scheduler (held poll / query)
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Configuration changes require restart (no hot-reload)
//! - The node key is a shared secret, not per-agent identity
//! - Status logs are never stored
//!
//! ## Last Modified
//! v0.1.0 - Initial server library

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod probe;
pub mod server;
pub mod services;
pub mod tls;

// Re-export primary types
pub use config::{CliOverrides, ServerConfig};
pub use error::{Result, ServerError};
pub use probe::{ProbeClient, ReadPoller};
pub use server::Server;
