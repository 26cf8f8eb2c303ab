// ============================================
// File: crates/fleetmock-server/src/probe/mod.rs
// ============================================
//! # Probe
//!
//! Agent-side tooling for exercising a running server.
//!
//! Main Components:
//!   - ProbeClient: The five remote API calls over HTTPS
//!   - ReadPoller: Distributed query poll loop
//!
//! Last Modified: v0.1.0 - Initial probe module
// ============================================

pub mod client;
pub mod poller;

pub use client::ProbeClient;
pub use poller::ReadPoller;
