// ============================================
// File: crates/fleetmock-server/src/tls/mod.rs
// ============================================
//! # TLS
//!
//! ## Main Functionality
//! - [`cert`]: Self-signed certificate cache
//! - `install_crypto_provider()`: Process-wide rustls provider
//!
//! ## ⚠️ Important Note for Next Developer
//! - The provider must be installed before any rustls config is built,
//!   otherwise rustls panics
//!
//! ## Last Modified
//! v0.1.0 - Initial TLS module

pub mod cert;

pub use cert::{fingerprint, CertProvider, CertifiedPem};

/// Installs the `ring` crypto provider for rustls.
///
/// Safe to call more than once.
pub fn install_crypto_provider() {
    // Err only means a provider is already installed
    rustls::crypto::ring::default_provider()
        .install_default()
        .ok();
}
