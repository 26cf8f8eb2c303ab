// ============================================
// File: crates/fleetmock-server/src/tls/cert.rs
// ============================================
//! # Certificate Provider
//!
//! ## Creation Reason
//! Agents only talk HTTPS. The mock serves a self-signed certificate that
//! is generated once and reused, so an agent can pin it across restarts.
//!
//! ## Main Functionality
//! - `CertProvider::load_or_generate()`: Cached or fresh PEM pair
//! - `fingerprint()`: SHA-256 of the certificate DER, hex encoded
//!
//! ## Files
//! ```text
//! <cert_dir>/
//! ├── cert.pem   self-signed certificate
//! └── key.pem    PKCS#8 private key (0600 on Unix)
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - A directory holding only one of the two files is regenerated
//! - Agents must be pointed at `cert.pem` (or told to skip verification)
//!
//! ## Last Modified
//! v0.1.0 - Initial certificate provider

use std::path::{Path, PathBuf};

use rcgen::{CertificateParams, DnType, DnValue, KeyPair};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::config::TlsConfig;
use crate::error::{Result, ServerError};

/// Certificate file name inside the cert directory.
pub const CERT_FILE: &str = "cert.pem";

/// Private key file name inside the cert directory.
pub const KEY_FILE: &str = "key.pem";

// ============================================
// CertifiedPem
// ============================================

/// A certificate and its key, PEM encoded.
#[derive(Clone)]
pub struct CertifiedPem {
    /// Certificate chain (one self-signed certificate).
    pub cert_pem: String,
    /// Private key.
    pub key_pem: String,
    /// SHA-256 fingerprint of the certificate, hex.
    pub fingerprint: String,
    /// `true` if the pair was generated by this call.
    pub generated: bool,
}

impl std::fmt::Debug for CertifiedPem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertifiedPem")
            .field("fingerprint", &self.fingerprint)
            .field("generated", &self.generated)
            .finish_non_exhaustive()
    }
}

// ============================================
// CertProvider
// ============================================

/// Loads or generates the server certificate.
#[derive(Debug, Clone)]
pub struct CertProvider {
    cert_dir: PathBuf,
    common_name: String,
}

impl CertProvider {
    /// Creates a provider for `cert_dir`.
    #[must_use]
    pub fn new(cert_dir: impl Into<PathBuf>, common_name: impl Into<String>) -> Self {
        Self {
            cert_dir: cert_dir.into(),
            common_name: common_name.into(),
        }
    }

    /// Creates a provider from the TLS config section.
    #[must_use]
    pub fn from_config(config: &TlsConfig) -> Self {
        Self::new(config.cert_dir.clone(), config.common_name.clone())
    }

    /// Path of the certificate file.
    #[must_use]
    pub fn cert_path(&self) -> PathBuf {
        self.cert_dir.join(CERT_FILE)
    }

    /// Path of the private key file.
    #[must_use]
    pub fn key_path(&self) -> PathBuf {
        self.cert_dir.join(KEY_FILE)
    }

    /// Loads the cached pair, or generates and caches a new one.
    ///
    /// # Errors
    /// Returns `Tls` if generation fails or the cached certificate is
    /// unreadable, and `Io` if the files cannot be read or written.
    pub async fn load_or_generate(&self) -> Result<CertifiedPem> {
        let cert_path = self.cert_path();
        let key_path = self.key_path();
        let cert_exists = tokio::fs::try_exists(&cert_path).await.unwrap_or(false);
        let key_exists = tokio::fs::try_exists(&key_path).await.unwrap_or(false);

        if cert_exists && key_exists {
            let cert_pem = tokio::fs::read_to_string(&cert_path).await?;
            let key_pem = tokio::fs::read_to_string(&key_path).await?;
            let fingerprint = fingerprint(&cert_pem)?;

            info!(
                path = %cert_path.display(),
                fingerprint = %fingerprint,
                "Loaded TLS certificate"
            );
            return Ok(CertifiedPem {
                cert_pem,
                key_pem,
                fingerprint,
                generated: false,
            });
        }

        if cert_exists || key_exists {
            warn!(dir = %self.cert_dir.display(), "Incomplete certificate pair, regenerating");
        }

        let (cert_pem, key_pem) = generate_self_signed(&self.common_name)?;
        let fingerprint = fingerprint(&cert_pem)?;

        tokio::fs::create_dir_all(&self.cert_dir).await?;
        tokio::fs::write(&cert_path, &cert_pem).await?;
        write_private(&key_path, &key_pem).await?;

        info!(
            path = %cert_path.display(),
            common_name = %self.common_name,
            fingerprint = %fingerprint,
            "Generated self-signed TLS certificate"
        );
        Ok(CertifiedPem {
            cert_pem,
            key_pem,
            fingerprint,
            generated: true,
        })
    }
}

// ============================================
// Helpers
// ============================================

/// Generates a self-signed certificate for `common_name`.
///
/// Returns `(cert_pem, key_pem)`.
fn generate_self_signed(common_name: &str) -> Result<(String, String)> {
    let mut names = vec![common_name.to_string()];
    if common_name != "127.0.0.1" {
        names.push("127.0.0.1".to_string());
    }

    let mut params = CertificateParams::new(names).map_err(|e| ServerError::tls(e.to_string()))?;
    params.distinguished_name.push(
        DnType::CommonName,
        DnValue::Utf8String(common_name.to_string()),
    );

    let key_pair = KeyPair::generate().map_err(|e| ServerError::tls(e.to_string()))?;
    let cert = params
        .self_signed(&key_pair)
        .map_err(|e| ServerError::tls(e.to_string()))?;

    Ok((cert.pem(), key_pair.serialize_pem()))
}

/// Returns the SHA-256 fingerprint of the first certificate in `cert_pem`.
///
/// # Errors
/// Returns `Tls` if no certificate can be parsed.
pub fn fingerprint(cert_pem: &str) -> Result<String> {
    let mut reader = std::io::BufReader::new(cert_pem.as_bytes());
    let der = rustls_pemfile::certs(&mut reader)
        .next()
        .ok_or_else(|| ServerError::tls("no certificate found in PEM"))?
        .map_err(|e| ServerError::tls(format!("invalid certificate PEM: {e}")))?;

    Ok(hex::encode(Sha256::digest(&*der)))
}

/// Writes a file readable by the owner only.
async fn write_private(path: &Path, content: &str) -> Result<()> {
    tokio::fs::write(path, content).await?;

    // Set restrictive permissions on Unix
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = tokio::fs::metadata(path).await?.permissions();
        perms.set_mode(0o600);
        tokio::fs::set_permissions(path, perms).await?;
    }

    Ok(())
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_generate_then_reload() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CertProvider::new(dir.path().join("certs"), "localhost");

        let first = provider.load_or_generate().await.unwrap();
        assert!(first.generated);
        assert!(first.cert_pem.contains("BEGIN CERTIFICATE"));
        assert!(first.key_pem.contains("PRIVATE KEY"));
        assert_eq!(first.fingerprint.len(), 64);
        assert!(provider.cert_path().exists());

        let second = provider.load_or_generate().await.unwrap();
        assert!(!second.generated);
        assert_eq!(second.fingerprint, first.fingerprint);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_key_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let provider = CertProvider::new(dir.path(), "localhost");
        provider.load_or_generate().await.unwrap();

        let mode = std::fs::metadata(provider.key_path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn test_incomplete_pair_regenerated() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CertProvider::new(dir.path(), "localhost");
        let first = provider.load_or_generate().await.unwrap();

        std::fs::remove_file(provider.key_path()).unwrap();
        let second = provider.load_or_generate().await.unwrap();
        assert!(second.generated);
        assert_ne!(second.fingerprint, first.fingerprint);
    }

    #[test]
    fn test_fingerprint_rejects_garbage() {
        assert!(fingerprint("not a certificate").is_err());
    }
}
