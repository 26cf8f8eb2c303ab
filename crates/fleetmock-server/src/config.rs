// ============================================
// File: crates/fleetmock-server/src/config.rs
// ============================================
//! # Server Configuration
//!
//! ## Creation Reason
//! Provides configuration management for the fleetmock server, supporting
//! a TOML file and command-line overrides.
//!
//! ## Main Functionality
//! - `ServerConfig`: Main configuration structure
//! - TOML file loading and parsing
//! - Configuration validation
//! - `CliOverrides`: Flags of the `start` command applied over the file
//! - Agent configuration document loading
//!
//! ## Configuration Sections
//! - `network`: HTTPS listen address
//! - `node`: The shared node key
//! - `agent`: Path of the JSON document served on `/config`
//! - `distributed`: Distributed queries and their cadence
//! - `tls`: Certificate cache location
//! - `sink`: Where result logs go
//! - `logging`: Log level, status log echo
//!
//! ## Example Configuration
//! ```toml
//! [network]
//! listen_addr = "0.0.0.0:8443"
//!
//! [node]
//! node_key = "mock-node-key"
//!
//! [agent]
//! config_path = "osquery.conf"
//!
//! [distributed]
//! queries = ["select * from osquery_info;"]
//! skip = 5
//! delay_secs = 12
//!
//! [tls]
//! cert_dir = "certs"
//!
//! [sink]
//! kind = "sqlite"
//! path = "fleetmock.db"
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - All config changes require server restart
//! - A configured agent document that is missing aborts startup
//! - `skip` below 1 is clamped to 1, not rejected
//!
//! ## Last Modified
//! v0.1.0 - Initial configuration implementation

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use fleetmock_common::types::{NodeKey, DEFAULT_NODE_KEY};

use crate::error::{Result, ServerError};

// ============================================
// ServerConfig
// ============================================

/// Main server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Network configuration.
    #[serde(default)]
    pub network: NetworkConfig,

    /// Node identity configuration.
    #[serde(default)]
    pub node: NodeConfig,

    /// Agent configuration document.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Distributed query cadence.
    #[serde(default)]
    pub distributed: DistributedConfig,

    /// TLS configuration.
    #[serde(default)]
    pub tls: TlsConfig,

    /// Result log sink.
    #[serde(default)]
    pub sink: SinkConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ServerConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        info!("Loading configuration from: {}", path_str);

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ServerError::config_load(&path_str, e.to_string()))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ServerError::config_load(&path_str, e.to_string()))?;

        config.validate()?;

        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Loads configuration from a string (useful for testing).
    ///
    /// # Errors
    /// Returns error if the content cannot be parsed or is invalid.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ServerError::config_load("<string>", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns `ConfigInvalid` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        self.network.validate()?;
        self.node.validate()?;
        self.tls.validate()?;
        self.sink.validate()?;
        Ok(())
    }

    /// Serializes configuration to TOML string.
    #[must_use]
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    /// Returns listen address (from network config).
    #[must_use]
    pub fn listen_addr(&self) -> SocketAddr {
        self.network.listen_addr
    }

    /// Returns the configured node key.
    #[must_use]
    pub fn node_key(&self) -> NodeKey {
        NodeKey::new(self.node.node_key.clone())
    }
}

// ============================================
// NetworkConfig
// ============================================

/// Network configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// HTTPS listen address.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 8443))
}

impl NetworkConfig {
    fn validate(&self) -> Result<()> {
        if self.listen_addr.port() == 0 {
            return Err(ServerError::config_invalid(
                "network.listen_addr",
                "port cannot be 0",
            ));
        }
        Ok(())
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

// ============================================
// NodeConfig
// ============================================

/// Node identity section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Node key handed out on enrollment and required afterwards.
    #[serde(default = "default_node_key")]
    pub node_key: String,
}

fn default_node_key() -> String {
    DEFAULT_NODE_KEY.to_string()
}

impl NodeConfig {
    fn validate(&self) -> Result<()> {
        if self.node_key.is_empty() {
            return Err(ServerError::config_invalid("node.node_key", "cannot be empty"));
        }
        Ok(())
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            node_key: default_node_key(),
        }
    }
}

// ============================================
// AgentConfig
// ============================================

/// Agent configuration document section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    /// JSON document returned on `/config`. `{}` when unset.
    #[serde(default)]
    pub config_path: Option<PathBuf>,
}

impl AgentConfig {
    /// Loads the agent configuration document.
    ///
    /// # Errors
    /// - `ConfigMissing` if a path is configured but does not exist
    /// - `ConfigLoad` if the file is not valid JSON
    /// - `ConfigInvalid` if the document is not a JSON object
    pub async fn load_document(&self) -> Result<Value> {
        let Some(path) = &self.config_path else {
            return Ok(Value::Object(serde_json::Map::new()));
        };
        let path_str = path.display().to_string();

        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            return Err(ServerError::ConfigMissing { path: path_str });
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ServerError::config_load(&path_str, e.to_string()))?;
        let document: Value = serde_json::from_str(&content)
            .map_err(|e| ServerError::config_load(&path_str, e.to_string()))?;

        if !document.is_object() {
            return Err(ServerError::config_invalid(
                "agent.config_path",
                "document must be a JSON object",
            ));
        }

        info!(path = %path_str, "Agent configuration loaded");
        Ok(document)
    }
}

// ============================================
// DistributedConfig
// ============================================

/// Distributed query section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributedConfig {
    /// Queries handed out in rotation.
    #[serde(default)]
    pub queries: Vec<String>,

    /// Completed empty polls before a query is handed out.
    #[serde(default = "default_skip")]
    pub skip: i64,

    /// Seconds an empty poll is held before it is answered.
    #[serde(default = "default_delay_secs")]
    pub delay_secs: u64,
}

fn default_skip() -> i64 {
    5
}

fn default_delay_secs() -> u64 {
    12
}

impl DistributedConfig {
    /// Returns the skip threshold, clamped to at least 1.
    #[must_use]
    pub fn skip_threshold(&self) -> u32 {
        if self.skip < 1 {
            warn!(skip = self.skip, "distributed.skip below 1, using 1");
            return 1;
        }
        u32::try_from(self.skip).unwrap_or(u32::MAX)
    }

    /// Returns the empty-poll delay.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}

impl Default for DistributedConfig {
    fn default() -> Self {
        Self {
            queries: Vec::new(),
            skip: default_skip(),
            delay_secs: default_delay_secs(),
        }
    }
}

// ============================================
// TlsConfig
// ============================================

/// TLS section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TlsConfig {
    /// Serve HTTPS. Plain HTTP when `false`.
    #[serde(default = "default_tls_enabled")]
    pub enabled: bool,

    /// Directory holding `cert.pem` and `key.pem`.
    #[serde(default = "default_cert_dir")]
    pub cert_dir: PathBuf,

    /// Common name of a generated certificate.
    #[serde(default = "default_common_name")]
    pub common_name: String,
}

fn default_tls_enabled() -> bool {
    true
}

fn default_cert_dir() -> PathBuf {
    PathBuf::from("certs")
}

fn default_common_name() -> String {
    "localhost".to_string()
}

impl TlsConfig {
    fn validate(&self) -> Result<()> {
        if self.enabled && self.common_name.trim().is_empty() {
            return Err(ServerError::config_invalid("tls.common_name", "cannot be empty"));
        }
        Ok(())
    }
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            enabled: default_tls_enabled(),
            cert_dir: default_cert_dir(),
            common_name: default_common_name(),
        }
    }
}

// ============================================
// SinkConfig
// ============================================

/// Destination of result logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Echo submissions to the log output only.
    #[default]
    Console,
    /// Store normalized records in a `SQLite` file.
    Sqlite,
}

/// Sink section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink kind.
    #[serde(default)]
    pub kind: SinkKind,

    /// Database file for the `sqlite` kind.
    #[serde(default = "default_sink_path")]
    pub path: PathBuf,
}

fn default_sink_path() -> PathBuf {
    PathBuf::from("fleetmock.db")
}

impl SinkConfig {
    fn validate(&self) -> Result<()> {
        if self.kind == SinkKind::Sqlite && self.path.as_os_str().is_empty() {
            return Err(ServerError::config_invalid("sink.path", "cannot be empty"));
        }
        Ok(())
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: SinkKind::default(),
            path: default_sink_path(),
        }
    }
}

// ============================================
// LoggingConfig
// ============================================

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Echo status logs from agents.
    #[serde(default)]
    pub echo_status: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            echo_status: false,
        }
    }
}

// ============================================
// CliOverrides
// ============================================

/// Command-line flags that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    /// Listen port.
    pub port: Option<u16>,
    /// Agent configuration document.
    pub conf: Option<PathBuf>,
    /// Distributed queries; replaces the file's list when non-empty.
    pub queries: Vec<String>,
    /// Skip threshold.
    pub skip: Option<i64>,
    /// Empty-poll delay in seconds.
    pub delay_secs: Option<u64>,
    /// Node key.
    pub node_key: Option<String>,
    /// Echo status logs.
    pub verbose: bool,
    /// Serve plain HTTP.
    pub insecure: bool,
}

impl CliOverrides {
    /// Applies the flags onto `config`.
    pub fn apply(self, config: &mut ServerConfig) {
        if let Some(port) = self.port {
            config.network.listen_addr.set_port(port);
        }
        if let Some(conf) = self.conf {
            config.agent.config_path = Some(conf);
        }
        if !self.queries.is_empty() {
            config.distributed.queries = self.queries;
        }
        if let Some(skip) = self.skip {
            config.distributed.skip = skip;
        }
        if let Some(delay) = self.delay_secs {
            config.distributed.delay_secs = delay;
        }
        if let Some(key) = self.node_key {
            config.node.node_key = key;
        }
        if self.verbose {
            config.logging.echo_status = true;
        }
        if self.insecure {
            config.tls.enabled = false;
        }
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.listen_addr().port(), 8443);
        assert_eq!(config.node.node_key, "mock-node-key");
        assert_eq!(config.distributed.skip_threshold(), 5);
        assert_eq!(config.distributed.delay(), Duration::from_secs(12));
        assert!(config.tls.enabled);
        assert_eq!(config.sink.kind, SinkKind::Console);
    }

    #[test]
    fn test_full_config_format() {
        let toml = r#"
            [network]
            listen_addr = "127.0.0.1:9443"

            [node]
            node_key = "abc"

            [agent]
            config_path = "osquery.conf"

            [distributed]
            queries = ["select 1;", "select 2;"]
            skip = 3
            delay_secs = 1

            [tls]
            enabled = false

            [sink]
            kind = "sqlite"
            path = "/tmp/records.db"

            [logging]
            level = "debug"
            echo_status = true
        "#;

        let config = ServerConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.listen_addr().port(), 9443);
        assert!(config.node_key().matches("abc"));
        assert_eq!(config.agent.config_path, Some(PathBuf::from("osquery.conf")));
        assert_eq!(config.distributed.queries.len(), 2);
        assert_eq!(config.distributed.skip_threshold(), 3);
        assert!(!config.tls.enabled);
        assert_eq!(config.sink.kind, SinkKind::Sqlite);
        assert!(config.logging.echo_status);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = ServerConfig::from_toml_str("[node]\nnode_key = \"k\"\n").unwrap();
        assert_eq!(config.listen_addr().port(), 8443);
        assert_eq!(config.distributed.delay_secs, 12);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(ServerConfig::from_toml_str("[node]\nnode_key = \"\"\n").is_err());
        assert!(ServerConfig::from_toml_str("[network]\nlisten_addr = \"0.0.0.0:0\"\n").is_err());
        assert!(ServerConfig::from_toml_str("[sink]\nkind = \"mongo\"\n").is_err());
    }

    #[test]
    fn test_skip_clamped() {
        let mut config = DistributedConfig::default();
        config.skip = 0;
        assert_eq!(config.skip_threshold(), 1);
        config.skip = -4;
        assert_eq!(config.skip_threshold(), 1);
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = ServerConfig::default();
        CliOverrides {
            port: Some(9000),
            conf: Some(PathBuf::from("agent.json")),
            queries: vec!["select 1;".into()],
            skip: Some(2),
            delay_secs: Some(0),
            node_key: Some("abc".into()),
            verbose: true,
            insecure: true,
        }
        .apply(&mut config);

        assert_eq!(config.listen_addr().port(), 9000);
        assert_eq!(config.agent.config_path, Some(PathBuf::from("agent.json")));
        assert_eq!(config.distributed.queries, ["select 1;"]);
        assert_eq!(config.distributed.skip, 2);
        assert_eq!(config.distributed.delay_secs, 0);
        assert_eq!(config.node.node_key, "abc");
        assert!(config.logging.echo_status);
        assert!(!config.tls.enabled);
    }

    #[test]
    fn test_empty_overrides_keep_file_values() {
        let mut config = ServerConfig::default();
        config.distributed.queries = vec!["select 1;".into()];
        CliOverrides::default().apply(&mut config);
        assert_eq!(config.distributed.queries.len(), 1);
        assert!(config.tls.enabled);
    }

    #[tokio::test]
    async fn test_agent_document_defaults_to_empty_object() {
        let doc = AgentConfig::default().load_document().await.unwrap();
        assert_eq!(doc, serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_agent_document_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("osquery.conf");
        std::fs::write(&path, r#"{"k": "v"}"#).unwrap();

        let agent = AgentConfig {
            config_path: Some(path),
        };
        assert_eq!(agent.load_document().await.unwrap(), serde_json::json!({"k": "v"}));
    }

    #[tokio::test]
    async fn test_agent_document_missing_is_fatal() {
        let agent = AgentConfig {
            config_path: Some(PathBuf::from("/nonexistent/osquery.conf")),
        };
        let err = agent.load_document().await.unwrap_err();
        assert!(matches!(err, ServerError::ConfigMissing { .. }));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_agent_document_must_be_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("list.json");
        std::fs::write(&path, "[1, 2]").unwrap();

        let agent = AgentConfig {
            config_path: Some(path),
        };
        assert!(agent.load_document().await.unwrap_err().is_config_error());
    }
}
