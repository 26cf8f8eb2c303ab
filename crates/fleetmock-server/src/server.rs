// ============================================
// File: crates/fleetmock-server/src/server.rs
// ============================================
//! # Server Orchestrator
//!
//! ## Creation Reason
//! Main server implementation that wires the services to the HTTP layer
//! and manages the server lifecycle.
//!
//! ## Main Functionality
//! - `Server`: Main server struct and lifecycle management
//! - Component initialization and wiring
//! - TLS or plain HTTP listener
//! - Graceful shutdown handling
//!
//! ## Server Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Server                              │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌──────────────────┐      ┌─────────────────────────────┐ │
//! │  │ Shutdown watcher │─────►│ axum-server (rustls / plain)│ │
//! │  │ Ctrl+C / signal  │      │   handle.graceful_shutdown  │ │
//! │  └──────────────────┘      └──────────────┬──────────────┘ │
//! │                                            ▼                │
//! │                            ┌─────────────────────────────┐ │
//! │                            │  router → ProtocolHandler   │ │
//! │                            └──────────────┬──────────────┘ │
//! │                                            ▼                │
//! │  ┌─────────────────────────────────────────────────────┐   │
//! │  │                    Services                          │   │
//! │  │  ┌──────────┐ ┌────────────────┐ ┌───────────────┐  │   │
//! │  │  │   Gate   │ │ QueryScheduler │ │  LogPipeline  │  │   │
//! │  │  └──────────┘ └────────────────┘ └───────────────┘  │   │
//! │  └─────────────────────────────────────────────────────┘   │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - A missing agent configuration document aborts `run()` before binding
//! - Held `/read` polls get the grace period, then are dropped
//! - `shutdown()` before `run()` has subscribed is lost
//!
//! ## Last Modified
//! v0.1.0 - Initial server implementation

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use fleetmock_sink::SqliteSink;

use crate::config::{ServerConfig, SinkKind};
use crate::error::{Result, ServerError};
use crate::handlers::{router, ProtocolHandler};
use crate::services::{LogPipeline, NodeKeyGate, QueryScheduler};
use crate::tls::{install_crypto_provider, CertProvider};

/// Time in-flight requests get to finish on shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

// ============================================
// Server
// ============================================

/// Main fleetmock server.
///
/// # Lifecycle
/// 1. Create with `Server::new(config)`
/// 2. Start with `server.run().await`
/// 3. Shutdown via `shutdown()` or Ctrl+C
pub struct Server {
    /// Server configuration.
    config: ServerConfig,
    /// Listener handle.
    handle: Handle,
    /// Shutdown signal sender.
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Creates a new server instance.
    #[must_use]
    pub fn new(config: ServerConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            handle: Handle::new(),
            shutdown_tx,
        }
    }

    /// Runs the server until shutdown.
    ///
    /// # Errors
    /// Returns error if the agent configuration, sink or certificate
    /// cannot be set up, or the listener fails.
    pub async fn run(&self) -> Result<()> {
        info!("Starting fleetmock server v{}", env!("CARGO_PKG_VERSION"));

        let handler = self.build_handler().await?;
        let app = router(handler);
        let addr = self.config.listen_addr();

        let watcher = self.spawn_shutdown_watcher();

        let served = if self.config.tls.enabled {
            install_crypto_provider();
            let pem = CertProvider::from_config(&self.config.tls)
                .load_or_generate()
                .await?;
            let tls = RustlsConfig::from_pem(pem.cert_pem.into_bytes(), pem.key_pem.into_bytes())
                .await
                .map_err(|e| ServerError::tls(e.to_string()))?;

            info!("Listening on https://{}", addr);
            axum_server::bind_rustls(addr, tls)
                .handle(self.handle.clone())
                .serve(app.into_make_service())
                .await
        } else {
            warn!("TLS disabled, serving plain HTTP on {}", addr);
            axum_server::bind(addr)
                .handle(self.handle.clone())
                .serve(app.into_make_service())
                .await
        };

        watcher.abort();
        served.map_err(|e| ServerError::startup_failed(format!("listener on {addr} failed: {e}")))?;

        info!("Server shutdown complete");
        Ok(())
    }

    /// Builds the protocol handler and its services from the config.
    ///
    /// # Errors
    /// Returns `ConfigMissing`/`ConfigLoad`/`ConfigInvalid` for a bad agent
    /// configuration document and `Sink` if the database cannot be opened.
    pub async fn build_handler(&self) -> Result<Arc<ProtocolHandler>> {
        let agent_config = self.config.agent.load_document().await?;

        let pipeline = match self.config.sink.kind {
            SinkKind::Console => LogPipeline::console(),
            SinkKind::Sqlite => {
                let sink = SqliteSink::open(&self.config.sink.path)?;
                LogPipeline::with_sink(Arc::new(sink))
            }
        };

        let distributed = &self.config.distributed;
        let scheduler = QueryScheduler::new(
            distributed.queries.clone(),
            distributed.skip_threshold(),
            distributed.delay(),
        );

        info!(
            queries = scheduler.queries().len(),
            skip = scheduler.skip_threshold(),
            delay_secs = distributed.delay_secs,
            sink = ?self.config.sink.kind,
            "Services initialized"
        );

        Ok(Arc::new(ProtocolHandler::new(
            NodeKeyGate::new(self.config.node_key()),
            agent_config,
            scheduler,
            pipeline,
            self.config.logging.echo_status,
        )))
    }

    /// Waits until the listener is bound and returns its address.
    ///
    /// Returns `None` if the listener failed to bind.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.handle.listening().await
    }

    /// Spawns the task that turns a shutdown signal into a graceful stop.
    fn spawn_shutdown_watcher(&self) -> JoinHandle<()> {
        let handle = self.handle.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            tokio::select! {
                result = tokio::signal::ctrl_c() => match result {
                    Ok(()) => info!("Received shutdown signal"),
                    Err(e) => {
                        error!("Failed to listen for Ctrl+C: {}", e);
                        let _ = shutdown_rx.recv().await;
                    }
                },
                _ = shutdown_rx.recv() => info!("Shutdown requested"),
            }

            info!("Shutting down server...");
            handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        })
    }

    /// Triggers server shutdown programmatically.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("listen_addr", &self.config.network.listen_addr)
            .field("tls", &self.config.tls.enabled)
            .field("sink", &self.config.sink.kind)
            .finish()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{ProbeClient, ReadPoller};
    use fleetmock_core::protocol::LogType;
    use serde_json::json;
    use std::path::PathBuf;

    fn test_config(dir: &std::path::Path) -> ServerConfig {
        let agent_path = dir.join("osquery.conf");
        std::fs::write(&agent_path, r#"{"k": "v"}"#).unwrap();

        let mut config = ServerConfig::default();
        config.network.listen_addr = SocketAddr::from(([127, 0, 0, 1], 0));
        config.node.node_key = "abc".into();
        config.agent.config_path = Some(agent_path);
        config.distributed.queries = vec!["select * from osquery_info;".into()];
        config.distributed.skip = 2;
        config.distributed.delay_secs = 0;
        config.tls.enabled = false;
        config.sink.kind = SinkKind::Sqlite;
        config.sink.path = dir.join("records.db");
        config
    }

    #[tokio::test]
    async fn test_end_to_end_agent_session() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let db_path = config.sink.path.clone();

        let server = Arc::new(Server::new(config));
        let task = {
            let server = Arc::clone(&server);
            tokio::spawn(async move { server.run().await })
        };
        let addr = server.local_addr().await.unwrap();

        let client = Arc::new(
            ProbeClient::new(format!("http://{addr}"), false, Duration::from_secs(5)).unwrap(),
        );

        let enrolled = client.enroll("test-host").await.unwrap();
        assert_eq!(enrolled.node_key, "abc");
        assert!(!enrolled.node_invalid);

        assert_eq!(client.config().await.unwrap(), json!({"k": "v"}));

        client
            .submit_log(LogType::Result, json!([{"name": "t1", "columns": {"x": 1}}]))
            .await
            .unwrap();
        let stored = SqliteSink::open(&db_path).unwrap();
        let docs = stored.documents("t1").await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0]["x"], 1);

        assert!(client.read().await.unwrap().is_empty());
        let emitted = client.read().await.unwrap();
        assert_eq!(emitted.queries["query0"], "select * from osquery_info;");
        client.write("query0", vec![json!({"version": "5.0"})], 0).await.unwrap();

        let (_tx, rx) = broadcast::channel(1);
        let received = ReadPoller::new(Arc::clone(&client), Duration::ZERO, 1)
            .run(rx)
            .await
            .unwrap();
        assert_eq!(received, [("query0".to_string(), "select * from osquery_info;".to_string())]);

        client.set_node_key("xyz");
        assert!(matches!(client.config().await, Err(ServerError::Unauthorized)));
        assert!(matches!(client.read().await, Err(ServerError::Unauthorized)));

        server.shutdown();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_missing_agent_config_aborts_startup() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.agent.config_path = Some(PathBuf::from("/nonexistent/osquery.conf"));

        let err = Server::new(config).run().await.unwrap_err();
        assert!(matches!(err, ServerError::ConfigMissing { .. }));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_console_sink_handler() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.sink.kind = SinkKind::Console;

        let handler = Server::new(config).build_handler().await.unwrap();
        assert_eq!(handler.scheduler().skip_threshold(), 2);
        assert!(!dir.path().join("records.db").exists());
    }
}
