// ============================================
// File: crates/fleetmock-server/src/handlers/protocol.rs
// ============================================
//! # Protocol Handler
//!
//! ## Creation Reason
//! Implements the five remote API calls independently of HTTP, so they
//! can be driven directly in tests and wrapped by the axum layer.
//!
//! ## Request Processing
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  1. Echo the body ("Config: {...}")                         │
//! │                                                             │
//! │  2. Node key gate (all but enroll)          ──► 401         │
//! │                                                             │
//! │  3. Endpoint work                                           │
//! │     enroll  node key                                        │
//! │     config  agent configuration document                    │
//! │     log     status: echo only / result: normalize + sink    │
//! │     read    scheduler decision (may wait)                   │
//! │     write   summary only                                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Echoed bodies have `node_key` masked; rejections never log the key
//! - Sink failures never change the `/log` response
//! - Result logs are echoed by the pipeline, not here
//!
//! ## Last Modified
//! v0.1.0 - Initial protocol handler

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use fleetmock_core::error::CoreError;
use fleetmock_core::protocol::{
    redact_node_key, Ack, EnrollResponse, Endpoint, LogType, ReadResponse, WriteRequest,
};

use crate::error::Result;
use crate::services::{LogPipeline, NodeKeyGate, QueryScheduler};

// ============================================
// ProtocolHandler
// ============================================

/// Answers the remote API calls.
///
/// # Thread Safety
/// Shared behind an `Arc` by every request task.
pub struct ProtocolHandler {
    /// Node key gate.
    gate: NodeKeyGate,
    /// Document served on `/config`.
    agent_config: Arc<Value>,
    /// Distributed query cadence.
    scheduler: QueryScheduler,
    /// Result log destination.
    pipeline: LogPipeline,
    /// Echo status logs.
    echo_status: bool,
}

impl ProtocolHandler {
    /// Creates a new protocol handler.
    #[must_use]
    pub fn new(
        gate: NodeKeyGate,
        agent_config: Value,
        scheduler: QueryScheduler,
        pipeline: LogPipeline,
        echo_status: bool,
    ) -> Self {
        Self {
            gate,
            agent_config: Arc::new(agent_config),
            scheduler,
            pipeline,
            echo_status,
        }
    }

    /// Returns the scheduler.
    #[must_use]
    pub const fn scheduler(&self) -> &QueryScheduler {
        &self.scheduler
    }

    /// Handles `/enroll`. Always succeeds.
    #[must_use]
    pub fn enroll(&self, body: &Value) -> EnrollResponse {
        echo(Endpoint::Enroll, body);
        EnrollResponse::accepted(self.gate.node_key())
    }

    /// Handles `/config`.
    ///
    /// # Errors
    /// Returns `Unauthorized` on a node key mismatch.
    pub fn config(&self, body: &Value) -> Result<Value> {
        echo(Endpoint::Config, body);
        self.admit(Endpoint::Config, body)?;
        Ok(self.agent_config.as_ref().clone())
    }

    /// Handles `/log`.
    ///
    /// # Errors
    /// Returns `Unauthorized` on a node key mismatch, and a client error
    /// if the body is not an object or has no `log_type`.
    pub async fn log(&self, body: &Value) -> Result<Ack> {
        self.admit(Endpoint::Log, body)?;

        let Some(map) = body.as_object() else {
            return Err(CoreError::malformed("log submission must be a JSON object").into());
        };
        let log_type = LogType::from_body(body)?;

        if log_type.is_status() {
            if self.echo_status {
                echo(Endpoint::Log, body);
            } else {
                debug!("Status log received");
            }
            return Ok(Ack::default());
        }

        let report = self.pipeline.submit(map).await;
        debug!(
            log_type = %log_type,
            stored = report.stored(),
            skipped = report.skipped,
            "Result log processed"
        );
        Ok(Ack::default())
    }

    /// Handles `/read`. Waits when no query is due.
    ///
    /// # Errors
    /// Returns `Unauthorized` on a node key mismatch.
    pub async fn read(&self, body: &Value) -> Result<ReadResponse> {
        echo(Endpoint::Read, body);
        self.admit(Endpoint::Read, body)?;
        Ok(self.scheduler.poll().await)
    }

    /// Handles `/write`.
    ///
    /// # Errors
    /// Returns `Unauthorized` on a node key mismatch.
    pub fn write(&self, body: &Value) -> Result<Ack> {
        echo(Endpoint::Write, body);
        self.admit(Endpoint::Write, body)?;

        let request = WriteRequest::from_body(body);
        info!(
            queries = request.queries.len(),
            rows = request.row_count(),
            "Distributed query results received"
        );
        Ok(Ack::default())
    }

    fn admit(&self, endpoint: Endpoint, body: &Value) -> Result<()> {
        self.gate.check(body).map_err(|e| {
            warn!(endpoint = %endpoint, "Rejected request with invalid node key");
            e
        })
    }
}

fn echo(endpoint: Endpoint, body: &Value) {
    info!("{}: {}", endpoint.label(), loggable(body));
}

/// Pretty JSON of `body` with the claimed node key masked.
fn loggable(body: &Value) -> String {
    let pretty = match body.as_object() {
        Some(map) => serde_json::to_string_pretty(&redact_node_key(map)),
        None => serde_json::to_string_pretty(body),
    };
    pretty.unwrap_or_default()
}

impl std::fmt::Debug for ProtocolHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolHandler")
            .field("scheduler", &self.scheduler)
            .field("pipeline", &self.pipeline)
            .field("echo_status", &self.echo_status)
            .finish_non_exhaustive()
    }
}

// ============================================
// Tests
// ============================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServerError;
    use fleetmock_common::types::NodeKey;
    use fleetmock_sink::MemorySink;
    use serde_json::json;
    use std::time::Duration;

    fn handler_with(sink: Arc<MemorySink>, queries: Vec<String>) -> ProtocolHandler {
        ProtocolHandler::new(
            NodeKeyGate::new(NodeKey::new("abc")),
            json!({"k": "v"}),
            QueryScheduler::new(queries, 2, Duration::ZERO),
            LogPipeline::with_sink(sink),
            false,
        )
    }

    fn handler() -> ProtocolHandler {
        handler_with(Arc::new(MemorySink::new()), vec!["select 1;".into()])
    }

    #[test]
    fn test_enroll_returns_node_key() {
        let response = handler().enroll(&json!({"enroll_secret": "anything"}));
        assert_eq!(response.node_key, "abc");
        assert!(!response.node_invalid);
    }

    #[test]
    fn test_config_returns_document() {
        let doc = handler().config(&json!({"node_key": "abc"})).unwrap();
        assert_eq!(doc, json!({"k": "v"}));
    }

    #[tokio::test]
    async fn test_gated_endpoints_reject_wrong_key() {
        let handler = handler();
        let body = json!({"node_key": "xyz", "log_type": "result", "data": []});

        assert!(matches!(handler.config(&body), Err(ServerError::Unauthorized)));
        assert!(matches!(handler.log(&body).await, Err(ServerError::Unauthorized)));
        assert!(matches!(handler.read(&body).await, Err(ServerError::Unauthorized)));
        assert!(matches!(handler.write(&body), Err(ServerError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_result_log_is_stored() {
        let sink = Arc::new(MemorySink::new());
        let handler = handler_with(sink.clone(), Vec::new());

        let ack = handler
            .log(&json!({
                "node_key": "abc",
                "log_type": "result",
                "data": [{"name": "t1", "columns": {"x": 1}}]
            }))
            .await
            .unwrap();

        assert_eq!(serde_json::to_value(ack).unwrap(), json!({}));
        let records = sink.records("t1");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].fields, *json!({"x": 1}).as_object().unwrap());
    }

    #[tokio::test]
    async fn test_status_log_not_stored() {
        let sink = Arc::new(MemorySink::new());
        let handler = handler_with(sink.clone(), Vec::new());

        handler
            .log(&json!({
                "node_key": "abc",
                "log_type": "status",
                "data": [{"name": "t1", "columns": {"x": 1}}]
            }))
            .await
            .unwrap();

        assert_eq!(sink.batch_count(), 0);
    }

    #[tokio::test]
    async fn test_log_without_type_rejected() {
        let err = handler()
            .log(&json!({"node_key": "abc", "data": []}))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_sink_failure_still_acks() {
        let sink = Arc::new(MemorySink::new());
        sink.fail_collection("t1");
        let handler = handler_with(sink, Vec::new());

        let result = handler
            .log(&json!({
                "node_key": "abc",
                "log_type": "result",
                "data": [{"name": "t1", "columns": {"x": 1}}]
            }))
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_read_follows_cadence() {
        let handler = handler();
        let body = json!({"node_key": "abc"});

        assert!(handler.read(&body).await.unwrap().is_empty());
        let response = handler.read(&body).await.unwrap();
        assert_eq!(response.queries["query0"], "select 1;");
    }

    #[test]
    fn test_echo_masks_node_key() {
        let logged = loggable(&json!({"node_key": "secret-key", "log_type": "status"}));
        assert!(!logged.contains("secret-key"));
        assert!(logged.contains("<redacted>"));
        assert!(logged.contains("status"));

        assert_eq!(loggable(&json!([1])), "[\n  1\n]");
    }

    #[test]
    fn test_write_acks() {
        let ack = handler()
            .write(&json!({
                "node_key": "abc",
                "queries": {"query0": [{"a": "1"}]},
                "statuses": {"query0": 0}
            }))
            .unwrap();
        assert_eq!(serde_json::to_value(ack).unwrap(), json!({}));
    }
}
