// ============================================
// File: crates/fleetmock-server/src/probe/client.rs
// ============================================
//! # Probe Client
//!
//! ## Creation Reason
//! Plays the agent side of the remote API, for manual checks against a
//! running mock and for end-to-end tests.
//!
//! ## Main Functionality
//! - `enroll()`: Obtains and remembers the node key
//! - `config()`, `submit_log()`, `read()`, `write()`: Gated calls
//!
//! ## ⚠️ Important Note for Next Developer
//! - `accept_invalid_certs` disables certificate verification; only for
//!   the mock's own self-signed certificate
//! - A 401 maps to `ServerError::Unauthorized`
//!
//! ## Last Modified
//! v0.1.0 - Initial probe client

use std::time::Duration;

use parking_lot::RwLock;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use fleetmock_core::protocol::{
    Ack, EnrollRequest, EnrollResponse, Endpoint, LogRequest, LogType, NodeRequest, ReadResponse,
    WriteRequest,
};

use crate::error::{Result, ServerError};

/// Agent-side client for the remote API.
pub struct ProbeClient {
    base_url: String,
    http: Client,
    node_key: RwLock<String>,
}

impl ProbeClient {
    /// Creates a client for `base_url` (e.g. `https://localhost:8443`).
    ///
    /// # Errors
    /// Returns `Internal` if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, accept_invalid_certs: bool, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(|e| ServerError::internal(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
            node_key: RwLock::new(String::new()),
        })
    }

    /// Returns the node key in use.
    #[must_use]
    pub fn node_key(&self) -> String {
        self.node_key.read().clone()
    }

    /// Overrides the node key (e.g. to probe the gate).
    pub fn set_node_key(&self, key: impl Into<String>) {
        *self.node_key.write() = key.into();
    }

    /// Enrolls and remembers the returned node key.
    ///
    /// # Errors
    /// Returns `Probe` on transport or decoding failures.
    pub async fn enroll(&self, host_identifier: &str) -> Result<EnrollResponse> {
        let request = EnrollRequest {
            enroll_secret: None,
            host_identifier: Some(host_identifier.to_string()),
        };
        let response: EnrollResponse = self.post(Endpoint::Enroll, &request).await?;
        self.set_node_key(response.node_key.clone());

        info!(node_invalid = response.node_invalid, "Enrolled");
        Ok(response)
    }

    /// Fetches the agent configuration document.
    ///
    /// # Errors
    /// Returns `Unauthorized` on a rejected key and `Probe` otherwise.
    pub async fn config(&self) -> Result<Value> {
        self.post(Endpoint::Config, &NodeRequest::new(self.node_key())).await
    }

    /// Submits a log.
    ///
    /// # Errors
    /// Returns `Unauthorized` on a rejected key and `Probe` otherwise.
    pub async fn submit_log(&self, log_type: LogType, data: Value) -> Result<Ack> {
        let request = LogRequest {
            node_key: self.node_key(),
            log_type,
            log_version: None,
            data,
        };
        self.post(Endpoint::Log, &request).await
    }

    /// Polls for distributed queries.
    ///
    /// # Errors
    /// Returns `Unauthorized` on a rejected key and `Probe` otherwise.
    pub async fn read(&self) -> Result<ReadResponse> {
        self.post(Endpoint::Read, &NodeRequest::new(self.node_key())).await
    }

    /// Answers a distributed query with `rows` and a status code.
    ///
    /// # Errors
    /// Returns `Unauthorized` on a rejected key and `Probe` otherwise.
    pub async fn write(&self, key: &str, rows: Vec<Value>, status: i64) -> Result<Ack> {
        let mut queries = Map::new();
        queries.insert(key.to_string(), Value::Array(rows));
        let mut statuses = Map::new();
        statuses.insert(key.to_string(), json!(status));

        let request = WriteRequest {
            node_key: self.node_key(),
            queries,
            statuses,
        };
        self.post(Endpoint::Write, &request).await
    }

    async fn post<B, R>(&self, endpoint: Endpoint, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, endpoint.path());
        debug!(url = %url, "POST");

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ServerError::probe(endpoint.label(), format!("request failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ServerError::Unauthorized);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ServerError::probe(endpoint.label(), format!("status {status}: {text}")));
        }

        response
            .json()
            .await
            .map_err(|e| ServerError::probe(endpoint.label(), format!("parse failed: {e}")))
    }
}

impl std::fmt::Debug for ProbeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
