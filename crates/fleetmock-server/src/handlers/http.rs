// ============================================
// File: crates/fleetmock-server/src/handlers/http.rs
// ============================================
//! # HTTP Routes
//!
//! ## Creation Reason
//! Binds the protocol handler to the five POST routes.
//!
//! ## ⚠️ Important Note for Next Developer
//! - Non-JSON bodies are rejected by the `Json` extractor before any
//!   handler runs, so the gate never sees them
//! - Error bodies come from `ServerError::into_response`
//!
//! ## Last Modified
//! v0.1.0 - Initial axum router

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;

use fleetmock_core::protocol::{Ack, EnrollResponse, Endpoint, ReadResponse};

use crate::error::ServerError;
use crate::handlers::protocol::ProtocolHandler;

type Shared = State<Arc<ProtocolHandler>>;

/// Builds the application router.
pub fn router(handler: Arc<ProtocolHandler>) -> Router {
    Router::new()
        .route(Endpoint::Enroll.path(), post(enroll))
        .route(Endpoint::Config.path(), post(config))
        .route(Endpoint::Log.path(), post(log))
        .route(Endpoint::Read.path(), post(read))
        .route(Endpoint::Write.path(), post(write))
        .with_state(handler)
}

async fn enroll(State(handler): Shared, Json(body): Json<Value>) -> Json<EnrollResponse> {
    Json(handler.enroll(&body))
}

async fn config(
    State(handler): Shared,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ServerError> {
    handler.config(&body).map(Json)
}

async fn log(State(handler): Shared, Json(body): Json<Value>) -> Result<Json<Ack>, ServerError> {
    handler.log(&body).await.map(Json)
}

async fn read(
    State(handler): Shared,
    Json(body): Json<Value>,
) -> Result<Json<ReadResponse>, ServerError> {
    handler.read(&body).await.map(Json)
}

async fn write(State(handler): Shared, Json(body): Json<Value>) -> Result<Json<Ack>, ServerError> {
    handler.write(&body).map(Json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{LogPipeline, NodeKeyGate, QueryScheduler};
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use fleetmock_common::types::NodeKey;
    use serde_json::json;
    use std::time::Duration;

    fn shared() -> Arc<ProtocolHandler> {
        Arc::new(ProtocolHandler::new(
            NodeKeyGate::new(NodeKey::new("abc")),
            json!({"k": "v"}),
            QueryScheduler::new(Vec::new(), 1, Duration::ZERO),
            LogPipeline::console(),
            false,
        ))
    }

    #[tokio::test]
    async fn test_config_route_statuses() {
        let ok = config(State(shared()), Json(json!({"node_key": "abc"})))
            .await
            .into_response();
        assert_eq!(ok.status(), StatusCode::OK);

        let rejected = config(State(shared()), Json(json!({"node_key": "xyz"})))
            .await
            .into_response();
        assert_eq!(rejected.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_log_route_missing_type() {
        let response = log(State(shared()), Json(json!({"node_key": "abc"})))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_router_builds() {
        let _router: Router = router(shared());
    }
}
