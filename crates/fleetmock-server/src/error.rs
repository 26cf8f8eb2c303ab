// ============================================
// File: crates/fleetmock-server/src/error.rs
// ============================================
//! # Server Error Types
//!
//! ## Last Modified
//! v0.1.0 - Initial error definitions, HTTP status mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use fleetmock_common::error::CommonError;
use fleetmock_core::error::CoreError;
use fleetmock_core::protocol::NodeInvalidResponse;
use fleetmock_sink::error::SinkError;

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;

/// Server error types.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to load configuration from '{path}': {reason}")]
    ConfigLoad {
        path: String,
        reason: String,
    },

    #[error("Invalid configuration: {field} - {reason}")]
    ConfigInvalid {
        field: String,
        reason: String,
    },

    #[error("Agent configuration file not found: {path}")]
    ConfigMissing {
        path: String,
    },

    #[error("Invalid node key")]
    Unauthorized,

    #[error("TLS setup failed: {reason}")]
    Tls {
        reason: String,
    },

    #[error("{endpoint} request failed: {reason}")]
    Probe {
        endpoint: String,
        reason: String,
    },

    #[error("Server failed to start: {reason}")]
    StartupFailed {
        reason: String,
    },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },

    #[error(transparent)]
    Common(#[from] CommonError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ServerError {
    pub fn config_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn config_invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn tls(reason: impl Into<String>) -> Self {
        Self::Tls {
            reason: reason.into(),
        }
    }

    pub fn probe(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Probe {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    pub fn startup_failed(reason: impl Into<String>) -> Self {
        Self::StartupFailed {
            reason: reason.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigLoad { .. } | Self::ConfigInvalid { .. } | Self::ConfigMissing { .. }
        )
    }

    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigLoad { .. }
                | Self::ConfigInvalid { .. }
                | Self::ConfigMissing { .. }
                | Self::Tls { .. }
                | Self::StartupFailed { .. }
        )
    }

    /// HTTP status an agent sees for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Core(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();
        if matches!(self, Self::Unauthorized) {
            (status, Json(NodeInvalidResponse::new(message))).into_response()
        } else {
            (status, Json(json!({ "error": message }))).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ServerError::config_load("/etc/fleetmock.toml", "file not found");
        assert!(err.to_string().contains("/etc/fleetmock.toml"));
    }

    #[test]
    fn test_error_classification() {
        let config_err = ServerError::config_invalid("network.listen_addr", "port cannot be 0");
        assert!(config_err.is_config_error());
        assert!(config_err.is_fatal());

        assert!(!ServerError::Unauthorized.is_fatal());
        assert!(ServerError::ConfigMissing { path: "osquery.conf".into() }.is_fatal());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ServerError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ServerError::Core(CoreError::malformed("not an object")).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServerError::Core(CoreError::missing_field("log_type")).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServerError::internal("bug").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_unauthorized_response_status() {
        let response = ServerError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
