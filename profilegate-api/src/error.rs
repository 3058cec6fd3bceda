//! Error Types for PROFILEGATE API
//!
//! Upstream failures are values the gate resolves to "proceed" (fail-open);
//! they never reach the client. Configuration and server errors are fatal
//! for the binary. Proxy errors become 502/413 responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::fmt;
use thiserror::Error;

use crate::constants::{IDENTITY_ENDPOINT, PROFILE_ENDPOINT};

// ============================================================================
// UPSTREAM SERVICE
// ============================================================================

/// The two upstream lookups the gate performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpstreamService {
    /// `GET /api/me`
    Identity,
    /// `GET /api/profiles/me`
    Profile,
}

impl UpstreamService {
    /// Endpoint path relative to the backend URL.
    pub fn path(&self) -> &'static str {
        match self {
            UpstreamService::Identity => IDENTITY_ENDPOINT,
            UpstreamService::Profile => PROFILE_ENDPOINT,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UpstreamService::Identity => "identity",
            UpstreamService::Profile => "profile",
        }
    }
}

impl fmt::Display for UpstreamService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// GATE ERROR
// ============================================================================

/// Errors raised by the gate, its upstream client and the server bootstrap.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("{service} request failed: {reason}")]
    UpstreamTransport {
        service: UpstreamService,
        reason: String,
    },

    #[error("{service} request timed out")]
    UpstreamTimeout { service: UpstreamService },

    #[error("{service} returned status {status}")]
    UpstreamStatus {
        service: UpstreamService,
        status: StatusCode,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Telemetry initialization failed: {0}")]
    Telemetry(String),

    #[error("Server error: {0}")]
    Server(String),
}

impl GateError {
    /// True for errors raised while talking to the identity/profile backend.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            GateError::UpstreamTransport { .. }
                | GateError::UpstreamTimeout { .. }
                | GateError::UpstreamStatus { .. }
        )
    }
}

/// Result type for gate operations.
pub type GateResult<T> = Result<T, GateError>;

// ============================================================================
// PROXY ERROR
// ============================================================================

/// Errors raised while forwarding a request to the page origin.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Request body could not be read: {0}")]
    RequestBody(String),

    #[error("Page origin unreachable: {0}")]
    Upstream(String),

    #[error("Page origin response could not be read: {0}")]
    ResponseBody(String),

    #[error("Invalid proxy target: {0}")]
    InvalidTarget(String),
}

impl ProxyError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::RequestBody(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::InvalidTarget(_) => StatusCode::BAD_REQUEST,
            ProxyError::Upstream(_) | ProxyError::ResponseBody(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::warn!(error = %self, status = %status, "Page proxy failed");

        let body = serde_json::json!({
            "code": status.as_u16(),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}
