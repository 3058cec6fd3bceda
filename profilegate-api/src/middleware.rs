//! Axum Middleware for the Profile Gate
//!
//! Adapts [`ProfileGate`] to axum: reads the request path and every `Cookie`
//! header, asks the gate for a decision, then either runs the rest of the
//! stack or answers with `307 Temporary Redirect` to `/profile`.
//!
//! # Example
//!
//! ```ignore
//! use axum::{Router, middleware, routing::get};
//! use profilegate_api::middleware::profile_gate_middleware;
//!
//! let gate = Arc::new(ProfileGate::new(cache, backend));
//!
//! let app = Router::new()
//!     .route("/dashboard", get(|| async { "Dashboard" }))
//!     .layer(middleware::from_fn_with_state(gate, profile_gate_middleware));
//! ```

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use profilegate_core::Credentials;
use std::sync::Arc;
use tracing::{field, info_span, Instrument};

use crate::constants::PROFILE_PATH;
use crate::gate::{GateDecision, ProfileGate};

/// Gate every request passing through this layer.
pub async fn profile_gate_middleware(
    State(gate): State<Arc<ProfileGate>>,
    request: Request,
    next: Next,
) -> Response {
    let credentials = extract_credentials(request.headers());
    let path = request.uri().path().to_owned();

    let span = info_span!("profile_gate", path = %path, reason = field::Empty);
    let outcome = gate
        .evaluate(&path, &credentials)
        .instrument(span.clone())
        .await;
    span.record("reason", outcome.reason.as_str());

    match outcome.decision {
        GateDecision::Proceed => next.run(request).await,
        GateDecision::RedirectToProfile => {
            tracing::debug!(parent: &span, "Redirecting to profile completion");
            Redirect::temporary(PROFILE_PATH).into_response()
        }
    }
}

/// Collect the credential bundle from all `Cookie` headers, in order.
///
/// Headers are parsed from their raw bytes, so one undecodable segment
/// only drops that segment and the rest of the bundle is still gated.
pub fn extract_credentials(headers: &HeaderMap) -> Credentials {
    let mut credentials = Credentials::new();
    for value in headers.get_all(header::COOKIE) {
        credentials.extend_from_cookie_bytes(value.as_bytes());
    }
    credentials
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_extract_credentials_single_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("sid=abc; theme=dark"));

        let credentials = extract_credentials(&headers);
        assert_eq!(credentials.key().as_str(), "sid=abc; theme=dark");
    }

    #[test]
    fn test_extract_credentials_multiple_headers() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("sid=abc"));
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark"));

        let credentials = extract_credentials(&headers);
        assert_eq!(credentials.len(), 2);
        assert_eq!(credentials.to_header_value(), "sid=abc; theme=dark");
    }

    #[test]
    fn test_extract_credentials_none() {
        let headers = HeaderMap::new();
        assert!(extract_credentials(&headers).is_empty());
    }

    #[test]
    fn test_extract_credentials_keeps_session_next_to_opaque_bytes() {
        let mut headers = HeaderMap::new();
        headers.append(
            header::COOKIE,
            HeaderValue::from_bytes(b"sid=abc; pad=\xe9").unwrap(),
        );

        let credentials = extract_credentials(&headers);
        assert!(!credentials.is_empty());
        assert_eq!(credentials.key().as_str(), "sid=abc");
    }

    #[test]
    fn test_extract_credentials_across_opaque_header() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_bytes(b"bad=\xff").unwrap());
        headers.append(header::COOKIE, HeaderValue::from_static("sid=abc"));

        let credentials = extract_credentials(&headers);
        assert_eq!(credentials.key().as_str(), "sid=abc");
    }
}
