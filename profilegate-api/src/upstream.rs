//! Upstream identity/profile client.
//!
//! The gate talks to its backend through the [`ProfileBackend`] trait so
//! tests can substitute a scripted implementation. [`HttpProfileBackend`] is
//! the production client: it forwards the caller's credential bundle
//! verbatim as a `Cookie` header and reports the response status.

use async_trait::async_trait;
use axum::http::{header, StatusCode};
use profilegate_core::Credentials;
use std::time::Duration;

use crate::config::{normalize_base_url, GateConfig};
use crate::error::{GateError, GateResult, UpstreamService};

/// Backend consulted on a cache miss.
///
/// Implementations return the HTTP status of the lookup. A non-2xx status is
/// an answer, not an error; `Err` is reserved for transport failures and
/// timeouts.
#[async_trait]
pub trait ProfileBackend: Send + Sync {
    async fn check(
        &self,
        service: UpstreamService,
        credentials: &Credentials,
    ) -> GateResult<StatusCode>;
}

// ============================================================================
// HTTP BACKEND
// ============================================================================

/// reqwest-backed [`ProfileBackend`].
#[derive(Debug, Clone)]
pub struct HttpProfileBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpProfileBackend {
    /// Build a client for `base_url` with a per-request `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> GateResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GateError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self::with_client(client, base_url))
    }

    /// Use an existing client (shares its connection pool).
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: normalize_base_url(base_url),
        }
    }

    pub fn from_config(config: &GateConfig) -> GateResult<Self> {
        Self::new(&config.backend_url, config.upstream_timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL for an upstream lookup.
    pub fn endpoint(&self, service: UpstreamService) -> String {
        format!("{}{}", self.base_url, service.path())
    }
}

#[async_trait]
impl ProfileBackend for HttpProfileBackend {
    async fn check(
        &self,
        service: UpstreamService,
        credentials: &Credentials,
    ) -> GateResult<StatusCode> {
        let url = self.endpoint(service);

        let response = self
            .client
            .get(&url)
            .header(header::COOKIE, credentials.to_header_value())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GateError::UpstreamTimeout { service }
                } else {
                    GateError::UpstreamTransport {
                        service,
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        tracing::trace!(service = %service, status = %status, "Upstream lookup completed");
        Ok(status)
    }
}
