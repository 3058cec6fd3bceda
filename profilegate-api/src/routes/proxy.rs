//! Page Proxy
//!
//! Requests the gate lets through are forwarded to the page origin
//! (`PROFILEGATE_PAGES_URL`). Method, path, query, headers and body are
//! passed along; hop-by-hop headers are dropped in both directions and
//! redirects from the origin are returned to the client untouched.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderMap, HeaderName},
    response::Response,
};
use std::time::Duration;

use crate::config::{normalize_base_url, GateConfig};
use crate::constants::MAX_PROXY_BODY_BYTES;
use crate::error::{GateError, GateResult, ProxyError};

/// Page timeout is generous; the page origin may render slowly.
const PAGE_TIMEOUT: Duration = Duration::from_secs(60);

/// Forwarding client for the page origin.
#[derive(Debug, Clone)]
pub struct PageProxy {
    client: reqwest::Client,
    origin: String,
}

impl PageProxy {
    pub fn new(origin: &str) -> GateResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(PAGE_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| GateError::Config(format!("Failed to create proxy client: {}", e)))?;

        Ok(Self {
            client,
            origin: normalize_base_url(origin),
        })
    }

    pub fn from_config(config: &GateConfig) -> GateResult<Self> {
        Self::new(&config.pages_url)
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Target URL for an incoming path-and-query.
    pub fn target_url(&self, path_and_query: &str) -> String {
        format!("{}{}", self.origin, path_and_query)
    }

    /// Forward `request` to the origin and relay the response.
    pub async fn forward(&self, request: Request) -> Result<Response, ProxyError> {
        let (parts, body) = request.into_parts();

        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let url = self.target_url(path_and_query);

        let body = axum::body::to_bytes(body, MAX_PROXY_BODY_BYTES)
            .await
            .map_err(|e| ProxyError::RequestBody(e.to_string()))?;

        let mut headers = strip_hop_by_hop(parts.headers);
        headers.remove(header::HOST);

        let upstream = self
            .client
            .request(parts.method, &url)
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_builder() {
                    ProxyError::InvalidTarget(e.to_string())
                } else {
                    ProxyError::Upstream(e.to_string())
                }
            })?;

        let status = upstream.status();
        let headers = strip_hop_by_hop(upstream.headers().clone());
        let bytes = upstream
            .bytes()
            .await
            .map_err(|e| ProxyError::ResponseBody(e.to_string()))?;

        let mut response = Response::new(Body::from(bytes));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        // Length is recomputed from the buffered body.
        response.headers_mut().remove(header::CONTENT_LENGTH);

        Ok(response)
    }
}

/// Drop headers that describe a single connection.
fn strip_hop_by_hop(mut headers: HeaderMap) -> HeaderMap {
    let hop_by_hop: [HeaderName; 8] = [
        header::CONNECTION,
        HeaderName::from_static("keep-alive"),
        header::PROXY_AUTHENTICATE,
        header::PROXY_AUTHORIZATION,
        header::TE,
        header::TRAILER,
        header::TRANSFER_ENCODING,
        header::UPGRADE,
    ];
    for name in hop_by_hop {
        headers.remove(name);
    }
    headers
}

/// Fallback handler: everything not routed locally goes to the page origin.
pub async fn proxy_handler(
    State(proxy): State<PageProxy>,
    request: Request,
) -> Result<Response, ProxyError> {
    proxy.forward(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_target_url() {
        let proxy = PageProxy::new("http://pages.test/").unwrap();
        assert_eq!(proxy.origin(), "http://pages.test");
        assert_eq!(
            proxy.target_url("/dashboard?tab=1"),
            "http://pages.test/dashboard?tab=1"
        );
    }

    #[test]
    fn test_strip_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert("keep-alive", HeaderValue::from_static("timeout=5"));
        headers.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(header::COOKIE, HeaderValue::from_static("sid=abc"));

        let headers = strip_hop_by_hop(headers);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get(header::COOKIE).unwrap(), "sid=abc");
    }
}
