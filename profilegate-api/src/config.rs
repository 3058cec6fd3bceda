//! Gate Configuration Module
//!
//! Configuration is loaded from environment variables with defaults suited
//! to local development. Exempt paths are fixed and not configurable.

use std::net::SocketAddr;
use std::time::Duration;

use profilegate_core::{DEFAULT_CACHE_TTL, DEFAULT_SWEEP_INTERVAL};

use crate::constants::{
    DEFAULT_BACKEND_URL, DEFAULT_BIND_HOST, DEFAULT_PAGES_URL, DEFAULT_PORT,
    DEFAULT_UPSTREAM_TIMEOUT,
};
use crate::error::{GateError, GateResult};

// ============================================================================
// GATE CONFIGURATION
// ============================================================================

/// Runtime configuration for the gate and its server.
#[derive(Debug, Clone)]
pub struct GateConfig {
    // ========================================================================
    // Upstream
    // ========================================================================
    /// Base URL of the identity/profile backend.
    pub backend_url: String,

    /// Timeout applied to each upstream call. Expiry counts as an identity
    /// failure.
    pub upstream_timeout: Duration,

    // ========================================================================
    // Verdict cache
    // ========================================================================
    /// How long a verdict stays fresh.
    pub cache_ttl: Duration,

    /// Interval between background sweeps.
    pub sweep_interval: Duration,

    // ========================================================================
    // Server
    // ========================================================================
    /// Origin that requests allowed through the gate are proxied to.
    pub pages_url: String,

    /// Host to bind.
    pub bind_host: String,

    /// Port to listen on.
    pub port: u16,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
            cache_ttl: DEFAULT_CACHE_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            pages_url: DEFAULT_PAGES_URL.to_string(),
            bind_host: DEFAULT_BIND_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl GateConfig {
    /// Create GateConfig from environment variables.
    ///
    /// Environment variables:
    /// - `BACKEND_URL` (or `PUBLIC_BACKEND_URL`): identity/profile backend
    ///   (default: http://localhost:8080)
    /// - `PROFILEGATE_UPSTREAM_TIMEOUT_SECS`: per-call timeout (default: 5)
    /// - `PROFILEGATE_CACHE_TTL_SECS`: verdict lifetime (default: 300)
    /// - `PROFILEGATE_SWEEP_INTERVAL_SECS`: sweep period (default: 60)
    /// - `PROFILEGATE_PAGES_URL`: page origin (default: http://localhost:3000)
    /// - `PROFILEGATE_BIND`: bind host (default: 0.0.0.0)
    /// - `PORT` or `PROFILEGATE_PORT`: listen port (default: 4000)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let backend_url = std::env::var("BACKEND_URL")
            .ok()
            .or_else(|| std::env::var("PUBLIC_BACKEND_URL").ok())
            .filter(|s| !s.trim().is_empty())
            .map(|s| normalize_base_url(&s))
            .unwrap_or(defaults.backend_url);

        let pages_url = std::env::var("PROFILEGATE_PAGES_URL")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(|s| normalize_base_url(&s))
            .unwrap_or(defaults.pages_url);

        let bind_host = std::env::var("PROFILEGATE_BIND").unwrap_or(defaults.bind_host);

        let port = std::env::var("PORT")
            .ok()
            .or_else(|| std::env::var("PROFILEGATE_PORT").ok())
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.port);

        Self {
            backend_url,
            upstream_timeout: env_secs("PROFILEGATE_UPSTREAM_TIMEOUT_SECS")
                .unwrap_or(defaults.upstream_timeout),
            cache_ttl: env_secs("PROFILEGATE_CACHE_TTL_SECS").unwrap_or(defaults.cache_ttl),
            sweep_interval: env_secs("PROFILEGATE_SWEEP_INTERVAL_SECS")
                .filter(|d| !d.is_zero())
                .unwrap_or(defaults.sweep_interval),
            pages_url,
            bind_host,
            port,
        }
    }

    /// Resolve the socket address to bind.
    pub fn bind_addr(&self) -> GateResult<SocketAddr> {
        let addr = format!("{}:{}", self.bind_host, self.port);
        addr.parse::<SocketAddr>()
            .map_err(|e| GateError::Config(format!("Invalid bind address {}: {}", addr, e)))
    }
}

/// Read a whole number of seconds from `key`.
fn env_secs(key: &str) -> Option<Duration> {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Strip trailing slashes so endpoint paths can be appended directly.
pub fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EnvVarGuard {
        key: &'static str,
        original: Option<String>,
    }

    impl EnvVarGuard {
        fn set(key: &'static str, value: Option<&str>) -> Self {
            let original = std::env::var(key).ok();
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
            Self { key, original }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            match self.original.as_deref() {
                Some(v) => std::env::set_var(self.key, v),
                None => std::env::remove_var(self.key),
            }
        }
    }

    #[test]
    fn test_default_config() {
        let config = GateConfig::default();
        assert_eq!(config.backend_url, "http://localhost:8080");
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.sweep_interval, Duration::from_secs(60));
        assert_eq!(config.upstream_timeout, Duration::from_secs(5));
        assert_eq!(config.port, 4000);
    }

    // Every env-dependent assertion lives in this one test so parallel tests
    // never observe each other's variables.
    #[test]
    fn test_from_env() {
        let _backend = EnvVarGuard::set("BACKEND_URL", Some("http://backend:9000/"));
        let _public = EnvVarGuard::set("PUBLIC_BACKEND_URL", Some("http://ignored"));
        let _ttl = EnvVarGuard::set("PROFILEGATE_CACHE_TTL_SECS", Some("120"));
        let _sweep = EnvVarGuard::set("PROFILEGATE_SWEEP_INTERVAL_SECS", Some("0"));
        let _timeout = EnvVarGuard::set("PROFILEGATE_UPSTREAM_TIMEOUT_SECS", Some("nope"));
        let _port = EnvVarGuard::set("PORT", None);
        let _gate_port = EnvVarGuard::set("PROFILEGATE_PORT", Some("4100"));

        let config = GateConfig::from_env();
        assert_eq!(config.backend_url, "http://backend:9000");
        assert_eq!(config.cache_ttl, Duration::from_secs(120));
        // Zero interval falls back to the default
        assert_eq!(config.sweep_interval, Duration::from_secs(60));
        // Unparseable timeout falls back to the default
        assert_eq!(config.upstream_timeout, Duration::from_secs(5));
        assert_eq!(config.port, 4100);

        drop(_backend);
        let config = GateConfig::from_env();
        assert_eq!(config.backend_url, "http://ignored");
    }

    #[test]
    fn test_bind_addr() {
        let config = GateConfig {
            bind_host: "127.0.0.1".to_string(),
            port: 4321,
            ..Default::default()
        };
        assert_eq!(config.bind_addr().unwrap().to_string(), "127.0.0.1:4321");

        let config = GateConfig {
            bind_host: "not a host".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.bind_addr(), Err(GateError::Config(_))));
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(normalize_base_url(" http://a.test/// "), "http://a.test");
        assert_eq!(normalize_base_url("http://a.test"), "http://a.test");
    }
}
