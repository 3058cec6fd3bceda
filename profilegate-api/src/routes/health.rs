//! Health Check Endpoint
//!
//! `GET /health` reports liveness plus verdict cache counters. The path is
//! exempt from the gate, so no credentials are needed.

use axum::{extract::State, Json};
use profilegate_core::{CacheStats, VerdictCache};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub cache: CacheStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
}

/// State needed by the health handler.
#[derive(Debug, Clone)]
pub struct HealthState {
    pub cache: Arc<VerdictCache>,
    pub start_time: Instant,
}

impl HealthState {
    pub fn new(cache: Arc<VerdictCache>) -> Self {
        Self {
            cache,
            start_time: Instant::now(),
        }
    }
}

/// GET /health
pub async fn health(State(state): State<HealthState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: HealthStatus::Ok,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        cache: state.cache.stats(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use profilegate_core::Credentials;
    use std::time::Duration;

    #[tokio::test]
    async fn test_health_reports_cache_entries() {
        let cache = Arc::new(VerdictCache::new());
        cache.set(
            Credentials::from_cookie_header("sid=abc").key(),
            true,
            Duration::from_secs(300),
        );

        let Json(response) = health(State(HealthState::new(cache))).await;
        assert_eq!(response.status, HealthStatus::Ok);
        assert_eq!(response.cache.entries, 1);
        assert_eq!(response.cache.writes, 1);
    }

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: HealthStatus::Ok,
            version: "0.2.0".to_string(),
            uptime_seconds: 42,
            cache: CacheStats::default(),
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"ok\""));
        assert!(json.contains("\"uptime_seconds\":42"));
    }
}
