//! PROFILEGATE Test Utilities
//!
//! Centralized test infrastructure for the PROFILEGATE workspace:
//! - [`StubBackend`]: scripted in-process [`ProfileBackend`] with call counters
//! - [`FakeBackend`]: a real HTTP identity/profile server on `127.0.0.1:0`
//! - Proptest generators for credentials and request paths
//! - Fixtures for building gates over fresh caches

use async_trait::async_trait;
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// Re-export core types for convenience
pub use profilegate_api::{
    GateDecision, GateError, GateOutcome, GateResult, ProfileBackend, ProfileGate,
    UpstreamService,
};
pub use profilegate_core::{CredentialKey, Credentials, VerdictCache, VerdictEntry};

// ============================================================================
// STUB BACKEND
// ============================================================================

/// Scripted answer for one upstream service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StubResponse {
    /// Respond with this status.
    Status(StatusCode),
    /// Fail as if the connection was refused.
    TransportError,
    /// Fail as if the request timed out.
    Timeout,
}

impl StubResponse {
    fn resolve(self, service: UpstreamService) -> GateResult<StatusCode> {
        match self {
            StubResponse::Status(status) => Ok(status),
            StubResponse::TransportError => Err(GateError::UpstreamTransport {
                service,
                reason: "connection refused".to_string(),
            }),
            StubResponse::Timeout => Err(GateError::UpstreamTimeout { service }),
        }
    }
}

/// In-process [`ProfileBackend`] with scripted answers and call counters.
#[derive(Debug)]
pub struct StubBackend {
    identity: Mutex<StubResponse>,
    profile: Mutex<StubResponse>,
    identity_calls: AtomicUsize,
    profile_calls: AtomicUsize,
    seen_cookies: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl StubBackend {
    pub fn new(identity: StubResponse, profile: StubResponse) -> Self {
        Self {
            identity: Mutex::new(identity),
            profile: Mutex::new(profile),
            identity_calls: AtomicUsize::new(0),
            profile_calls: AtomicUsize::new(0),
            seen_cookies: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Identity 200, profile 200.
    pub fn with_profile() -> Self {
        Self::new(
            StubResponse::Status(StatusCode::OK),
            StubResponse::Status(StatusCode::OK),
        )
    }

    /// Identity 200, profile 404.
    pub fn without_profile() -> Self {
        Self::new(
            StubResponse::Status(StatusCode::OK),
            StubResponse::Status(StatusCode::NOT_FOUND),
        )
    }

    /// Identity unreachable.
    pub fn identity_down() -> Self {
        Self::new(
            StubResponse::TransportError,
            StubResponse::Status(StatusCode::OK),
        )
    }

    /// Sleep this long before every answer.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Change the scripted identity answer.
    pub fn set_identity(&self, response: StubResponse) {
        *self.identity.lock().unwrap() = response;
    }

    /// Change the scripted profile answer.
    pub fn set_profile(&self, response: StubResponse) {
        *self.profile.lock().unwrap() = response;
    }

    pub fn identity_calls(&self) -> usize {
        self.identity_calls.load(Ordering::SeqCst)
    }

    pub fn profile_calls(&self) -> usize {
        self.profile_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.identity_calls() + self.profile_calls()
    }

    /// Every forwarded `Cookie` header value, in call order.
    pub fn seen_cookies(&self) -> Vec<String> {
        self.seen_cookies.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProfileBackend for StubBackend {
    async fn check(
        &self,
        service: UpstreamService,
        credentials: &Credentials,
    ) -> GateResult<StatusCode> {
        self.seen_cookies
            .lock()
            .unwrap()
            .push(credentials.to_header_value());

        let response = match service {
            UpstreamService::Identity => {
                self.identity_calls.fetch_add(1, Ordering::SeqCst);
                *self.identity.lock().unwrap()
            }
            UpstreamService::Profile => {
                self.profile_calls.fetch_add(1, Ordering::SeqCst);
                *self.profile.lock().unwrap()
            }
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        response.resolve(service)
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

/// A gate over a fresh cache, plus handles to both.
pub fn gate_with(backend: StubBackend) -> (ProfileGate, Arc<VerdictCache>, Arc<StubBackend>) {
    let cache = Arc::new(VerdictCache::new());
    let backend = Arc::new(backend);
    let gate = ProfileGate::new(Arc::clone(&cache), backend.clone());
    (gate, cache, backend)
}

/// Credentials parsed from a `Cookie` header value.
pub fn cookies(header: &str) -> Credentials {
    Credentials::from_cookie_header(header)
}

// ============================================================================
// FAKE HTTP BACKEND
// ============================================================================

#[derive(Debug, Default)]
struct FakeBackendState {
    identity_status: Mutex<Option<StatusCode>>,
    profile_status: Mutex<Option<StatusCode>>,
    identity_hits: AtomicUsize,
    profile_hits: AtomicUsize,
    cookies: Mutex<Vec<String>>,
}

/// Real HTTP identity/profile backend bound to an ephemeral local port.
///
/// Serves `GET /api/me` and `GET /api/profiles/me` with configurable
/// statuses and records the `Cookie` header of every request.
pub struct FakeBackend {
    addr: SocketAddr,
    state: Arc<FakeBackendState>,
    handle: tokio::task::JoinHandle<()>,
}

impl FakeBackend {
    /// Start a server answering identity and profile with the given statuses.
    pub async fn spawn(identity: StatusCode, profile: StatusCode) -> std::io::Result<Self> {
        let state = Arc::new(FakeBackendState::default());
        *state.identity_status.lock().unwrap() = Some(identity);
        *state.profile_status.lock().unwrap() = Some(profile);

        let app = Router::new()
            .route("/api/me", get(fake_identity))
            .route("/api/profiles/me", get(fake_profile))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            addr,
            state,
            handle,
        })
    }

    /// Base URL to pass as `BACKEND_URL`.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn set_profile_status(&self, status: StatusCode) {
        *self.state.profile_status.lock().unwrap() = Some(status);
    }

    pub fn identity_hits(&self) -> usize {
        self.state.identity_hits.load(Ordering::SeqCst)
    }

    pub fn profile_hits(&self) -> usize {
        self.state.profile_hits.load(Ordering::SeqCst)
    }

    pub fn total_hits(&self) -> usize {
        self.identity_hits() + self.profile_hits()
    }

    /// `Cookie` headers received, in arrival order.
    pub fn cookies(&self) -> Vec<String> {
        self.state.cookies.lock().unwrap().clone()
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn record_cookie(state: &FakeBackendState, headers: &HeaderMap) {
    let cookie = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    state.cookies.lock().unwrap().push(cookie);
}

async fn fake_identity(State(state): State<Arc<FakeBackendState>>, headers: HeaderMap) -> StatusCode {
    state.identity_hits.fetch_add(1, Ordering::SeqCst);
    record_cookie(&state, &headers);
    state
        .identity_status
        .lock()
        .unwrap()
        .unwrap_or(StatusCode::OK)
}

async fn fake_profile(State(state): State<Arc<FakeBackendState>>, headers: HeaderMap) -> StatusCode {
    state.profile_hits.fetch_add(1, Ordering::SeqCst);
    record_cookie(&state, &headers);
    state
        .profile_status
        .lock()
        .unwrap()
        .unwrap_or(StatusCode::OK)
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod strategies {
    use super::Credentials;
    use proptest::prelude::*;

    /// A cookie name/value pair as browsers send them.
    pub fn cookie_pair() -> impl Strategy<Value = (String, String)> {
        ("[a-zA-Z_][a-zA-Z0-9_]{0,15}", "[a-zA-Z0-9_.%-]{1,32}")
    }

    /// A non-empty credential bundle.
    pub fn credentials() -> impl Strategy<Value = Credentials> {
        prop::collection::vec(cookie_pair(), 1..5)
            .prop_map(|pairs| pairs.into_iter().collect::<Credentials>())
    }

    /// A possibly empty credential bundle.
    pub fn any_credentials() -> impl Strategy<Value = Credentials> {
        prop::collection::vec(cookie_pair(), 0..5)
            .prop_map(|pairs| pairs.into_iter().collect::<Credentials>())
    }

    /// A path the gate never inspects.
    pub fn exempt_path() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("/auth".to_string()),
            Just("/profile".to_string()),
            Just("/health".to_string()),
            "/api[a-z0-9/_-]{0,24}",
        ]
    }

    /// A path the gate always inspects.
    pub fn protected_path() -> impl Strategy<Value = String> {
        "/[b-z][a-z0-9_-]{0,12}(/[a-z0-9_-]{1,12}){0,3}".prop_filter(
            "must not be an exempt path",
            |p| !profilegate_api::is_exempt_path(p),
        )
    }
}
