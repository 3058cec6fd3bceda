//! Profile Gate Controller
//!
//! Decides, per request, whether an authenticated identity may proceed or
//! must first complete its profile:
//!
//! 1. Exempt paths (`/auth`, `/profile`, `/health`, `/api*`) always proceed
//! 2. Requests without credentials proceed (not this gate's concern)
//! 3. A fresh cached verdict decides without any upstream call
//! 4. Otherwise the identity service is asked; if it fails the gate fails
//!    open and caches nothing
//! 5. If identity succeeds, the profile lookup status becomes the verdict,
//!    which is cached for the configured TTL
//!
//! Redirection is a returned value ([`GateDecision::RedirectToProfile`]),
//! mapped to an HTTP 307 by the axum middleware.

use chrono::Utc;
use profilegate_core::{CacheLookup, CredentialKey, Credentials, VerdictCache, DEFAULT_CACHE_TTL};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::constants::{API_PREFIX, AUTH_PATH, HEALTH_PATH, PROFILE_PATH};
use crate::error::{GateError, GateResult, UpstreamService};
use crate::upstream::ProfileBackend;

// ============================================================================
// DECISION TYPES
// ============================================================================

/// What the framework should do with the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Continue to normal resolution.
    Proceed,
    /// Stop and redirect (307) to the profile page.
    RedirectToProfile,
}

impl GateDecision {
    /// Map a has-profile verdict to a decision.
    pub fn from_verdict(has_profile: bool) -> Self {
        if has_profile {
            GateDecision::Proceed
        } else {
            GateDecision::RedirectToProfile
        }
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, GateDecision::RedirectToProfile)
    }
}

/// Why the gate reached its decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionReason {
    /// Path is exempt from gating.
    ExemptPath,
    /// Request carried no credentials.
    NoCredentials,
    /// Decided from a fresh cached verdict.
    CacheHit,
    /// Decided from a fresh upstream lookup (and cached).
    Verified,
    /// Upstream failed; request let through without caching.
    FailOpen,
}

impl DecisionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionReason::ExemptPath => "exempt_path",
            DecisionReason::NoCredentials => "no_credentials",
            DecisionReason::CacheHit => "cache_hit",
            DecisionReason::Verified => "verified",
            DecisionReason::FailOpen => "fail_open",
        }
    }
}

impl fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision plus the path through the state machine that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateOutcome {
    pub decision: GateDecision,
    pub reason: DecisionReason,
}

impl GateOutcome {
    fn proceed(reason: DecisionReason) -> Self {
        Self {
            decision: GateDecision::Proceed,
            reason,
        }
    }

    fn from_verdict(has_profile: bool, reason: DecisionReason) -> Self {
        Self {
            decision: GateDecision::from_verdict(has_profile),
            reason,
        }
    }
}

// ============================================================================
// EXEMPTION
// ============================================================================

/// True if `path` bypasses the gate entirely.
///
/// The `/api` check is a plain prefix match, so `/apiary` is exempt too.
pub fn is_exempt_path(path: &str) -> bool {
    path == AUTH_PATH || path == PROFILE_PATH || path == HEALTH_PATH || path.starts_with(API_PREFIX)
}

// ============================================================================
// CONTROLLER
// ============================================================================

/// The gate controller. Cheap to share behind an `Arc`.
#[derive(Clone)]
pub struct ProfileGate {
    cache: Arc<VerdictCache>,
    backend: Arc<dyn ProfileBackend>,
    cache_ttl: Duration,
}

impl ProfileGate {
    /// Create a gate over `cache` consulting `backend` on misses.
    pub fn new(cache: Arc<VerdictCache>, backend: Arc<dyn ProfileBackend>) -> Self {
        Self {
            cache,
            backend,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }

    /// Override how long fresh verdicts are cached.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn cache(&self) -> &Arc<VerdictCache> {
        &self.cache
    }

    pub fn cache_ttl(&self) -> Duration {
        self.cache_ttl
    }

    /// Decide whether the request may proceed.
    pub async fn decide(&self, path: &str, credentials: &Credentials) -> GateDecision {
        self.evaluate(path, credentials).await.decision
    }

    /// Decide and report why.
    pub async fn evaluate(&self, path: &str, credentials: &Credentials) -> GateOutcome {
        if is_exempt_path(path) {
            return GateOutcome::proceed(DecisionReason::ExemptPath);
        }

        if credentials.is_empty() {
            return GateOutcome::proceed(DecisionReason::NoCredentials);
        }

        let key = credentials.key();

        if let CacheLookup::Fresh(has_profile) = self.cache.lookup(&key, Utc::now()) {
            tracing::trace!(key = ?key, has_profile, "Verdict cache hit");
            return GateOutcome::from_verdict(has_profile, DecisionReason::CacheHit);
        }

        match self.verify_upstream(credentials).await {
            Ok(has_profile) => {
                self.store_verdict(key, has_profile);
                GateOutcome::from_verdict(has_profile, DecisionReason::Verified)
            }
            Err(e) => {
                // Fail open: an unreachable backend must not lock everyone out.
                tracing::warn!(
                    error = %e,
                    key = ?key,
                    path = %path,
                    "Profile check failed, letting request through"
                );
                GateOutcome::proceed(DecisionReason::FailOpen)
            }
        }
    }

    /// Ask identity, then profile. `Ok(has_profile)` only when identity
    /// succeeded and the profile lookup produced a status.
    async fn verify_upstream(&self, credentials: &Credentials) -> GateResult<bool> {
        let identity = self
            .backend
            .check(UpstreamService::Identity, credentials)
            .await?;

        if !identity.is_success() {
            return Err(GateError::UpstreamStatus {
                service: UpstreamService::Identity,
                status: identity,
            });
        }

        let profile = self
            .backend
            .check(UpstreamService::Profile, credentials)
            .await?;

        Ok(profile.is_success())
    }

    fn store_verdict(&self, key: CredentialKey, has_profile: bool) {
        tracing::debug!(key = ?key, has_profile, ttl_secs = self.cache_ttl.as_secs(), "Caching verdict");
        self.cache.set(key, has_profile, self.cache_ttl);
    }
}

impl fmt::Debug for ProfileGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileGate")
            .field("cache_entries", &self.cache.len())
            .field("cache_ttl", &self.cache_ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Minimal scripted backend; the richer stub lives in the test-utils crate.
    struct Scripted {
        identity: Option<StatusCode>,
        profile: Option<StatusCode>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(identity: Option<StatusCode>, profile: Option<StatusCode>) -> Arc<Self> {
            Arc::new(Self {
                identity,
                profile,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProfileBackend for Scripted {
        async fn check(
            &self,
            service: UpstreamService,
            _credentials: &Credentials,
        ) -> GateResult<StatusCode> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let scripted = match service {
                UpstreamService::Identity => self.identity,
                UpstreamService::Profile => self.profile,
            };
            scripted.ok_or(GateError::UpstreamTransport {
                service,
                reason: "connection refused".to_string(),
            })
        }
    }

    fn gate(backend: Arc<Scripted>) -> ProfileGate {
        ProfileGate::new(Arc::new(VerdictCache::new()), backend)
    }

    fn sid() -> Credentials {
        Credentials::from_cookie_header("sid=abc")
    }

    #[test]
    fn test_exempt_paths() {
        assert!(is_exempt_path("/auth"));
        assert!(is_exempt_path("/profile"));
        assert!(is_exempt_path("/health"));
        assert!(is_exempt_path("/api"));
        assert!(is_exempt_path("/api/me"));
        assert!(is_exempt_path("/apiary"));

        assert!(!is_exempt_path("/"));
        assert!(!is_exempt_path("/dashboard"));
        assert!(!is_exempt_path("/auth/callback"));
        assert!(!is_exempt_path("/profile/edit"));
        assert!(!is_exempt_path("/healthz"));
    }

    #[test]
    fn test_decision_from_verdict() {
        assert_eq!(GateDecision::from_verdict(true), GateDecision::Proceed);
        assert_eq!(
            GateDecision::from_verdict(false),
            GateDecision::RedirectToProfile
        );
        assert!(GateDecision::RedirectToProfile.is_redirect());
    }

    #[tokio::test]
    async fn test_exempt_path_skips_everything() {
        let backend = Scripted::new(Some(StatusCode::OK), Some(StatusCode::NOT_FOUND));
        let gate = gate(backend.clone());

        let outcome = gate.evaluate("/profile", &sid()).await;
        assert_eq!(outcome, GateOutcome::proceed(DecisionReason::ExemptPath));
        assert_eq!(backend.calls(), 0);
        assert!(gate.cache().is_empty());
    }

    #[tokio::test]
    async fn test_no_credentials_proceeds() {
        let backend = Scripted::new(Some(StatusCode::OK), Some(StatusCode::NOT_FOUND));
        let gate = gate(backend.clone());

        let outcome = gate.evaluate("/dashboard", &Credentials::new()).await;
        assert_eq!(outcome.reason, DecisionReason::NoCredentials);
        assert_eq!(outcome.decision, GateDecision::Proceed);
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_profile_redirects_and_caches() {
        let backend = Scripted::new(Some(StatusCode::OK), Some(StatusCode::NOT_FOUND));
        let gate = gate(backend.clone());

        let outcome = gate.evaluate("/dashboard", &sid()).await;
        assert_eq!(outcome.decision, GateDecision::RedirectToProfile);
        assert_eq!(outcome.reason, DecisionReason::Verified);
        assert_eq!(backend.calls(), 2);

        let entry = gate.cache().get(&sid().key()).unwrap();
        assert!(!entry.has_profile);
    }

    #[tokio::test]
    async fn test_identity_transport_failure_fails_open() {
        let backend = Scripted::new(None, Some(StatusCode::OK));
        let gate = gate(backend.clone());

        let outcome = gate.evaluate("/dashboard", &sid()).await;
        assert_eq!(outcome, GateOutcome::proceed(DecisionReason::FailOpen));
        assert_eq!(backend.calls(), 1);
        assert!(gate.cache().is_empty());
    }

    #[tokio::test]
    async fn test_profile_transport_failure_fails_open() {
        let backend = Scripted::new(Some(StatusCode::OK), None);
        let gate = gate(backend.clone());

        let outcome = gate.evaluate("/dashboard", &sid()).await;
        assert_eq!(outcome, GateOutcome::proceed(DecisionReason::FailOpen));
        assert!(gate.cache().is_empty());
    }

    #[tokio::test]
    async fn test_custom_ttl_applies() {
        let backend = Scripted::new(Some(StatusCode::OK), Some(StatusCode::OK));
        let gate = gate(backend).with_cache_ttl(Duration::from_secs(30));
        assert_eq!(gate.cache_ttl(), Duration::from_secs(30));

        let before = Utc::now();
        gate.decide("/dashboard", &sid()).await;
        let entry = gate.cache().get(&sid().key()).unwrap();

        let ttl = entry.expires_at - before;
        assert!(ttl <= chrono::Duration::seconds(31));
        assert!(ttl >= chrono::Duration::seconds(29));
    }
}
