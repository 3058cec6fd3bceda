//! Property-based tests for gate decisions.

use profilegate_api::{is_exempt_path, DecisionReason, GateDecision};
use profilegate_core::Credentials;
use profilegate_test_utils::{gate_with, strategies, StubBackend};
use proptest::prelude::*;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Exempt paths proceed with no upstream call and no cache write.
    #[test]
    fn prop_exempt_paths_always_proceed(
        path in strategies::exempt_path(),
        creds in strategies::any_credentials(),
    ) {
        let (gate, cache, backend) = gate_with(StubBackend::without_profile());
        let outcome = runtime().block_on(gate.evaluate(&path, &creds));

        prop_assert!(is_exempt_path(&path));
        prop_assert_eq!(outcome.decision, GateDecision::Proceed);
        prop_assert_eq!(outcome.reason, DecisionReason::ExemptPath);
        prop_assert_eq!(backend.total_calls(), 0);
        prop_assert!(cache.is_empty());
    }

    /// Requests without credentials proceed on any path.
    #[test]
    fn prop_no_credentials_always_proceed(path in strategies::protected_path()) {
        let (gate, cache, backend) = gate_with(StubBackend::without_profile());
        let decision = runtime().block_on(gate.decide(&path, &Credentials::new()));

        prop_assert_eq!(decision, GateDecision::Proceed);
        prop_assert_eq!(backend.total_calls(), 0);
        prop_assert!(cache.is_empty());
    }

    /// A bundle is looked up upstream at most once while its verdict is fresh.
    #[test]
    fn prop_fresh_verdict_queried_once(
        path in strategies::protected_path(),
        creds in strategies::credentials(),
        repeats in 2usize..6,
    ) {
        let (gate, _cache, backend) = gate_with(StubBackend::without_profile());
        let rt = runtime();

        for _ in 0..repeats {
            let decision = rt.block_on(gate.decide(&path, &creds));
            prop_assert_eq!(decision, GateDecision::RedirectToProfile);
        }
        prop_assert_eq!(backend.identity_calls(), 1);
        prop_assert_eq!(backend.profile_calls(), 1);
    }

    /// An unreachable identity service never blocks a request or caches.
    #[test]
    fn prop_identity_down_fails_open(
        path in strategies::protected_path(),
        creds in strategies::credentials(),
    ) {
        let (gate, cache, _backend) = gate_with(StubBackend::identity_down());
        let outcome = runtime().block_on(gate.evaluate(&path, &creds));

        prop_assert_eq!(outcome.decision, GateDecision::Proceed);
        prop_assert_eq!(outcome.reason, DecisionReason::FailOpen);
        prop_assert!(cache.is_empty());
    }
}
