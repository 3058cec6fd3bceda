//! PROFILEGATE API - Profile Completion Gate for Axum
//!
//! This crate decides, per request, whether an authenticated identity must
//! be sent to `/profile` before reaching a protected page. Verdicts come from
//! an upstream identity/profile backend and are cached per credential bundle
//! in a [`profilegate_core::VerdictCache`].
//!
//! - [`gate`]: the decision controller
//! - [`upstream`]: the backend trait and its reqwest implementation
//! - [`middleware`]: the axum adapter mapping redirects to HTTP 307
//! - [`routes`]: the standalone server's health endpoint and page proxy

pub mod config;
pub mod constants;
pub mod error;
pub mod gate;
pub mod macros;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod upstream;

// Re-export commonly used types
pub use config::GateConfig;
pub use error::{GateError, GateResult, ProxyError, UpstreamService};
pub use gate::{is_exempt_path, DecisionReason, GateDecision, GateOutcome, ProfileGate};
pub use middleware::{extract_credentials, profile_gate_middleware};
pub use routes::create_router;
pub use routes::proxy::PageProxy;
pub use state::AppState;
pub use telemetry::{init_tracing, LogFormat, TelemetryConfig};
pub use upstream::{HttpProfileBackend, ProfileBackend};
