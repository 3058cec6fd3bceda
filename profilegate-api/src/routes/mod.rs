//! Router assembly for the gate server.
//!
//! Every request, local or proxied, passes through the profile gate layer.
//! `/health` is answered locally; anything else falls back to the page
//! proxy.

pub mod health;
pub mod proxy;

use axum::{middleware, routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::constants::HEALTH_PATH;
use crate::middleware::profile_gate_middleware;
use crate::state::AppState;

/// Build the complete server router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route(HEALTH_PATH, get(health::health))
        .fallback(proxy::proxy_handler)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            profile_gate_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
