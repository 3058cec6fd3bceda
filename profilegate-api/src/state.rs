//! Shared application state for the gate server.

use std::sync::Arc;

use profilegate_core::VerdictCache;

use crate::gate::ProfileGate;
use crate::routes::health::HealthState;
use crate::routes::proxy::PageProxy;

/// Application-wide state shared across all routes and the gate layer.
#[derive(Clone)]
pub struct AppState {
    /// Gate controller consulted by the middleware.
    pub gate: Arc<ProfileGate>,
    /// Forwarding client for requests the gate lets through.
    pub proxy: PageProxy,
    pub health: HealthState,
}

impl AppState {
    pub fn new(gate: ProfileGate, proxy: PageProxy) -> Self {
        let health = HealthState::new(Arc::clone(gate.cache()));
        Self {
            gate: Arc::new(gate),
            proxy,
            health,
        }
    }

    /// The verdict cache behind the gate.
    pub fn cache(&self) -> &Arc<VerdictCache> {
        self.gate.cache()
    }
}

crate::impl_from_ref!(Arc<ProfileGate>, gate);
crate::impl_from_ref!(PageProxy, proxy);
crate::impl_from_ref!(HealthState, health);
