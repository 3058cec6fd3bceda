//! Constants for the PROFILEGATE API
//!
//! Route paths, upstream endpoints and server defaults live here so they are
//! easy to find and test.

use std::time::Duration;

// ============================================================================
// GATE ROUTES
// ============================================================================

/// Login/auth page, never gated
pub const AUTH_PATH: &str = "/auth";

/// Profile-completion page, never gated and the redirect target
pub const PROFILE_PATH: &str = "/profile";

/// Health check, never gated
pub const HEALTH_PATH: &str = "/health";

/// Any path with this prefix is machine traffic and never gated
pub const API_PREFIX: &str = "/api";

// ============================================================================
// UPSTREAM ENDPOINTS
// ============================================================================

/// Identity lookup, relative to the backend URL
pub const IDENTITY_ENDPOINT: &str = "/api/me";

/// Profile lookup, relative to the backend URL
pub const PROFILE_ENDPOINT: &str = "/api/profiles/me";

/// Default identity/profile backend
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8080";

/// Default per-request upstream timeout
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// SERVER
// ============================================================================

/// Default origin that gated requests are proxied to
pub const DEFAULT_PAGES_URL: &str = "http://localhost:3000";

/// Default bind host
pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";

/// Default listen port
pub const DEFAULT_PORT: u16 = 4000;

/// Largest request body the page proxy buffers (16MB)
pub const MAX_PROXY_BODY_BYTES: usize = 16 * 1024 * 1024;
