//! Constants for the verdict cache.

use std::time::Duration;

// ============================================================================
// CACHE
// ============================================================================

/// How long a verdict stays fresh after an upstream lookup (5 minutes)
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Interval between background sweeps of expired verdicts (1 minute)
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Longest sweep period accepted; larger values are clamped (1 day)
pub const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Number of hex characters kept when fingerprinting a credential key for logs
pub const KEY_FINGERPRINT_LEN: usize = 12;
