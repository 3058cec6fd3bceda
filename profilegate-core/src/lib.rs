//! PROFILEGATE Core - Verdict Cache and Credential Keys
//!
//! This crate holds the HTTP-agnostic half of the profile gate:
//! - [`Credentials`] and the [`CredentialKey`] derived from them
//! - [`VerdictCache`], the shared `CredentialKey -> VerdictEntry` map
//! - [`CacheSweeper`], the cancellable background task that evicts
//!   expired verdicts on a fixed interval
//!
//! The gate controller itself lives in `profilegate-api`, which owns the
//! upstream client and the axum adapter.

pub mod cache;
pub mod constants;
pub mod credentials;
pub mod sweeper;

pub use cache::{CacheLookup, CacheStats, VerdictCache, VerdictEntry};
pub use constants::{DEFAULT_CACHE_TTL, DEFAULT_SWEEP_INTERVAL, MAX_SWEEP_INTERVAL};
pub use credentials::{CredentialKey, Credentials};
pub use sweeper::CacheSweeper;
