//! In-memory verdict cache keyed by credential bundle.
//!
//! The cache stores one [`VerdictEntry`] per [`CredentialKey`]. It never
//! fails: absence is a normal result, and freshness is judged against a
//! caller-supplied clock reading so the gate and the sweeper agree on time.
//!
//! # Concurrency
//!
//! Entries live in a sharded [`DashMap`], so a read or write of one key is
//! atomic without a global lock. Two concurrent misses for the same key may
//! both write; the last write wins. A sweep racing a read can make the entry
//! appear absent, which only forces a fresh upstream check.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::credentials::CredentialKey;

// ============================================================================
// ENTRY
// ============================================================================

/// Cached has-profile verdict with its expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictEntry {
    /// Whether the identity had a completed profile at lookup time.
    pub has_profile: bool,
    /// Instant after which the verdict must be re-derived upstream.
    pub expires_at: DateTime<Utc>,
}

impl VerdictEntry {
    /// Build an entry expiring `ttl` after `now`.
    pub fn new(has_profile: bool, ttl: Duration, now: DateTime<Utc>) -> Self {
        Self {
            has_profile,
            expires_at: expiry_after(now, ttl),
        }
    }

    /// True while `expires_at` is strictly in the future.
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }

    /// True once `expires_at` is strictly in the past (sweep criterion).
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// `now + ttl`, saturating instead of overflowing.
fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

// ============================================================================
// LOOKUP RESULT
// ============================================================================

/// Classification of a cache read at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLookup {
    /// A fresh verdict is cached.
    Fresh(bool),
    /// An entry exists but has expired.
    Stale,
    /// No entry for the key.
    Missing,
}

// ============================================================================
// STATS
// ============================================================================

/// Snapshot of cache counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups answered from a fresh entry.
    pub hits: u64,
    /// Lookups that found no entry.
    pub misses: u64,
    /// Lookups that found an expired entry.
    pub stale: u64,
    /// Entries written by `set`.
    pub writes: u64,
    /// Entries removed by sweeps.
    pub swept: u64,
    /// Entries currently held.
    pub entries: u64,
}

impl CacheStats {
    /// Hit rate as a percentage (0.0 - 100.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses + self.stale;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    stale: AtomicU64,
    writes: AtomicU64,
    swept: AtomicU64,
}

// ============================================================================
// CACHE
// ============================================================================

/// Process-wide verdict cache, shared by `Arc` between the gate and the
/// sweeper.
#[derive(Debug, Default)]
pub struct VerdictCache {
    entries: DashMap<CredentialKey, VerdictEntry>,
    counters: Counters,
}

impl VerdictCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the entry for `key` regardless of freshness.
    pub fn get(&self, key: &CredentialKey) -> Option<VerdictEntry> {
        self.entries.get(key).map(|entry| *entry)
    }

    /// Read `key` and classify it against `now`, updating hit/miss counters.
    pub fn lookup(&self, key: &CredentialKey, now: DateTime<Utc>) -> CacheLookup {
        match self.get(key) {
            Some(entry) if entry.is_fresh_at(now) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                CacheLookup::Fresh(entry.has_profile)
            }
            Some(_) => {
                self.counters.stale.fetch_add(1, Ordering::Relaxed);
                CacheLookup::Stale
            }
            None => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                CacheLookup::Missing
            }
        }
    }

    /// Insert or overwrite `key` with a verdict expiring `ttl` from now.
    pub fn set(&self, key: CredentialKey, has_profile: bool, ttl: Duration) {
        self.set_at(key, has_profile, ttl, Utc::now());
    }

    /// Insert or overwrite `key` with a verdict expiring `ttl` after `now`.
    pub fn set_at(&self, key: CredentialKey, has_profile: bool, ttl: Duration, now: DateTime<Utc>) {
        self.entries
            .insert(key, VerdictEntry::new(has_profile, ttl, now));
        self.counters.writes.fetch_add(1, Ordering::Relaxed);
    }

    /// Remove a single entry, returning it if present.
    pub fn evict(&self, key: &CredentialKey) -> Option<VerdictEntry> {
        self.entries.remove(key).map(|(_, entry)| entry)
    }

    /// Remove every entry whose `expires_at` is before `now`.
    ///
    /// Returns the number of entries removed.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));
        // Concurrent inserts can make `len` grow during the retain.
        let removed = before.saturating_sub(self.entries.len());
        self.counters
            .swept
            .fetch_add(removed as u64, Ordering::Relaxed);
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry. Counters are kept.
    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            stale: self.counters.stale.load(Ordering::Relaxed),
            writes: self.counters.writes.load(Ordering::Relaxed),
            swept: self.counters.swept.load(Ordering::Relaxed),
            entries: self.entries.len() as u64,
        }
    }
}
