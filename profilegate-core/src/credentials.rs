//! Request credentials and the cache key derived from them.
//!
//! A request is identified by its complete credential bundle (every cookie
//! it carried, in the order it carried them). The [`CredentialKey`] is the
//! bundle serialized in `Cookie` header form, so two requests share a cache
//! entry only if their bundles are identical.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use crate::constants::KEY_FINGERPRINT_LEN;

/// Separator between serialized `name=value` pairs.
const PAIR_SEPARATOR: &str = "; ";

// ============================================================================
// CREDENTIALS
// ============================================================================

/// Ordered bundle of `(name, value)` credential pairs.
///
/// Order is preserved exactly as the pairs were added. Duplicate names are
/// kept, since browsers may send the same cookie name for different paths.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pairs: Vec<(String, String)>,
}

impl Credentials {
    /// Create an empty credential bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `Cookie` header value (`a=1; b=2`) into a bundle.
    pub fn from_cookie_header(header: &str) -> Self {
        let mut credentials = Self::new();
        credentials.extend_from_cookie_header(header);
        credentials
    }

    /// Append the pairs found in a `Cookie` header value.
    ///
    /// Segments without a name or without an `=` are skipped.
    pub fn extend_from_cookie_header(&mut self, header: &str) {
        for segment in header.split(';') {
            self.push_segment(segment);
        }
    }

    /// Append the pairs found in a raw `Cookie` header.
    ///
    /// Each `;`-separated segment is decoded on its own; a segment that is
    /// not UTF-8 is dropped without discarding the rest of the header.
    pub fn extend_from_cookie_bytes(&mut self, header: &[u8]) {
        for segment in header.split(|b| *b == b';') {
            if let Ok(segment) = std::str::from_utf8(segment) {
                self.push_segment(segment);
            }
        }
    }

    fn push_segment(&mut self, segment: &str) {
        if let Some((name, value)) = segment.trim().split_once('=') {
            self.push(name.trim(), value.trim());
        }
    }

    /// Append a single pair. Pairs with an empty name are ignored.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        if name.is_empty() {
            return;
        }
        self.pairs.push((name, value.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Iterate over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Serialize the bundle as a `Cookie` header value.
    pub fn to_header_value(&self) -> String {
        self.pairs
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join(PAIR_SEPARATOR)
    }

    /// Derive the cache key for this bundle.
    pub fn key(&self) -> CredentialKey {
        CredentialKey(self.to_header_value())
    }
}

impl<N, V> FromIterator<(N, V)> for Credentials
where
    N: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut credentials = Self::new();
        for (name, value) in iter {
            credentials.push(name, value);
        }
        credentials
    }
}

// Values are session secrets; only names are printed.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("names", &self.pairs.iter().map(|(n, _)| n).collect::<Vec<_>>())
            .finish()
    }
}

// ============================================================================
// CREDENTIAL KEY
// ============================================================================

/// Opaque cache key derived from a full [`Credentials`] bundle.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialKey(String);

impl CredentialKey {
    /// Borrow the serialized bundle.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// Short SHA-256 fingerprint, safe to put in logs.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        let mut hex = hex::encode(digest);
        hex.truncate(KEY_FINGERPRINT_LEN);
        hex
    }
}

impl From<&Credentials> for CredentialKey {
    fn from(credentials: &Credentials) -> Self {
        credentials.key()
    }
}

impl fmt::Debug for CredentialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CredentialKey({})", self.fingerprint())
    }
}
