//! Content keys, artifacts and cache entries
//!
//! A [`CacheEntry`] is immutable once written: a refresh writes a new entry
//! under the same key that supersedes the old one.

use crate::error::{TierError, TierResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Default freshness window for listing-class entries
pub const LISTING_TTL_MINUTES: i64 = 10;

/// Stable identifier for one unit of generated content
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentKey(String);

impl ContentKey {
    /// Create a key, rejecting blank input
    pub fn new(key: impl Into<String>) -> TierResult<Self> {
        let key = key.into();
        let trimmed = key.trim();
        if trimmed.is_empty() {
            return Err(TierError::InvalidKey(key));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How long a cached entry stays servable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentClass {
    /// Generated lesson content, cached indefinitely
    Lesson,
    /// Freshly fetched listings, served only inside the TTL
    Listing { ttl: Duration },
}

impl ContentClass {
    /// Listing class with the default 10 minute window
    pub fn listing() -> Self {
        Self::Listing {
            ttl: Duration::minutes(LISTING_TTL_MINUTES),
        }
    }

    /// Remote table holding entries of this class
    pub fn table(&self) -> &'static str {
        match self {
            Self::Lesson => "content_cache",
            Self::Listing { .. } => "listing_cache",
        }
    }

    /// All remote tables used for cached content
    pub fn tables() -> [&'static str; 2] {
        ["content_cache", "listing_cache"]
    }

    /// Namespace prefix for local mirror keys
    pub fn mirror_key(&self, key: &ContentKey) -> String {
        format!("{}/{}", self.table(), key)
    }
}

/// Cached payload for one key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// Primary generated content
    pub body: String,

    /// Secondary data derived from the body (vocabulary, quiz, ...)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub derived: BTreeMap<String, serde_json::Value>,
}

impl Artifact {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            derived: BTreeMap::new(),
        }
    }

    pub fn with_derived(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.derived.insert(name.into(), value);
        self
    }
}

/// Stored form of an artifact in either tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: ContentKey,
    pub payload: Artifact,
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(key: ContentKey, payload: Artifact, created_at: DateTime<Utc>) -> Self {
        Self {
            key,
            payload,
            created_at,
        }
    }

    /// Whether the entry may still be served for this class
    pub fn is_fresh(&self, class: ContentClass, now: DateTime<Utc>) -> bool {
        match class {
            ContentClass::Lesson => true,
            ContentClass::Listing { ttl } => now - self.created_at < ttl,
        }
    }

    /// Validate an untrusted record.
    ///
    /// Anything that does not decode cleanly, names another key, or carries
    /// an empty body is rejected and should be treated as a miss.
    pub fn from_record(record: &serde_json::Value, expected: &ContentKey) -> Option<Self> {
        let entry: CacheEntry = match serde_json::from_value(record.clone()) {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Rejecting malformed cache record for {}: {}", expected, e);
                return None;
            }
        };

        if &entry.key != expected {
            debug!(
                "Rejecting cache record for {}: key mismatch ({})",
                expected, entry.key
            );
            return None;
        }

        if entry.payload.body.trim().is_empty() {
            debug!("Rejecting cache record for {}: empty body", expected);
            return None;
        }

        Some(entry)
    }

    /// Decode a mirror string with the same validation as remote records
    pub fn from_mirror(raw: &str, expected: &ContentKey) -> Option<Self> {
        let value: serde_json::Value = serde_json::from_str(raw).ok()?;
        Self::from_record(&value, expected)
    }
}
