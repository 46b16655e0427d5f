//! Cached bundle types and utilities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::Duration;

/// A built bundle with its content hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedBundle {
    /// Concatenated file contents, exactly as read from disk
    pub content: Vec<u8>,

    /// Hex SHA-256 of `content`, without quotes
    pub etag: String,

    /// When the bundle was built
    pub generated_at: DateTime<Utc>,

    /// How long the bundle stays in the server-side cache
    pub ttl: Duration,
}

impl CachedBundle {
    /// Create a bundle, hashing its content
    pub fn new(content: impl Into<Vec<u8>>, ttl: Duration) -> Self {
        let content = content.into();
        let etag = content_hash(&content);
        Self {
            content,
            etag,
            generated_at: Utc::now(),
            ttl,
        }
    }

    /// Check if the bundle has outlived its TTL
    pub fn is_expired(&self) -> bool {
        self.age() >= self.ttl
    }

    /// Get the age of the bundle
    pub fn age(&self) -> Duration {
        Utc::now()
            .signed_duration_since(self.generated_at)
            .to_std()
            .unwrap_or(Duration::from_secs(0))
    }

    /// Check the bundle against ETags from `If-None-Match`
    pub fn matches_any(&self, etags: &[String]) -> bool {
        etags.iter().any(|etag| etag == &self.etag)
    }
}

/// Hex encoded SHA-256 digest
pub fn content_hash(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Wrap a bare ETag in quotes for the `ETag` header
pub fn quote_etag(etag: &str) -> String {
    format!("\"{}\"", etag)
}

/// Split an `If-None-Match` header into bare ETag values
///
/// Weak validators compare equal to strong ones and `*` is ignored.
pub fn parse_if_none_match(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .map(|tag| tag.strip_prefix("W/").unwrap_or(tag))
        .map(|tag| tag.trim_matches('"'))
        .filter(|tag| !tag.is_empty() && *tag != "*")
        .map(str::to_string)
        .collect()
}

/// Statistics for the bundle cache
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Total number of cache hits
    pub hits: u64,

    /// Total number of cache misses
    pub misses: u64,

    /// Total number of bundles built from disk
    pub builds: u64,

    /// Number of failed store operations
    pub store_errors: u64,
}

impl CacheStats {
    /// Calculate cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
