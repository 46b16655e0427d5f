//! Storage backends for the bundle cache

use crate::cache::CachedBundle;
use anyhow::Result;
use async_trait::async_trait;

pub mod filesystem;
pub mod memory;

#[cfg(feature = "dragonfly")]
pub mod dragonfly;

pub use filesystem::FilesystemStorage;
pub use memory::MemoryStorage;

/// Key-value store for built bundles
///
/// Entries are always written whole, so concurrent writers of one key are
/// last-write-wins. Backends do not return entries past their TTL.
#[async_trait]
pub trait BundleStore: Send + Sync {
    /// Get a cached bundle by key
    async fn get(&self, key: &str) -> Result<Option<CachedBundle>>;

    /// Store a bundle, replacing any previous entry
    async fn put(&self, key: &str, bundle: CachedBundle) -> Result<()>;

    /// Check if a live entry exists for a key
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Delete a cached bundle
    async fn delete(&self, key: &str) -> Result<()>;

    /// Clear all cached bundles
    async fn clear(&self) -> Result<()>;

    /// Get all cache keys
    async fn keys(&self) -> Result<Vec<String>>;

    /// Get storage backend name
    fn name(&self) -> &'static str;
}
