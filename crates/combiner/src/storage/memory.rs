//! In-memory storage backend for the bundle cache

use crate::cache::CachedBundle;
use crate::storage::BundleStore;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory storage backend
///
/// Stores bundles in a HashMap. Fast but non-persistent; expired entries
/// are dropped when read.
#[derive(Clone)]
pub struct MemoryStorage {
    cache: Arc<RwLock<HashMap<String, CachedBundle>>>,
}

impl MemoryStorage {
    /// Create a new memory storage backend
    pub fn new() -> Self {
        Self {
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Get cache size (number of entries, expired ones included)
    pub async fn size(&self) -> usize {
        self.cache.read().await.len()
    }

    /// Get total bytes stored
    pub async fn total_bytes(&self) -> usize {
        self.cache
            .read()
            .await
            .values()
            .map(|bundle| bundle.content.len())
            .sum()
    }

    /// Drop every expired entry, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let mut cache = self.cache.write().await;
        let before = cache.len();
        cache.retain(|_, bundle| !bundle.is_expired());
        before - cache.len()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BundleStore for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<CachedBundle>> {
        {
            let cache = self.cache.read().await;
            match cache.get(key) {
                Some(bundle) if !bundle.is_expired() => return Ok(Some(bundle.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Expired
        self.cache.write().await.remove(key);
        Ok(None)
    }

    async fn put(&self, key: &str, bundle: CachedBundle) -> Result<()> {
        let mut cache = self.cache.write().await;
        cache.insert(key.to_string(), bundle);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let cache = self.cache.read().await;
        Ok(cache.get(key).is_some_and(|bundle| !bundle.is_expired()))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut cache = self.cache.write().await;
        cache.remove(key);
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut cache = self.cache.write().await;
        cache.clear();
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let cache = self.cache.read().await;
        Ok(cache.keys().cloned().collect())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
