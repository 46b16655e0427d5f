//! Cache engine - primary/fallback stores with degrade-to-miss semantics

use crate::cache::{CacheStats, CachedBundle};
use crate::config::{CacheConfig, StorageBackend};
use crate::storage::{BundleStore, FilesystemStorage, MemoryStorage};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Bundle cache over one or two [`BundleStore`]s
///
/// Store failures are logged and never surface to callers: a failed read
/// is a miss and a failed write is dropped.
#[derive(Clone)]
pub struct CacheEngine {
    ttl: Duration,
    primary_storage: Arc<dyn BundleStore>,
    fallback_storage: Option<Arc<dyn BundleStore>>,
    stats: Arc<RwLock<CacheStats>>,
}

impl CacheEngine {
    /// Create a cache engine from configuration
    pub async fn new(config: CacheConfig) -> Result<Self> {
        let primary_storage = Self::create_storage(&config.storage).await?;

        let fallback_storage = if let Some(ref fallback_config) = config.fallback {
            Some(Self::create_storage(fallback_config).await?)
        } else {
            None
        };

        Ok(Self {
            ttl: config.ttl,
            primary_storage,
            fallback_storage,
            stats: Arc::new(RwLock::new(CacheStats::default())),
        })
    }

    /// Create a cache engine over an existing store
    pub fn with_store(store: Arc<dyn BundleStore>, ttl: Duration) -> Self {
        Self {
            ttl,
            primary_storage: store,
            fallback_storage: None,
            stats: Arc::new(RwLock::new(CacheStats::default())),
        }
    }

    /// Add a fallback store consulted when the primary misses
    pub fn with_fallback(mut self, store: Arc<dyn BundleStore>) -> Self {
        self.fallback_storage = Some(store);
        self
    }

    /// Create a storage backend from config
    async fn create_storage(backend: &StorageBackend) -> Result<Arc<dyn BundleStore>> {
        match backend {
            StorageBackend::Memory => Ok(Arc::new(MemoryStorage::new())),
            StorageBackend::Filesystem(config) => {
                let storage = FilesystemStorage::new(config.clone()).await?;
                Ok(Arc::new(storage))
            }
            #[cfg(feature = "dragonfly")]
            StorageBackend::Dragonfly(config) => {
                use crate::storage::dragonfly::DragonflyStorage;
                let storage = DragonflyStorage::new(config.clone()).await?;
                Ok(Arc::new(storage))
            }
            #[cfg(not(feature = "dragonfly"))]
            StorageBackend::Dragonfly(_) => {
                anyhow::bail!("Dragonfly storage requires the 'dragonfly' feature to be enabled")
            }
        }
    }

    /// TTL given to newly built bundles
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Names of the configured stores, primary first
    pub fn backends(&self) -> Vec<&'static str> {
        std::iter::once(self.primary_storage.name())
            .chain(self.fallback_storage.as_ref().map(|s| s.name()))
            .collect()
    }

    /// Look up a bundle, trying the fallback store when the primary misses
    pub async fn get(&self, key: &str) -> Option<CachedBundle> {
        match self.primary_storage.get(key).await {
            Ok(Some(bundle)) => return Some(bundle),
            Ok(None) => {}
            Err(e) => self.store_failed(self.primary_storage.name(), "get", &e).await,
        }

        let fallback = self.fallback_storage.as_ref()?;
        match fallback.get(key).await {
            Ok(Some(bundle)) => {
                debug!(%key, "promoting bundle from fallback store");
                if let Err(e) = self.primary_storage.put(key, bundle.clone()).await {
                    self.store_failed(self.primary_storage.name(), "put", &e).await;
                }
                Some(bundle)
            }
            Ok(None) => None,
            Err(e) => {
                self.store_failed(fallback.name(), "get", &e).await;
                None
            }
        }
    }

    /// Store a bundle in every configured store
    pub async fn put(&self, key: &str, bundle: CachedBundle) {
        if let Some(ref fallback) = self.fallback_storage {
            if let Err(e) = fallback.put(key, bundle.clone()).await {
                self.store_failed(fallback.name(), "put", &e).await;
            }
        }

        if let Err(e) = self.primary_storage.put(key, bundle).await {
            self.store_failed(self.primary_storage.name(), "put", &e).await;
        }
    }

    /// Remove a bundle from every configured store
    pub async fn delete(&self, key: &str) -> Result<()> {
        self.primary_storage.delete(key).await?;

        if let Some(ref fallback) = self.fallback_storage {
            fallback.delete(key).await.ok();
        }

        Ok(())
    }

    /// Clear all cached bundles and reset stats
    pub async fn clear(&self) -> Result<()> {
        self.primary_storage.clear().await?;

        if let Some(ref fallback) = self.fallback_storage {
            fallback.clear().await.ok();
        }

        let mut stats = self.stats.write().await;
        *stats = CacheStats::default();

        Ok(())
    }

    /// Get all cached bundle keys in the primary store
    pub async fn keys(&self) -> Result<Vec<String>> {
        self.primary_storage.keys().await
    }

    /// Get cache statistics
    pub async fn stats(&self) -> CacheStats {
        self.stats.read().await.clone()
    }

    pub(crate) async fn record_hit(&self) {
        self.stats.write().await.hits += 1;
    }

    pub(crate) async fn record_miss(&self) {
        self.stats.write().await.misses += 1;
    }

    pub(crate) async fn record_build(&self) {
        self.stats.write().await.builds += 1;
    }

    async fn store_failed(&self, store: &str, op: &str, error: &anyhow::Error) {
        warn!(store, op, error = %error, "bundle cache store failed, continuing without it");
        self.stats.write().await.store_errors += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Store whose every operation fails
    struct BrokenStore;

    #[async_trait]
    impl BundleStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<CachedBundle>> {
            anyhow::bail!("connection refused")
        }
        async fn put(&self, _key: &str, _bundle: CachedBundle) -> Result<()> {
            anyhow::bail!("connection refused")
        }
        async fn exists(&self, _key: &str) -> Result<bool> {
            anyhow::bail!("connection refused")
        }
        async fn delete(&self, _key: &str) -> Result<()> {
            anyhow::bail!("connection refused")
        }
        async fn clear(&self) -> Result<()> {
            anyhow::bail!("connection refused")
        }
        async fn keys(&self) -> Result<Vec<String>> {
            anyhow::bail!("connection refused")
        }
        fn name(&self) -> &'static str {
            "broken"
        }
    }

    fn bundle(content: &str) -> CachedBundle {
        CachedBundle::new(content, Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_engine_memory_backend() {
        let engine = CacheEngine::new(CacheConfig::default()).await.unwrap();
        assert_eq!(engine.backends(), vec!["memory"]);
        assert_eq!(engine.ttl(), Duration::from_secs(3600));

        engine.put("key", bundle("test content")).await;
        assert_eq!(engine.get("key").await.map(|b| b.content), Some(b"test content".to_vec()));

        engine.delete("key").await.unwrap();
        assert!(engine.get("key").await.is_none());
    }

    #[tokio::test]
    async fn test_engine_fallback_promotion() {
        let primary = Arc::new(MemoryStorage::new());
        let fallback = Arc::new(MemoryStorage::new());
        fallback.put("key", bundle("from fallback")).await.unwrap();

        let engine = CacheEngine::with_store(primary.clone(), Duration::from_secs(60))
            .with_fallback(fallback);

        assert_eq!(engine.get("key").await.map(|b| b.content), Some(b"from fallback".to_vec()));
        assert!(primary.exists("key").await.unwrap());
    }

    #[tokio::test]
    async fn test_broken_store_degrades_to_miss() {
        let engine = CacheEngine::with_store(Arc::new(BrokenStore), Duration::from_secs(60));

        engine.put("key", bundle("lost")).await;
        assert!(engine.get("key").await.is_none());
        assert_eq!(engine.stats().await.store_errors, 2);
    }

    #[tokio::test]
    async fn test_broken_primary_still_uses_fallback() {
        let fallback = Arc::new(MemoryStorage::new());
        let engine = CacheEngine::with_store(Arc::new(BrokenStore), Duration::from_secs(60))
            .with_fallback(fallback.clone());

        engine.put("key", bundle("kept")).await;
        assert!(fallback.exists("key").await.unwrap());
        assert_eq!(engine.get("key").await.map(|b| b.content), Some(b"kept".to_vec()));
    }

    #[tokio::test]
    async fn test_engine_stats() {
        let engine = CacheEngine::with_store(Arc::new(MemoryStorage::new()), Duration::from_secs(60));

        engine.record_hit().await;
        engine.record_hit().await;
        engine.record_miss().await;
        engine.record_build().await;

        let stats = engine.stats().await;
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.builds, 1);

        engine.clear().await.unwrap();
        assert_eq!(engine.stats().await, CacheStats::default());
    }

    #[tokio::test]
    async fn test_dragonfly_without_feature() {
        let config = CacheConfig {
            storage: StorageBackend::Dragonfly(Default::default()),
            ..Default::default()
        };

        if cfg!(not(feature = "dragonfly")) {
            assert!(CacheEngine::new(config).await.is_err());
        }
    }
}
