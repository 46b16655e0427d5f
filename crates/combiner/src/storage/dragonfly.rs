//! Dragonfly (Redis-compatible) storage backend for the bundle cache

use crate::cache::CachedBundle;
use crate::config::DragonflyConfig;
use crate::storage::BundleStore;
use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

/// Dragonfly storage backend
///
/// Stores bundles in Dragonfly (or Redis), shared between server instances.
/// Expiry is delegated to the server through `SET EX`.
#[derive(Clone)]
pub struct DragonflyStorage {
    manager: ConnectionManager,
    config: DragonflyConfig,
}

impl DragonflyStorage {
    /// Create a new Dragonfly storage backend
    pub async fn new(config: DragonflyConfig) -> Result<Self> {
        let client = Client::open(config.url.as_str())
            .context("Failed to create Redis/Dragonfly client")?;

        let manager = ConnectionManager::new(client)
            .await
            .context("Failed to create connection manager")?;

        Ok(Self { manager, config })
    }

    /// Get the full key with prefix
    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.config.key_prefix, key)
    }

    /// Test connection to Dragonfly/Redis
    pub async fn ping(&self) -> Result<bool> {
        let mut conn = self.manager.clone();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .context("Failed to ping Redis/Dragonfly")?;

        Ok(pong == "PONG")
    }

    async fn prefixed_keys(&self) -> Result<Vec<String>> {
        let mut conn = self.manager.clone();
        let pattern = format!("{}*", self.config.key_prefix);

        redis::cmd("KEYS")
            .arg(&pattern)
            .query_async(&mut conn)
            .await
            .context("Failed to list keys")
    }
}

#[async_trait]
impl BundleStore for DragonflyStorage {
    async fn get(&self, key: &str) -> Result<Option<CachedBundle>> {
        let mut conn = self.manager.clone();

        let json: Option<String> = conn
            .get(self.full_key(key))
            .await
            .context("Failed to get from Redis/Dragonfly")?;

        match json {
            Some(json_str) => {
                let bundle: CachedBundle = serde_json::from_str(&json_str)
                    .context("Failed to deserialize cached bundle")?;
                Ok(Some(bundle))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, bundle: CachedBundle) -> Result<()> {
        let mut conn = self.manager.clone();

        let json = serde_json::to_string(&bundle).context("Failed to serialize bundle")?;
        let ttl_secs = bundle.ttl.as_secs().max(1) as usize;

        let _: () = conn
            .set_ex(self.full_key(key), json, ttl_secs)
            .await
            .context("Failed to set in Redis/Dragonfly")?;

        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.manager.clone();

        let exists: bool = conn
            .exists(self.full_key(key))
            .await
            .context("Failed to check existence in Redis/Dragonfly")?;

        Ok(exists)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.manager.clone();

        let _: () = conn
            .del(self.full_key(key))
            .await
            .context("Failed to delete from Redis/Dragonfly")?;

        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let keys = self.prefixed_keys().await?;

        if !keys.is_empty() {
            let mut conn = self.manager.clone();
            let _: () = conn.del(&keys).await.context("Failed to delete keys")?;
        }

        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let prefix_len = self.config.key_prefix.len();
        let keys = self
            .prefixed_keys()
            .await?
            .into_iter()
            .map(|k| k[prefix_len..].to_string())
            .collect();

        Ok(keys)
    }

    fn name(&self) -> &'static str {
        "dragonfly"
    }
}
