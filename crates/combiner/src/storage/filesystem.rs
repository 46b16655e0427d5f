//! Filesystem storage backend for the bundle cache

use crate::cache::{content_hash, CachedBundle};
use crate::config::FilesystemConfig;
use crate::storage::BundleStore;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;
use tokio::fs;
use tracing::debug;
use walkdir::WalkDir;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// On-disk entry; keeps the original key since file names are hashed
#[derive(Serialize, Deserialize)]
struct Entry {
    key: String,
    bundle: CachedBundle,
}

/// Filesystem storage backend
///
/// Stores bundles as JSON files on disk, one per key.
/// Persistent across restarts, suitable for single-instance deployments.
#[derive(Clone)]
pub struct FilesystemStorage {
    config: FilesystemConfig,
}

impl FilesystemStorage {
    /// Create a new filesystem storage backend
    pub async fn new(config: FilesystemConfig) -> Result<Self> {
        fs::create_dir_all(&config.path)
            .await
            .context("Failed to create cache directory")?;

        Ok(Self { config })
    }

    /// Get the file path for a cache key
    ///
    /// Keys embed whole file lists and can outgrow file name limits, so the
    /// name is the key's hash.
    fn key_to_path(&self, key: &str) -> PathBuf {
        self.config
            .path
            .join(format!("{}.json", content_hash(key.as_bytes())))
    }

    /// Scratch path next to `path` that `entry_files` never lists
    fn temp_path(path: &Path) -> PathBuf {
        let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        path.with_extension(format!("json.{}.{}.tmp", std::process::id(), n))
    }

    async fn read_entry(path: &Path) -> Result<Entry> {
        let content = fs::read_to_string(path)
            .await
            .context("Failed to read cache file")?;

        serde_json::from_str(&content).context("Failed to deserialize cached bundle")
    }

    fn entry_files(&self) -> impl Iterator<Item = walkdir::DirEntry> {
        WalkDir::new(&self.config.path)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
    }

    /// Get cache directory size in bytes
    pub fn total_size_bytes(&self) -> u64 {
        self.entry_files()
            .filter_map(|entry| entry.metadata().ok())
            .map(|metadata| metadata.len())
            .sum()
    }

    /// Check if cache size exceeds maximum
    pub fn is_over_limit(&self) -> bool {
        self.total_size_bytes() > self.config.max_size_mb * 1024 * 1024
    }

    /// Evict least recently written entries until under limit
    pub async fn evict_if_needed(&self) -> Result<()> {
        if !self.is_over_limit() {
            return Ok(());
        }

        let mut entries: Vec<(PathBuf, SystemTime)> = self
            .entry_files()
            .filter_map(|entry| {
                let modified = entry.metadata().ok()?.modified().ok()?;
                Some((entry.into_path(), modified))
            })
            .collect();

        // Oldest first
        entries.sort_by_key(|(_, time)| *time);

        for (path, _) in entries {
            fs::remove_file(&path).await.ok();
            debug!(path = %path.display(), "evicted cached bundle");

            if !self.is_over_limit() {
                break;
            }
        }

        Ok(())
    }
}

#[async_trait]
impl BundleStore for FilesystemStorage {
    async fn get(&self, key: &str) -> Result<Option<CachedBundle>> {
        let path = self.key_to_path(key);

        if !path.exists() {
            return Ok(None);
        }

        let entry = Self::read_entry(&path).await?;

        if entry.bundle.is_expired() {
            fs::remove_file(&path).await.ok();
            return Ok(None);
        }

        Ok(Some(entry.bundle))
    }

    async fn put(&self, key: &str, bundle: CachedBundle) -> Result<()> {
        let path = self.key_to_path(key);
        let entry = Entry {
            key: key.to_string(),
            bundle,
        };

        let json = serde_json::to_string(&entry).context("Failed to serialize bundle")?;

        // Readers only ever see a complete file
        let temp = Self::temp_path(&path);
        fs::write(&temp, json)
            .await
            .context("Failed to write cache file")?;

        if let Err(e) = fs::rename(&temp, &path).await {
            fs::remove_file(&temp).await.ok();
            return Err(e).context("Failed to move cache file into place");
        }

        self.evict_if_needed().await.ok();

        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.key_to_path(key);

        if path.exists() {
            fs::remove_file(&path)
                .await
                .context("Failed to delete cache file")?;
        }

        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        for entry in self.entry_files() {
            fs::remove_file(entry.path()).await.ok();
        }

        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();

        for file in self.entry_files() {
            if let Ok(entry) = Self::read_entry(file.path()).await {
                keys.push(entry.key);
            }
        }

        Ok(keys)
    }

    fn name(&self) -> &'static str {
        "filesystem"
    }
}
