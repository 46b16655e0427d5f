// File: src/config.rs
// Purpose: Configuration parsing from combiner.toml

use crate::asset::AssetType;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Absolute base URL bundle links are generated against
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub javascript: AssetSection,

    #[serde(default)]
    pub css: AssetSection,

    #[serde(default)]
    pub cache: CacheSection,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

/// `[javascript]` / `[css]` section as written in the file
///
/// `path` and `route` default per asset type, see [`Config::asset`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Base directory the asset files live in
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// URL prefix the bundle route is mounted under
    #[serde(default)]
    pub route: Option<String>,

    /// Seconds until a served bundle expires on the client
    #[serde(default = "default_expires")]
    pub expires: u64,

    /// Files registered for the site-wide bundle
    #[serde(default)]
    pub files: Vec<String>,
}

/// Resolved settings for one asset type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetConfig {
    pub asset_type: AssetType,
    pub enabled: bool,
    pub path: PathBuf,
    route: String,
    pub expires: Duration,
}

impl AssetConfig {
    pub fn new(asset_type: AssetType, path: impl Into<PathBuf>, route: &str) -> Self {
        Self {
            asset_type,
            enabled: true,
            path: path.into(),
            route: normalize_route(route),
            expires: Duration::from_secs(default_expires()),
        }
    }

    pub fn with_expires(mut self, expires: Duration) -> Self {
        self.expires = expires;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Route prefix with a leading slash and no trailing slash, e.g. `/_js`
    pub fn route(&self) -> &str {
        &self.route
    }
}

/// `[cache]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSection {
    /// Seconds a built bundle stays in the server-side cache
    #[serde(default = "default_cache_ttl")]
    pub ttl: u64,

    #[serde(default)]
    pub storage: StorageTomlConfig,
}

/// `[cache.storage]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageTomlConfig {
    /// Primary storage backend: "memory", "filesystem", or "dragonfly"
    #[serde(default = "default_storage")]
    pub primary: String,

    /// Optional fallback storage backend
    #[serde(default)]
    pub fallback: Option<String>,

    /// Filesystem-specific config
    #[serde(default)]
    pub filesystem: Option<FilesystemConfig>,

    /// Dragonfly-specific config
    #[serde(default)]
    pub dragonfly: Option<DragonflyConfig>,
}

/// Runtime cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub storage: StorageBackend,
    pub fallback: Option<StorageBackend>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(default_cache_ttl()),
            storage: StorageBackend::Memory,
            fallback: None,
        }
    }
}

/// Storage backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageBackend {
    /// In-memory storage (fast, non-persistent)
    Memory,

    /// Filesystem storage (persistent, single-instance)
    Filesystem(FilesystemConfig),

    /// Dragonfly/Redis storage (shared between instances)
    Dragonfly(DragonflyConfig),
}

/// Filesystem storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesystemConfig {
    /// Cache directory path
    pub path: PathBuf,

    /// Maximum cache size in megabytes
    pub max_size_mb: u64,
}

impl Default for FilesystemConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".combiner/cache"),
            max_size_mb: 100,
        }
    }
}

/// Dragonfly (Redis-compatible) storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DragonflyConfig {
    /// Redis/Dragonfly connection URL
    pub url: String,

    /// Key prefix for bundle cache entries
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl Default for DragonflyConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            key_prefix: default_key_prefix(),
        }
    }
}

// Default values
fn default_base_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_true() -> bool {
    true
}

// 30 days
fn default_expires() -> u64 {
    60 * 60 * 24 * 30
}

fn default_cache_ttl() -> u64 {
    60 * 60
}

fn default_storage() -> String {
    "memory".to_string()
}

fn default_key_prefix() -> String {
    "combiner:bundle:".to_string()
}

fn normalize_route(route: &str) -> String {
    format!("/{}", route.trim_matches('/'))
}

// Default implementations
impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            server: ServerConfig::default(),
            javascript: AssetSection::default(),
            css: AssetSection::default(),
            cache: CacheSection::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

impl Default for AssetSection {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
            route: None,
            expires: default_expires(),
            files: Vec::new(),
        }
    }
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            ttl: default_cache_ttl(),
            storage: StorageTomlConfig::default(),
        }
    }
}

impl Default for StorageTomlConfig {
    fn default() -> Self {
        Self {
            primary: default_storage(),
            fallback: None,
            filesystem: None,
            dragonfly: None,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // If file doesn't exist or is empty, return default config
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }

    /// Load configuration from default path (./combiner.toml)
    pub fn load_default() -> Result<Self> {
        Self::load("combiner.toml")
    }

    /// The raw section for an asset type
    pub fn section(&self, asset_type: AssetType) -> &AssetSection {
        match asset_type {
            AssetType::JavaScript => &self.javascript,
            AssetType::Css => &self.css,
        }
    }

    /// Resolved settings for an asset type
    pub fn asset(&self, asset_type: AssetType) -> AssetConfig {
        let section = self.section(asset_type);

        let (default_path, default_route) = match asset_type {
            AssetType::JavaScript => ("resources/assets/js/", "_js"),
            AssetType::Css => ("resources/assets/css/", "_css"),
        };

        let path = section
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from(default_path));
        let route = section.route.as_deref().unwrap_or(default_route);

        let config = AssetConfig::new(asset_type, path, route)
            .with_expires(Duration::from_secs(section.expires));

        if section.enabled {
            config
        } else {
            config.disabled()
        }
    }

    /// Convert the `[cache]` section to runtime config
    pub fn cache_config(&self) -> Result<CacheConfig> {
        let storage = &self.cache.storage;
        let primary = self.parse_storage_backend(&storage.primary)?;

        let fallback = if let Some(ref fallback_type) = storage.fallback {
            Some(self.parse_storage_backend(fallback_type)?)
        } else {
            None
        };

        Ok(CacheConfig {
            ttl: Duration::from_secs(self.cache.ttl),
            storage: primary,
            fallback,
        })
    }

    fn parse_storage_backend(&self, backend_type: &str) -> Result<StorageBackend> {
        let storage = &self.cache.storage;
        match backend_type {
            "memory" => Ok(StorageBackend::Memory),
            "filesystem" => {
                let config = storage.filesystem.clone().unwrap_or_default();
                Ok(StorageBackend::Filesystem(config))
            }
            "dragonfly" => {
                let config = storage.dragonfly.clone().ok_or_else(|| {
                    anyhow::anyhow!("Dragonfly storage requires [cache.storage.dragonfly] configuration")
                })?;
                Ok(StorageBackend::Dragonfly(config))
            }
            _ => Err(anyhow::anyhow!("Unknown storage backend: {}", backend_type)),
        }
    }
}
