//! The combiner: both asset pipelines wired to one cache

use crate::asset::AssetType;
use crate::config::{AssetConfig, Config};
use crate::engine::CacheEngine;
use crate::error::CombinerError;
use crate::handler::BundleHandler;
use crate::registry::AssetRegistry;
use crate::routes::bundle_routes;
use crate::url::{BaseUrl, UrlBuilder};
use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tracing::info;

/// Owns the JavaScript and CSS handlers and builds their routes and URLs
///
/// Construct one at startup and hand [`Combiner::router`] to the
/// application's route table.
pub struct Combiner {
    urls: UrlBuilder<BaseUrl>,
    javascript: Arc<BundleHandler>,
    css: Arc<BundleHandler>,
    cache: CacheEngine,
}

impl Combiner {
    pub fn new(base_url: &str, javascript: AssetConfig, css: AssetConfig, cache: CacheEngine) -> Self {
        Self {
            urls: UrlBuilder::new(BaseUrl::new(base_url)),
            javascript: Arc::new(BundleHandler::new(javascript, cache.clone())),
            css: Arc::new(BundleHandler::new(css, cache.clone())),
            cache,
        }
    }

    /// Build a combiner and its cache stores from configuration
    pub async fn from_config(config: &Config) -> Result<Self> {
        let cache = CacheEngine::new(config.cache_config()?).await?;
        info!(stores = ?cache.backends(), ttl = ?cache.ttl(), "bundle cache ready");

        Ok(Self::new(
            &config.base_url,
            config.asset(AssetType::JavaScript),
            config.asset(AssetType::Css),
            cache,
        ))
    }

    pub fn handler(&self, asset_type: AssetType) -> &Arc<BundleHandler> {
        match asset_type {
            AssetType::JavaScript => &self.javascript,
            AssetType::Css => &self.css,
        }
    }

    pub fn asset_config(&self, asset_type: AssetType) -> &AssetConfig {
        self.handler(asset_type).config()
    }

    pub fn cache(&self) -> &CacheEngine {
        &self.cache
    }

    /// Bundle URL for the registered files of one type
    pub fn url(&self, registry: &AssetRegistry, asset_type: AssetType) -> String {
        self.urls.build_url(registry, self.asset_config(asset_type))
    }

    pub fn js_url(&self, registry: &AssetRegistry) -> String {
        self.url(registry, AssetType::JavaScript)
    }

    pub fn css_url(&self, registry: &AssetRegistry) -> String {
        self.url(registry, AssetType::Css)
    }

    /// Routes for every enabled asset type
    pub fn router(&self) -> Router {
        AssetType::ALL
            .into_iter()
            .map(|asset_type| self.handler(asset_type))
            .filter(|handler| handler.config().enabled)
            .fold(Router::new(), |router, handler| {
                router.merge(bundle_routes(Arc::clone(handler)))
            })
    }
}

impl Config {
    /// Registry holding the `files` lists of both asset sections
    pub fn manifest(&self) -> Result<AssetRegistry, CombinerError> {
        let mut registry = AssetRegistry::new();
        for asset_type in AssetType::ALL {
            registry.register_many(asset_type, self.section(asset_type).files.iter().cloned())?;
        }
        Ok(registry)
    }
}
