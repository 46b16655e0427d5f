//! Request-time bundle handler: cache check, assembly and response headers

use crate::cache::{quote_etag, CachedBundle};
use crate::config::AssetConfig;
use crate::engine::CacheEngine;
use crate::request::BundleRequest;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// What a bundle request resolved to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleOutcome {
    /// The client already holds this ETag
    NotModified { etag: String },

    /// Served from the cache
    Cached(CachedBundle),

    /// Built from disk for this request
    Built(CachedBundle),
}

impl BundleOutcome {
    pub fn etag(&self) -> &str {
        match self {
            BundleOutcome::NotModified { etag } => etag,
            BundleOutcome::Cached(bundle) | BundleOutcome::Built(bundle) => &bundle.etag,
        }
    }
}

/// Serves bundles of one asset type
pub struct BundleHandler {
    config: AssetConfig,
    cache: CacheEngine,
}

impl BundleHandler {
    pub fn new(config: AssetConfig, cache: CacheEngine) -> Self {
        Self { config, cache }
    }

    pub fn config(&self) -> &AssetConfig {
        &self.config
    }

    /// Resolve a validated request against the cache and the asset directory
    ///
    /// `if_none_match` holds bare ETags from the request. Each one is tried
    /// as a cache key; without a hit the bundle is rebuilt from disk and
    /// stored under its fresh content hash.
    pub async fn serve(&self, request: &BundleRequest, if_none_match: &[String]) -> BundleOutcome {
        for etag in if_none_match {
            if let Some(bundle) = self.cache.get(&request.cache_key(etag)).await {
                self.cache.record_hit().await;
                debug!(asset_type = %self.config.asset_type, etag = %bundle.etag, "bundle cache hit");

                return if bundle.matches_any(if_none_match) {
                    BundleOutcome::NotModified { etag: bundle.etag }
                } else {
                    BundleOutcome::Cached(bundle)
                };
            }
        }

        self.cache.record_miss().await;

        let content = self.assemble(request).await;
        let bundle = CachedBundle::new(content, self.cache.ttl());
        self.cache.record_build().await;

        debug!(
            asset_type = %self.config.asset_type,
            files = request.count(),
            bytes = bundle.content.len(),
            etag = %bundle.etag,
            "built bundle"
        );

        self.cache.put(&request.cache_key(&bundle.etag), bundle.clone()).await;

        if bundle.matches_any(if_none_match) {
            BundleOutcome::NotModified { etag: bundle.etag }
        } else {
            BundleOutcome::Built(bundle)
        }
    }

    /// Concatenate the requested files that can be read, newline separated
    async fn assemble(&self, request: &BundleRequest) -> Vec<u8> {
        let Some(base) = canonical_base(&self.config.path).await else {
            warn!(path = %self.config.path.display(), "asset directory is missing");
            return Vec::new();
        };

        let mut parts = Vec::with_capacity(request.count());
        for (token, relative) in request.relative_paths() {
            if let Some(content) = self.read_asset(&base, token, &relative).await {
                parts.push(content);
            }
        }

        parts.join(&b'\n')
    }

    /// Read one asset, or `None` when it is skipped
    async fn read_asset(&self, base: &Path, token: &str, relative: &Path) -> Option<Vec<u8>> {
        if !self.config.asset_type.matches(token) {
            debug!(%token, "skipping file with foreign extension");
            return None;
        }

        let path = match fs::canonicalize(base.join(relative)).await {
            Ok(path) => path,
            Err(e) => {
                debug!(%token, error = %e, "skipping missing file");
                return None;
            }
        };

        if !path.starts_with(base) {
            warn!(%token, "skipping file outside the asset directory");
            return None;
        }

        match fs::read(&path).await {
            Ok(content) => Some(content),
            Err(e) => {
                debug!(%token, error = %e, "skipping unreadable file");
                None
            }
        }
    }

    /// Turn an outcome into an HTTP response with caching headers
    pub fn respond(&self, outcome: BundleOutcome) -> Response {
        let headers = [
            (header::ETAG, quote_etag(outcome.etag())),
            (header::CACHE_CONTROL, "public".to_string()),
            (header::VARY, "ETag".to_string()),
            (header::EXPIRES, http_date(self.expires_at())),
        ];

        match outcome {
            BundleOutcome::NotModified { .. } => (StatusCode::NOT_MODIFIED, headers).into_response(),
            BundleOutcome::Cached(bundle) | BundleOutcome::Built(bundle) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, self.config.asset_type.mime_type().to_string())],
                headers,
                bundle.content,
            )
                .into_response(),
        }
    }

    fn expires_at(&self) -> DateTime<Utc> {
        let now = Utc::now();
        chrono::Duration::from_std(self.config.expires)
            .ok()
            .and_then(|delta| now.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

async fn canonical_base(path: &Path) -> Option<PathBuf> {
    fs::canonicalize(path).await.ok()
}

/// IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`
pub fn http_date(time: DateTime<Utc>) -> String {
    time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
