//! Bundle URL generation for page templates

use crate::config::AssetConfig;
use crate::registry::AssetRegistry;
use crate::request::{sanitize_token, token_path};
use std::path::Path;
use tracing::{debug, warn};

/// Turns an application path into an absolute URL
pub trait UrlGenerator: Send + Sync {
    fn to(&self, path: &str) -> String;
}

/// [`UrlGenerator`] that prefixes paths with a fixed base URL
#[derive(Debug, Clone)]
pub struct BaseUrl {
    base: String,
}

impl BaseUrl {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
        }
    }
}

impl UrlGenerator for BaseUrl {
    fn to(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }
}

/// Builds `{base}/{route}/{files}/{count}/` links from a registry
pub struct UrlBuilder<G = BaseUrl> {
    generator: G,
}

impl<G: UrlGenerator> UrlBuilder<G> {
    pub fn new(generator: G) -> Self {
        Self { generator }
    }

    /// Bundle URL for the files of `config.asset_type` in `registry`
    ///
    /// Returns an empty string when nothing is registered or the asset type
    /// is disabled. Files missing from disk at call time are left out and
    /// not counted, as are files the bundle route would refuse to serve.
    pub fn build_url(&self, registry: &AssetRegistry, config: &AssetConfig) -> String {
        let asset_type = config.asset_type;
        if !config.enabled || registry.is_empty(asset_type) {
            return String::new();
        }

        let present: Vec<String> = match config.path.canonicalize() {
            Ok(base) => registry
                .files(asset_type)
                .iter()
                .filter_map(|file| servable_token(&base, file))
                .collect(),
            Err(_) => Vec::new(),
        };

        debug!(
            %asset_type,
            registered = registry.files(asset_type).len(),
            present = present.len(),
            "built bundle url"
        );

        format!(
            "{}/{}/{}/",
            self.generator.to(config.route()),
            present.join(","),
            present.len()
        )
    }
}

/// URL token for `file` if it names a regular file inside `base`
fn servable_token(base: &Path, file: &str) -> Option<String> {
    let token = match sanitize_token(&encode_file(file)) {
        Ok(token) => token,
        Err(e) => {
            warn!(%file, error = %e, "registered asset cannot be bundled");
            return None;
        }
    };

    let path = base.join(token_path(&token)).canonicalize().ok()?;
    if !path.starts_with(base) {
        warn!(%file, "registered asset resolves outside the asset directory");
        return None;
    }

    path.is_file().then_some(token)
}

/// Encode a relative path as a single URL path segment
pub fn encode_file(file: &str) -> String {
    file.trim_start_matches('/').replace('/', "~")
}

/// Convenience for the common [`BaseUrl`] case
pub fn bundle_url(base_url: &str, registry: &AssetRegistry, config: &AssetConfig) -> String {
    UrlBuilder::new(BaseUrl::new(base_url)).build_url(registry, config)
}

impl AssetRegistry {
    /// Shorthand for [`bundle_url`] on this registry
    pub fn url(&self, base_url: &str, config: &AssetConfig) -> String {
        bundle_url(base_url, self, config)
    }
}
