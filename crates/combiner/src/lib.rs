//! # Combiner - JavaScript and CSS bundle serving
//!
//! Pages register the asset files they need, link one combined URL per asset
//! type, and the bundle routes serve the concatenated files with `ETag`,
//! `Cache-Control` and `Expires` headers. Built bundles are kept in a
//! key-value cache keyed by content hash, file list and count.
//!
//! ## Features
//!
//! - **Asset registry**: ordered, deduplicated file lists per asset type
//! - **Bundle URLs**: `{base}/{route}/{files}/{count}/` links for templates
//! - **Conditional GET**: `If-None-Match` answered with `304 Not Modified`
//! - **Storage backends**: Memory, Filesystem, Dragonfly (Redis)
//!
//! ## Example
//!
//! ```rust,no_run
//! use combiner::{AssetRegistry, AssetType, Combiner, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load_default()?;
//!     let combiner = Combiner::from_config(&config).await?;
//!
//!     let mut registry = AssetRegistry::new();
//!     registry.register_many(AssetType::JavaScript, ["vendor/jquery.js", "app.js"])?;
//!     println!("<script src=\"{}\"></script>", combiner.js_url(&registry));
//!
//!     let app = combiner.router();
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod asset;
pub mod cache;
pub mod combiner;
pub mod config;
pub mod engine;
pub mod error;
pub mod handler;
pub mod registry;
pub mod request;
pub mod routes;
pub mod storage;
pub mod url;

pub use asset::AssetType;
pub use cache::{CacheStats, CachedBundle};
pub use combiner::Combiner;
pub use config::{AssetConfig, CacheConfig, Config, StorageBackend};
pub use engine::CacheEngine;
pub use error::{CombinerError, ValidationError};
pub use handler::{BundleHandler, BundleOutcome};
pub use registry::AssetRegistry;
pub use request::BundleRequest;
pub use routes::bundle_routes;
pub use storage::BundleStore;
pub use url::{BaseUrl, UrlBuilder, UrlGenerator};
