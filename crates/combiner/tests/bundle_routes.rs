// End-to-end tests for the bundle routes, driven through the axum router

use anyhow::Result;
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use combiner::storage::MemoryStorage;
use combiner::{AssetConfig, AssetRegistry, AssetType, BundleStore, CacheEngine, CachedBundle, Combiner};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

/// Memory store that counts every call made to it
#[derive(Default)]
struct CountingStore {
    inner: MemoryStorage,
    calls: AtomicUsize,
}

impl CountingStore {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl BundleStore for CountingStore {
    async fn get(&self, key: &str) -> Result<Option<CachedBundle>> {
        self.touch();
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, bundle: CachedBundle) -> Result<()> {
        self.touch();
        self.inner.put(key, bundle).await
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.touch();
        self.inner.exists(key).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.touch();
        self.inner.delete(key).await
    }

    async fn clear(&self) -> Result<()> {
        self.touch();
        self.inner.clear().await
    }

    async fn keys(&self) -> Result<Vec<String>> {
        self.touch();
        self.inner.keys().await
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

struct TestApp {
    assets: TempDir,
    combiner: Combiner,
    store: Arc<CountingStore>,
}

impl TestApp {
    fn new() -> Self {
        Self::with_css(|css| css)
    }

    fn with_css(css: impl FnOnce(AssetConfig) -> AssetConfig) -> Self {
        let assets = TempDir::new().unwrap();
        let js_dir = assets.path().join("js");
        let css_dir = assets.path().join("css");

        std::fs::create_dir_all(js_dir.join("vendor")).unwrap();
        std::fs::create_dir_all(&css_dir).unwrap();
        std::fs::write(js_dir.join("a.js"), "var a = 1;").unwrap();
        std::fs::write(js_dir.join("b.js"), "var b = 2;").unwrap();
        std::fs::write(js_dir.join("vendor/lib.js"), "lib();").unwrap();
        std::fs::write(css_dir.join("site.css"), "body { margin: 0; }").unwrap();
        std::fs::write(assets.path().join("secret.js"), "secret();").unwrap();

        let store = Arc::new(CountingStore::default());
        let cache = CacheEngine::with_store(store.clone(), Duration::from_secs(3600));

        let combiner = Combiner::new(
            "http://localhost:3000",
            AssetConfig::new(AssetType::JavaScript, js_dir, "_js"),
            css(AssetConfig::new(AssetType::Css, css_dir, "/_css/")),
            cache,
        );

        Self {
            assets,
            combiner,
            store,
        }
    }

    fn js_dir(&self) -> std::path::PathBuf {
        self.assets.path().join("js")
    }

    fn router(&self) -> Router {
        self.combiner.router()
    }

    async fn get(&self, uri: &str) -> Response {
        self.get_with(uri, None).await
    }

    async fn get_with(&self, uri: &str, if_none_match: Option<&str>) -> Response {
        let mut request = Request::builder().uri(uri);
        if let Some(etag) = if_none_match {
            request = request.header(header::IF_NONE_MATCH, etag);
        }

        self.router()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }
}

async fn body_string(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn header_value(response: &Response, name: header::HeaderName) -> String {
    response
        .headers()
        .get(name)
        .map(|value| value.to_str().unwrap().to_string())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_serves_concatenated_bundle_with_headers() {
    let app = TestApp::new();

    let response = app.get("/_js/a.js,vendor~lib.js/2/").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_value(&response, header::CONTENT_TYPE), "text/javascript");
    assert_eq!(header_value(&response, header::CACHE_CONTROL), "public");
    assert_eq!(header_value(&response, header::VARY), "ETag");
    assert!(header_value(&response, header::EXPIRES).ends_with(" GMT"));

    let etag = header_value(&response, header::ETAG);
    assert!(etag.starts_with('"') && etag.ends_with('"'));
    assert_eq!(body_string(response).await, "var a = 1;\nlib();");
}

#[tokio::test]
async fn test_missing_files_are_omitted() {
    let app = TestApp::new();

    let response = app.get("/_js/a.js,missing.js,b.js/3/").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "var a = 1;\nvar b = 2;");
}

#[tokio::test]
async fn test_count_mismatch_is_rejected_without_side_effects() {
    let app = TestApp::new();

    let response = app.get("/_js/a.js,b.js/3/").await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(app.store.calls(), 0);
    assert_eq!(app.combiner.cache().stats().await.builds, 0);
}

#[tokio::test]
async fn test_non_numeric_count_is_rejected() {
    let app = TestApp::new();

    let response = app.get("/_js/a.js/one/").await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(app.store.calls(), 0);
}

#[tokio::test]
async fn test_identical_requests_are_byte_identical() {
    let app = TestApp::new();

    let first = app.get("/_js/a.js,b.js/2/").await;
    let second = app.get("/_js/a.js,b.js/2").await;

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(header_value(&first, header::ETAG), header_value(&second, header::ETAG));
    assert_eq!(body_string(first).await, body_string(second).await);
}

#[tokio::test]
async fn test_replayed_etag_is_not_modified() {
    let app = TestApp::new();

    let first = app.get("/_js/a.js,b.js/2/").await;
    let etag = header_value(&first, header::ETAG);

    let second = app.get_with("/_js/a.js,b.js/2/", Some(&etag)).await;

    assert_eq!(second.status(), StatusCode::NOT_MODIFIED);
    assert_eq!(header_value(&second, header::ETAG), etag);
    assert_eq!(body_string(second).await, "");

    let stats = app.combiner.cache().stats().await;
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.builds, 1);
}

#[tokio::test]
async fn test_unknown_etag_gets_full_response() {
    let app = TestApp::new();

    let response = app.get_with("/_js/a.js/1/", Some("\"not-a-real-etag\"")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "var a = 1;");
}

#[tokio::test]
async fn test_traversal_never_escapes_base_directory() {
    let app = TestApp::new();

    for uri in [
        "/_js/..~secret.js/1/",
        "/_js/..~..~etc~passwd/1/",
        "/_js/..%2Fsecret.js/1/",
        "/_js/..%5Csecret.js/1/",
    ] {
        let response = app.get(uri).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY, "{}", uri);
        assert!(!body_string(response).await.contains("secret();"));
    }

    assert_eq!(app.store.calls(), 0);
}

#[tokio::test]
async fn test_css_route() {
    let app = TestApp::new();

    let response = app.get("/_css/site.css,a.js/2/").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_value(&response, header::CONTENT_TYPE), "text/css");
    assert_eq!(body_string(response).await, "body { margin: 0; }");
}

#[tokio::test]
async fn test_disabled_asset_type_is_not_mounted() {
    let app = TestApp::with_css(AssetConfig::disabled);

    let response = app.get("/_css/site.css/1/").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.get("/_js/a.js/1/").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_generated_url_round_trips() {
    let app = TestApp::new();

    let mut registry = AssetRegistry::new();
    registry
        .register_many(AssetType::JavaScript, ["vendor/lib.js", "gone.js", "b.js"])
        .unwrap();

    let url = app.combiner.js_url(&registry);
    assert_eq!(url, "http://localhost:3000/_js/vendor~lib.js,b.js/2/");

    let path = url.trim_start_matches("http://localhost:3000");
    let response = app.get(path).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "lib();\nvar b = 2;");
}

#[tokio::test]
async fn test_generated_url_skips_unservable_registrations() {
    let app = TestApp::new();
    std::fs::write(app.js_dir().join("jquery@3.js"), "jq();").unwrap();

    let mut registry = AssetRegistry::new();
    registry
        .register_many(AssetType::JavaScript, ["../secret.js", "jquery@3.js", "a.js"])
        .unwrap();

    let url = app.combiner.js_url(&registry);
    assert_eq!(url, "http://localhost:3000/_js/a.js/1/");

    let response = app.get(url.trim_start_matches("http://localhost:3000")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "var a = 1;");
}

#[tokio::test]
async fn test_non_utf8_asset_is_served_byte_for_byte() {
    let app = TestApp::new();
    let css_dir = app.assets.path().join("css");
    std::fs::write(css_dir.join("a.css"), "a{}").unwrap();
    std::fs::write(css_dir.join("l1.css"), b"p:after{content:\"caf\xe9\"}").unwrap();

    let response = app.get("/_css/a.css,l1.css/2/").await;

    assert_eq!(response.status(), StatusCode::OK);
    let etag = header_value(&response, header::ETAG);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();

    let expected: &[u8] = b"a{}\np:after{content:\"caf\xe9\"}";
    assert_eq!(&body[..], expected);
    assert_eq!(etag, format!("\"{}\"", combiner::cache::content_hash(expected)));
}
