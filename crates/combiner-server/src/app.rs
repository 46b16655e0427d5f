use axum::{extract::State, response::Html, routing::get, Router};
use combiner::{AssetRegistry, Combiner};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::page;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    combiner: Arc<Combiner>,
    manifest: Arc<AssetRegistry>,
}

/// Bundle routes plus the demo index page
pub fn build_app(combiner: Combiner, manifest: AssetRegistry) -> Router {
    let bundles = combiner.router();

    let state = AppState {
        combiner: Arc::new(combiner),
        manifest: Arc::new(manifest),
    };

    Router::new()
        .route("/", get(index_handler))
        .with_state(state)
        .merge(bundles)
        .layer(TraceLayer::new_for_http())
}

async fn index_handler(State(state): State<AppState>) -> Html<String> {
    // URLs are rebuilt per render so files removed since startup drop out
    let js_url = state.combiner.js_url(&state.manifest);
    let css_url = state.combiner.css_url(&state.manifest);

    Html(page::index(&js_url, &css_url).into_string())
}
