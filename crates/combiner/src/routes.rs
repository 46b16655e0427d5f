//! axum routes for bundle handlers

use crate::cache::parse_if_none_match;
use crate::handler::BundleHandler;
use crate::request::BundleRequest;
use axum::{
    extract::{Path, State},
    http::{header::IF_NONE_MATCH, HeaderMap},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Mount `GET {route}/{files}/{count}/` for one handler
pub fn bundle_routes(handler: Arc<BundleHandler>) -> Router {
    let route = handler.config().route().trim_end_matches('/');
    let pattern = format!("{}/*bundle", route);

    info!(asset_type = %handler.config().asset_type, route = %pattern, "mounting bundle route");

    Router::new()
        .route(&pattern, get(bundle_handler))
        .with_state(handler)
}

async fn bundle_handler(
    State(handler): State<Arc<BundleHandler>>,
    Path(bundle): Path<String>,
    headers: HeaderMap,
) -> Response {
    let request = match BundleRequest::from_path(&bundle) {
        Ok(request) => request,
        Err(e) => {
            debug!(path = %bundle, error = %e, "rejected bundle request");
            return e.into_response();
        }
    };

    let etags = if_none_match(&headers);
    let outcome = handler.serve(&request, &etags).await;
    handler.respond(outcome)
}

/// Bare ETags from every `If-None-Match` header on the request
fn if_none_match(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(IF_NONE_MATCH)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(parse_if_none_match)
        .collect()
}
