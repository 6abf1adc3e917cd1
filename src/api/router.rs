//! Queue API router.
//!
//! Returns a composable `Router` that can be mounted on any axum server.
//! Routes are nested under `/api/`.

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;
use crate::store::QueueRepository;

/// Build the queue API router over `queue`.
pub fn queue_api_router(queue: Arc<dyn QueueRepository>) -> Router {
    build_router(ApiContext::new(queue))
}

fn build_router(ctx: ApiContext) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_origin(Any);

    // The dashboard polls this; a cached list would show stale patients.
    let queue_route = get(endpoints::queue::list).layer(SetResponseHeaderLayer::overriding(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store"),
    ));

    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let api = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/submit", post(endpoints::intake::submit))
        .route("/queue", queue_route)
        .route("/complete/:id", post(endpoints::queue::complete))
        .with_state(ctx);

    Router::new().nest("/api", api).layer(cors)
}
