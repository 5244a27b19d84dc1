use axum::Router;
use axum::http::Method;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};

use crate::routes;
use crate::state::AppState;

pub(crate) fn build_app(state: AppState) -> Router {
    // Dashboard pages are served from elsewhere; the API is read-only.
    let cors = CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_origin(Any);

    Router::new()
        .route(
            "/api/war/statistics",
            axum::routing::get(routes::api::get_statistics),
        )
        .route(
            "/api/planets/coordinates",
            axum::routing::get(routes::api::get_planets),
        )
        .route(
            "/api/events",
            axum::routing::get(routes::sse::dashboard_events),
        )
        .route("/api/health", axum::routing::get(routes::api::health))
        .route("/api/metrics", axum::routing::get(routes::api::metrics))
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}
