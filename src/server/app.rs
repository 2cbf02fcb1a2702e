use axum::{http::HeaderValue, middleware, Router};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

use crate::api::api_routes;

use super::{record_http_metrics, AppState};

pub fn create_app(state: AppState) -> Router {
    // CORS configuration; no configured origins means any origin
    let origins: Vec<HeaderValue> = state
        .settings
        .server
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };
    let cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = state.settings.server.max_body_bytes;

    Router::new()
        // Merge API routes
        .merge(api_routes())
        // Route layer so the matched path is known when recording
        .route_layer(middleware::from_fn(record_http_metrics))
        // Add middleware
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Add state
        .with_state(state)
}
