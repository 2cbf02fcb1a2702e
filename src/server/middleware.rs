use axum::{
    body::Body,
    extract::MatchedPath,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::metrics::HttpMetrics;

/// Count every routed request by matched route and response status.
///
/// Labels use the route pattern (`/api/v1/templates/{id}`), never the raw path.
pub async fn record_http_metrics(req: Request<Body>, next: Next) -> Response {
    let endpoint = req
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(req).await;
    HttpMetrics::record_request(&endpoint, response.status().as_u16());

    response
}
