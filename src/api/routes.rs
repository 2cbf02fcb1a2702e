use axum::{
    routing::{get, post},
    Router,
};

use crate::server::AppState;

use super::health::health;
use super::metrics::prometheus_metrics;
use super::template::{
    create_template, delete_template, evaluate, get_template, list_templates, render_each,
    render_template, update_template,
};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health & Metrics
        .route("/health", get(health))
        .route("/metrics", get(prometheus_metrics))
        // Template endpoints
        .nest(
            "/api/v1",
            Router::new()
                .route("/templates", get(list_templates).post(create_template))
                .route(
                    "/templates/{id}",
                    get(get_template)
                        .put(update_template)
                        .delete(delete_template),
                )
                .route("/templates/{id}/render", post(render_template))
                .route("/templates/{id}/render-each", post(render_each))
                .route("/evaluate", post(evaluate)),
        )
}
