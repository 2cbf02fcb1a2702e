//! API layer - HTTP endpoint handlers.

mod health;
mod metrics;
mod routes;
mod template;

pub use health::{health, HealthResponse};
pub use metrics::prometheus_metrics;
pub use routes::api_routes;
pub use template::{
    create_template, delete_template, evaluate, get_template, list_templates, render_each,
    render_template, update_template, EvaluateRequest, RenderEachRequest, RenderRequest,
    RenderResponse,
};
