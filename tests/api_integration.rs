//! HTTP API integration tests
//!
//! Requests are driven through the router with `tower::ServiceExt::oneshot`,
//! so no listener is bound.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use microtemplate::config::Settings;
use microtemplate::server::{create_app, AppState};

const LIST: &str = "<ul><!--- B item ---><li><!--- n --->. <!--- label ---></li><!--- /B ---></ul>";

fn create_test_app() -> Router {
    create_app(AppState::new(Settings::default()))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };

    (status, value)
}

async fn create_list_template(app: &Router) {
    let (status, body) = send(
        app,
        "POST",
        "/api/v1/templates",
        Some(json!({"id": "list", "source": LIST, "description": "Numbered list"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["blocks"], json!(["item"]));
}

// =============================================================================
// Health & Metrics
// =============================================================================

#[tokio::test]
async fn test_health() {
    let app = create_test_app();
    let (status, body) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["templates"], 0);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let app = create_test_app();
    create_list_template(&app).await;
    let (status, body) = send(&app, "GET", "/metrics", None).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.as_str().unwrap().contains("microtemplate_templates_stored"));
}

// =============================================================================
// Template CRUD
// =============================================================================

#[tokio::test]
async fn test_template_crud() {
    let app = create_test_app();
    create_list_template(&app).await;

    let (status, body) = send(&app, "GET", "/api/v1/templates", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["templates"][0]["id"], "list");

    let (status, body) = send(&app, "GET", "/api/v1/templates/list", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["description"], "Numbered list");

    let (status, body) = send(
        &app,
        "PUT",
        "/api/v1/templates/list",
        Some(json!({"source": "<!--- B a ---><!--- /B ---><!--- B b ---><!--- /B --->"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["blocks"], json!(["a", "b"]));

    let (status, _) = send(&app, "DELETE", "/api/v1/templates/list", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, "GET", "/api/v1/templates/list", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "TEMPLATE_NOT_FOUND");
}

#[tokio::test]
async fn test_create_errors() {
    let app = create_test_app();
    create_list_template(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/templates",
        Some(json!({"id": "list", "source": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "TEMPLATE_EXISTS");

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/templates",
        Some(json!({"id": "bad/id", "source": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "INVALID_ID");

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/templates",
        Some(json!({"id": "broken", "source": "<!--- B open --->"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "UNTERMINATED_BLOCK");
}

#[tokio::test]
async fn test_update_requires_changes() {
    let app = create_test_app();
    create_list_template(&app).await;

    let (status, body) = send(&app, "PUT", "/api/v1/templates/list", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

// =============================================================================
// Rendering
// =============================================================================

#[tokio::test]
async fn test_render_block_escapes_html() {
    let app = create_test_app();
    create_list_template(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/templates/list/render",
        Some(json!({"block": "item", "env": {"n": 1, "label": "<b>bold</b>"}})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["output"], "<li>1. &lt;b&gt;bold&lt;/b&gt;</li>");
}

#[tokio::test]
async fn test_render_root_by_default() {
    let app = create_test_app();
    create_list_template(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/templates/list/render",
        Some(json!({"env": {"n": 7, "label": "x"}})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["output"], "<ul><li>7. x</li></ul>");
}

#[tokio::test]
async fn test_render_unknown_block() {
    let app = create_test_app();
    create_list_template(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/templates/list/render",
        Some(json!({"block": "nope"})),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "UNKNOWN_BLOCK");
}

#[tokio::test]
async fn test_render_each_with_index() {
    let app = create_test_app();
    create_list_template(&app).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/templates/list/render-each",
        Some(json!({
            "block": "item",
            "items": [{"label": "first"}, {"label": "second", "n": "last"}],
            "defaults": {"n": "?"},
            "index_key": "n"
        })),
    )
    .await;

    // The injected index overrides both the defaults and the item's own value
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["output"], "<li>0. first</li><li>1. second</li>");
}

#[tokio::test]
async fn test_evaluate() {
    let app = create_test_app();

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/evaluate",
        Some(json!({"text": "Sum: <!--- x --->", "env": {"x": 5}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["output"], "Sum: 5");

    let (status, body) = send(
        &app,
        "POST",
        "/api/v1/evaluate",
        Some(json!({"text": "<!--- /B --->"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "UNEXPECTED_END_MARKER");
}
