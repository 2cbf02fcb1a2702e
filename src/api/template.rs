//! Template CRUD and render endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::server::AppState;
use crate::template::{
    CreateTemplateRequest, Environment, TemplateInfo, TemplateListResponse, UpdateTemplateRequest,
    ROOT_BLOCK,
};

/// Request to render one block
#[derive(Debug, Deserialize)]
pub struct RenderRequest {
    /// Block name; the root block when omitted
    #[serde(default = "root_block")]
    pub block: String,

    #[serde(default)]
    pub env: Environment,
}

/// Request to render one block once per item
#[derive(Debug, Deserialize)]
pub struct RenderEachRequest {
    pub block: String,

    #[serde(default)]
    pub items: Vec<Environment>,

    /// Values shared by every item; item keys win on conflict
    #[serde(default)]
    pub defaults: Environment,

    /// Key under which each item receives its zero-based index
    pub index_key: Option<String>,
}

/// Request to render ad hoc template text
#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub text: String,

    #[serde(default)]
    pub env: Environment,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RenderResponse {
    pub output: String,
}

fn root_block() -> String {
    ROOT_BLOCK.to_string()
}

/// POST /api/v1/templates - Compile and store a new template
#[tracing::instrument(
    name = "http.create_template",
    skip(state, request),
    fields(template_id = %request.id)
)]
pub async fn create_template(
    State(state): State<AppState>,
    Json(request): Json<CreateTemplateRequest>,
) -> Result<(StatusCode, Json<TemplateInfo>)> {
    let created = state
        .template_store
        .create(&request.id, request.source, request.description)?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/v1/templates - List all templates
#[tracing::instrument(name = "http.list_templates", skip(state))]
pub async fn list_templates(State(state): State<AppState>) -> Json<TemplateListResponse> {
    let templates = state.template_store.list();
    let total = templates.len();

    Json(TemplateListResponse { templates, total })
}

/// GET /api/v1/templates/{id} - Get a specific template
#[tracing::instrument(name = "http.get_template", skip(state))]
pub async fn get_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TemplateInfo>> {
    Ok(Json(state.template_store.info(&id)?))
}

/// PUT /api/v1/templates/{id} - Update an existing template
#[tracing::instrument(name = "http.update_template", skip(state, request))]
pub async fn update_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateTemplateRequest>,
) -> Result<Json<TemplateInfo>> {
    if request.source.is_none() && request.description.is_none() {
        return Err(AppError::Validation(
            "Nothing to update: provide source or description".to_string(),
        ));
    }

    Ok(Json(state.template_store.update(&id, request)?))
}

/// DELETE /api/v1/templates/{id} - Delete a template
#[tracing::instrument(name = "http.delete_template", skip(state))]
pub async fn delete_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.template_store.delete(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/templates/{id}/render - Render one block
#[tracing::instrument(
    name = "http.render_template",
    skip(state, request),
    fields(block = %request.block)
)]
pub async fn render_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<RenderRequest>,
) -> Result<Json<RenderResponse>> {
    let output = state
        .template_store
        .render(&id, &request.block, &request.env)?;

    Ok(Json(RenderResponse { output }))
}

/// POST /api/v1/templates/{id}/render-each - Render one block per item
#[tracing::instrument(
    name = "http.render_each",
    skip(state, request),
    fields(block = %request.block, items = request.items.len())
)]
pub async fn render_each(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<RenderEachRequest>,
) -> Result<Json<RenderResponse>> {
    let output = state.template_store.render_each(
        &id,
        &request.block,
        request.items,
        &request.defaults,
        request.index_key.as_deref(),
    )?;

    Ok(Json(RenderResponse { output }))
}

/// POST /api/v1/evaluate - Render ad hoc template text
#[tracing::instrument(name = "http.evaluate", skip(state, request))]
pub async fn evaluate(
    State(state): State<AppState>,
    Json(request): Json<EvaluateRequest>,
) -> Result<Json<RenderResponse>> {
    let output = state.template_store.evaluate(&request.text, &request.env)?;
    Ok(Json(RenderResponse { output }))
}
