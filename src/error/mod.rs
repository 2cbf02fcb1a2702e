use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::template::{StoreError, TemplateError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

/// Check if running in production mode (based on RUN_MODE env var)
fn is_production() -> bool {
    std::env::var("RUN_MODE")
        .map(|m| m == "production" || m == "prod")
        .unwrap_or(false)
}

fn template_status(err: &TemplateError) -> (StatusCode, &'static str) {
    match err {
        TemplateError::UnexpectedEndMarker { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "UNEXPECTED_END_MARKER")
        }
        TemplateError::UnterminatedBlock { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "UNTERMINATED_BLOCK")
        }
        TemplateError::UnknownBlock(_) => (StatusCode::NOT_FOUND, "UNKNOWN_BLOCK"),
        TemplateError::CyclicBlockReference { .. } => {
            (StatusCode::UNPROCESSABLE_ENTITY, "CYCLIC_BLOCK_REFERENCE")
        }
    }
}

impl AppError {
    /// HTTP status and stable error code for this error
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::Store(e) => match e {
                StoreError::NotFound(_) => (StatusCode::NOT_FOUND, "TEMPLATE_NOT_FOUND"),
                StoreError::AlreadyExists(_) => (StatusCode::CONFLICT, "TEMPLATE_EXISTS"),
                StoreError::InvalidId(_) => (StatusCode::BAD_REQUEST, "INVALID_ID"),
                StoreError::Template(e) => template_status(e),
                StoreError::Load(_) => (StatusCode::INTERNAL_SERVER_ERROR, "LOAD_ERROR"),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let log_message = self.to_string();

        // Server-side failures are not echoed back in production
        let client_message = if status.is_server_error() && is_production() {
            "Internal server error".to_string()
        } else {
            log_message.clone()
        };

        if status.is_server_error() {
            tracing::error!(
                code = %code,
                status = %status.as_u16(),
                message = %log_message,
                "API error"
            );
        } else {
            tracing::warn!(
                code = %code,
                status = %status.as_u16(),
                message = %log_message,
                "API request rejected"
            );
        }

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: client_message,
            },
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
