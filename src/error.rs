//! Error types for the Region Extract server

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::ocr::OcrError;
use crate::render::RenderError;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("S3 error: {0}")]
    Storage(#[from] StorageError),

    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),
}

/// Storage-specific errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Object not found: s3://{bucket}/{key}")]
    ObjectNotFound { bucket: String, key: String },

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("S3 SDK error: {0}")]
    SdkError(String),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::Storage(e) => {
                tracing::error!("Storage error: {}", e);
                match e {
                    StorageError::ObjectNotFound { .. } => {
                        (StatusCode::NOT_FOUND, "not_found", e.to_string())
                    }
                    StorageError::AccessDenied(_) => (
                        StatusCode::FORBIDDEN,
                        "access_denied",
                        "Access denied".to_string(),
                    ),
                    StorageError::SdkError(_) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "storage_error",
                        "Storage error".to_string(),
                    ),
                }
            }
            AppError::Ocr(e) => {
                tracing::error!("OCR error: {}", e);
                let (status, error_type) = match e {
                    OcrError::Deserialization(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_ocr_result"),
                    OcrError::Submission(_) => (StatusCode::BAD_GATEWAY, "ocr_submission_failed"),
                    OcrError::JobFailed { .. } => (StatusCode::BAD_GATEWAY, "ocr_job_failed"),
                    OcrError::Interrupted { .. } => (StatusCode::SERVICE_UNAVAILABLE, "interrupted"),
                    OcrError::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "ocr_timeout"),
                    OcrError::Api(_) => (StatusCode::BAD_GATEWAY, "ocr_error"),
                };
                (status, error_type, e.to_string())
            }
            AppError::Render(e) => {
                tracing::error!("Render error: {}", e);
                match e {
                    RenderError::PageOutOfRange { .. } => {
                        (StatusCode::BAD_REQUEST, "page_out_of_range", e.to_string())
                    }
                    RenderError::InvalidDocument(_) => {
                        (StatusCode::UNPROCESSABLE_ENTITY, "invalid_document", e.to_string())
                    }
                    RenderError::Timeout(_) => {
                        (StatusCode::GATEWAY_TIMEOUT, "render_timeout", e.to_string())
                    }
                    RenderError::Render(_) | RenderError::Encode(_) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "render_error",
                        "Failed to render page".to_string(),
                    ),
                }
            }
        }
    }

    /// HTTP status this error maps to
    pub fn status_code(&self) -> StatusCode {
        self.parts().0
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = self.parts();

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        });

        (status, body).into_response()
    }
}
