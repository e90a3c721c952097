use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::extraction::ExtractionError;
use crate::llm_client::LlmError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("Text extraction failed: {0}")]
    Extraction(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ExtractionError> for AppError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::UnsupportedFormat(ext) => AppError::UnsupportedFormat(ext),
            ExtractionError::Task(msg) => {
                AppError::Internal(anyhow::anyhow!("extraction task failed: {msg}"))
            }
            other => AppError::Extraction(other.to_string()),
        }
    }
}

impl From<LlmError> for AppError {
    fn from(err: LlmError) -> Self {
        AppError::Llm(err.to_string())
    }
}

impl AppError {
    /// Maps an extractor rejection to a client error, keeping "too large" distinct.
    pub fn from_rejection(status: StatusCode, message: String) -> Self {
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::PayloadTooLarge(message)
        } else {
            AppError::Validation(message)
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Llm(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::PayloadTooLarge(_) => "PAYLOAD_TOO_LARGE",
            AppError::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            AppError::Extraction(_) => "EXTRACTION_ERROR",
            AppError::Llm(_) => "LLM_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match &self {
            AppError::Validation(msg)
            | AppError::PayloadTooLarge(msg)
            | AppError::Extraction(msg) => {
                tracing::warn!("Rejected request: {self}");
                msg.clone()
            }
            AppError::UnsupportedFormat(ext) => {
                tracing::warn!("Rejected request: {self}");
                if ext.is_empty() {
                    "Unsupported file type: file has no extension (expected pdf, docx or txt)"
                        .to_string()
                } else {
                    format!("Unsupported file type '.{ext}' (expected pdf, docx or txt)")
                }
            }
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                format!("Text generation failed: {msg}")
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                "An internal server error occurred".to_string()
            }
        };

        let body = Json(json!({
            "error": message,
            "code": self.code(),
        }));

        (self.status(), body).into_response()
    }
}
