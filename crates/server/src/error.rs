//! Error types for the HTTP API

use crate::stores::StoreError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use form_fill::FillError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Gone(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    /// The request body could not be read as JSON
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    #[error(transparent)]
    Fill(#[from] FillError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{what} not found")),
            ApiError::Gone(msg) => (StatusCode::GONE, msg.clone()),
            ApiError::Rejected { status, message } => (*status, message.clone()),
            ApiError::Upstream(msg) => {
                tracing::warn!("Upstream error: {}", msg);
                (StatusCode::BAD_GATEWAY, msg.clone())
            }
            ApiError::Fill(e) if e.is_invalid_input() => (StatusCode::BAD_REQUEST, e.to_string()),
            ApiError::Fill(e) if e.is_unreadable_document() => {
                (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
            }
            ApiError::Fill(e) => {
                tracing::error!("Fill error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PDF generation failed".to_string(),
                )
            }
            ApiError::Store(StoreError::NotFound(what)) => {
                (StatusCode::NOT_FOUND, format!("{what} not found"))
            }
            ApiError::Store(e @ StoreError::Unavailable(_)) => {
                tracing::warn!("Store error: {}", e);
                (StatusCode::BAD_GATEWAY, e.to_string())
            }
            ApiError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "success": false,
            "error": message,
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}
