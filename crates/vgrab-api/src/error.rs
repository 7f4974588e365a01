//! API error types.

use std::sync::OnceLock;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use vgrab_worker::WorkerError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Message returned in place of server-side error details in production.
pub const INTERNAL_ERROR_DETAIL: &str = "An internal error occurred";

static PRODUCTION: OnceLock<bool> = OnceLock::new();

/// Fix whether 5xx responses hide their details. Set once at startup from
/// [`ApiConfig::is_production`](crate::config::ApiConfig::is_production);
/// later calls are ignored. Unset means details are shown.
pub fn set_production_mode(production: bool) {
    let _ = PRODUCTION.set(production);
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Storage error: {0}")]
    Storage(#[from] vgrab_storage::StorageError),

    #[error("Worker error: {0}")]
    Worker(WorkerError),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Client-facing message. Server errors are masked in production.
    fn detail(&self, production: bool) -> String {
        if production && self.status_code().is_server_error() {
            INTERNAL_ERROR_DETAIL.to_string()
        } else {
            self.to_string()
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) | ApiError::Storage(_) | ApiError::Worker(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<WorkerError> for ApiError {
    fn from(err: WorkerError) -> Self {
        match err {
            WorkerError::InvalidRequest(msg) => ApiError::BadRequest(msg),
            other => ApiError::Worker(other),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }
        let detail = self.detail(PRODUCTION.get().copied().unwrap_or(false));

        (status, Json(ErrorResponse { detail })).into_response()
    }
}
