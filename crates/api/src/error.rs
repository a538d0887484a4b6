//! HTTP error type: every failure leaves the API as `{ "error": "..." }`.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use engine::EngineError;
use leave::LeaveError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The request body could not be read as the expected JSON.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Rejected { status, .. } => *status,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Lookup failures on a caller-named workflow are the caller's problem;
    /// everything else means the deployed rules are broken.
    pub fn from_lookup(err: EngineError) -> Self {
        if err.is_configuration() {
            ApiError::Internal(err.to_string())
        } else {
            ApiError::NotFound(err.to_string())
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<LeaveError> for ApiError {
    fn from(err: LeaveError) -> Self {
        match err {
            LeaveError::Fact(e) => ApiError::BadRequest(e.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "{self}");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
