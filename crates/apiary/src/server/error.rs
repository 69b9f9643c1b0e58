//! Error handling with RFC 7807 Problem Details for JSON responses

use apiary_core::Error;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

pub type Result<T> = std::result::Result<T, AppError>;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Batch(#[from] Error),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Batch(err) => batch_status(err),
        }
    }

    pub const fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Batch(err) => err.code(),
        }
    }

    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::BadRequest(_) => false,
            Self::Batch(err) => err.is_retryable(),
        }
    }
}

const fn batch_status(err: &Error) -> StatusCode {
    match err {
        Error::BatchNotFound(_) | Error::SlotNotFound(_) => StatusCode::NOT_FOUND,

        Error::DuplicateHive(_)
        | Error::InvalidReorder(_)
        | Error::InvalidIdentifier(_)
        | Error::Parse(_) => StatusCode::BAD_REQUEST,

        Error::BatchAlreadyStarted(_)
        | Error::EmptyBatch
        | Error::BatchNotInProgress(_)
        | Error::BatchCompleted
        | Error::NoCurrentSlot
        | Error::SlotAlreadyCompleted(_)
        | Error::SlotAlreadyCancelled(_)
        | Error::InvalidTransition(_)
        | Error::ConcurrentModification { .. } => StatusCode::CONFLICT,

        Error::UpstreamInspectionCreationFailed(_) => StatusCode::BAD_GATEWAY,

        Error::InvalidConfig(_) | Error::CorruptState(_) | Error::Database(_) | Error::Io(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// RFC 7807 Problem Details for HTTP APIs, plus a stable error code.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    #[serde(rename = "type")]
    problem_type: Option<String>,
    title: String,
    status: u16,
    detail: String,
    code: String,
    retryable: bool,
}

impl ErrorResponse {
    pub fn from_error(err: &AppError) -> Self {
        let status = err.status_code();
        let title = status
            .canonical_reason()
            .map_or_else(|| "Error".to_string(), ToString::to_string);

        Self {
            problem_type: None,
            title,
            status: status.as_u16(),
            detail: err.to_string(),
            code: err.code().to_string(),
            retryable: err.is_retryable(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %self, "Request failed");
        }
        let response = ErrorResponse::from_error(&self);
        (status, Json(response)).into_response()
    }
}
