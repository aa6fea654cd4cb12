//! Error taxonomy for HTTP handlers and its mapping to responses.
//!
//! Every failure renders as `{"error": <message>}` with the status of its
//! variant.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use stockroom_auth::{AuthError, AuthErrorKind};
use stockroom_core::DomainError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Missing, malformed or expired credentials (401).
    #[error("{0}")]
    Unauthenticated(String),

    /// Authenticated but the role is insufficient (403).
    #[error("{0}")]
    Forbidden(String),

    /// Missing or duplicate field, bad payload (400).
    #[error("{0}")]
    Validation(String),

    /// Missing resource or user (404).
    #[error("{0}")]
    NotFound(String),

    /// Unexpected fault (500).
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        json_error(self.status(), self.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let msg = err.to_string();
        match err.kind() {
            AuthErrorKind::Unauthenticated => ApiError::Unauthenticated(msg),
            AuthErrorKind::NotFound => ApiError::NotFound(msg),
            AuthErrorKind::Forbidden => ApiError::Forbidden(msg),
            AuthErrorKind::Internal => ApiError::Internal(msg),
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => ApiError::Validation(msg),
            other @ DomainError::InvalidId(_) => ApiError::Validation(other.to_string()),
        }
    }
}

pub fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": message.into(),
        })),
    )
        .into_response()
}
