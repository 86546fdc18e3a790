use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use gasdesk_auth::AuthzError;
use gasdesk_core::DomainError;
use gasdesk_infra::StoreError;

use crate::app::dto::failure;

/// Everything a handler can fail with. Each variant maps to one status code
/// and the uniform failure envelope.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Forbidden(#[from] AuthzError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::Domain(DomainError::not_found(msg))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Domain(DomainError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Domain(DomainError::Forbidden(_)) | ApiError::Forbidden(_) => {
                StatusCode::FORBIDDEN
            }
            ApiError::Domain(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(StoreError::Conflict) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Store(_) | ApiError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Domain(DomainError::Validation(_)) => "validation_error",
            ApiError::Domain(DomainError::InvalidId(_)) => "invalid_id",
            ApiError::Domain(DomainError::NotFound(_)) => "not_found",
            ApiError::Domain(DomainError::Conflict(_)) | ApiError::Store(StoreError::Conflict) => {
                "conflict"
            }
            ApiError::Domain(DomainError::Forbidden(_)) | ApiError::Forbidden(_) => "forbidden",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Store(_) => "store_error",
            ApiError::Encode(_) => "encode_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        failure(status, self.to_string(), self.code())
    }
}

/// Map a uniqueness clash reported by the store to the rule's own message.
pub fn conflict_as(err: StoreError, message: &str) -> ApiError {
    match err {
        StoreError::Conflict => ApiError::Domain(DomainError::conflict(message)),
        other => ApiError::Store(other),
    }
}
