//! API error types.
//!
//! One variant per client-visible failure class. Authentication errors are
//! always generic on the wire so the API never confirms whether an account
//! exists.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Storage error: {0}")]
    Storage(#[from] vshare_storage::StorageError),

    #[error("Firestore error: {0}")]
    Firestore(vshare_firestore::FirestoreError),

    #[error("Queue error: {0}")]
    Queue(#[from] vshare_queue::QueueError),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Missing or unusable credentials.
    pub fn authentication_required() -> Self {
        Self::Unauthenticated("Authentication required".to_string())
    }

    /// Bad credentials. Deliberately does not say which part was wrong.
    pub fn invalid_credentials() -> Self {
        Self::Unauthenticated("Invalid credentials".to_string())
    }

    /// Expired or tampered token.
    pub fn invalid_token() -> Self {
        Self::Unauthenticated("Invalid or expired token".to_string())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_)
            | ApiError::Storage(_)
            | ApiError::Firestore(_)
            | ApiError::Queue(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<vshare_firestore::FirestoreError> for ApiError {
    fn from(e: vshare_firestore::FirestoreError) -> Self {
        use vshare_firestore::FirestoreError as Fe;
        match e {
            // Unique-id collision on create surfaces as a client-visible
            // conflict; everything else is an internal persistence failure.
            Fe::AlreadyExists(path) => ApiError::Conflict(format!("Record already exists: {}", path)),
            other => ApiError::Firestore(other),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let message = match &self {
            ApiError::Internal(_)
            | ApiError::Storage(_)
            | ApiError::Firestore(_)
            | ApiError::Queue(_) => {
                if std::env::var("ENVIRONMENT").unwrap_or_default() == "production" {
                    "Server error".to_string()
                } else {
                    self.to_string()
                }
            }
            _ => self.to_string(),
        };

        (status, Json(ErrorResponse { message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::validation("bad").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::invalid_credentials().status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::forbidden("no").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::not_found("gone").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::conflict("dup").status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_credential_errors_are_generic() {
        // Neither message may leak whether the account exists.
        assert_eq!(ApiError::invalid_credentials().to_string(), "Invalid credentials");
        assert_eq!(
            ApiError::authentication_required().to_string(),
            "Authentication required"
        );
    }

    #[test]
    fn test_duplicate_create_maps_to_conflict() {
        let err: ApiError =
            vshare_firestore::FirestoreError::AlreadyExists("users/u1".to_string()).into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }
}
