//! Service-level errors
//!
//! Every variant maps to exactly one HTTP status; the API crate turns them
//! into responses at a single point.

use axum::http::StatusCode;

use crate::auth::jwt::JwtError;
use crate::auth::password::PasswordError;
use crate::store::StoreError;

/// Result alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Error type for auth and task services
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    UnprocessableEntity(String),

    /// Store, hashing or signing failure; detail is logged, never returned
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// HTTP status this error surfaces as
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate("email") => ServiceError::Conflict("Email already in use".to_string()),
            StoreError::Duplicate(field) => ServiceError::Conflict(format!("Duplicate {}", field)),
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

impl From<PasswordError> for ServiceError {
    fn from(err: PasswordError) -> Self {
        ServiceError::Internal(err.to_string())
    }
}

impl From<JwtError> for ServiceError {
    fn from(err: JwtError) -> Self {
        ServiceError::Internal(err.to_string())
    }
}
