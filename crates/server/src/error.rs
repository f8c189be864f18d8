//! Unified request-level error handling.
//!
//! Route handlers return `Result<T, AppError>`. The `IntoResponse` impl
//! maps the domain taxonomy onto HTTP statuses and keeps internal detail
//! out of client-visible messages. None of these are process-fatal.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::mfa::MfaError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Repository operation failed.
    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// MFA operation failed.
    #[error("MFA error: {0}")]
    Mfa(#[from] MfaError),

    /// Resource not found (or owned by someone else, which reads the
    /// same).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Not logged in.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Logged in but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if matches!(
            self,
            Self::Repository(RepositoryError::Database(_) | RepositoryError::DataCorruption(_))
                | Self::Internal(_)
        ) {
            tracing::error!(error = %self, "request error");
        }

        let status = match &self {
            Self::Repository(err) => match err {
                RepositoryError::NotFound => StatusCode::NOT_FOUND,
                RepositoryError::Conflict(_)
                | RepositoryError::InsufficientStock { .. }
                | RepositoryError::InvalidTransition { .. } => StatusCode::CONFLICT,
                RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::AccountDisabled => {
                    StatusCode::UNAUTHORIZED
                }
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::WeakPassword(_) | AuthError::InvalidEmail(_) => StatusCode::BAD_REQUEST,
                AuthError::PasswordHash | AuthError::Repository(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Mfa(err) => match err {
                MfaError::InvalidSecret | MfaError::Clock | MfaError::Qr(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Repository(err) => match err {
                RepositoryError::NotFound => "Not found".to_owned(),
                RepositoryError::Conflict(msg) => msg.clone(),
                RepositoryError::InsufficientStock { product, available } => {
                    format!("Sorry, only {available} units of {product} are available.")
                }
                RepositoryError::InvalidTransition { from, to } => {
                    format!("Order cannot move from {from} to {to}.")
                }
                RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
                    "Internal server error".to_owned()
                }
            },
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => "Invalid credentials".to_owned(),
                AuthError::AccountDisabled => "This account is disabled".to_owned(),
                AuthError::UserAlreadyExists => {
                    "An account with this username already exists".to_owned()
                }
                AuthError::WeakPassword(msg) => msg.clone(),
                AuthError::InvalidEmail(_) => "Invalid email address".to_owned(),
                AuthError::PasswordHash | AuthError::Repository(_) => {
                    "Internal server error".to_owned()
                }
            },
            Self::Mfa(_) | Self::Internal(_) => "Internal server error".to_owned(),
            _ => self.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_of(AppError::NotFound("order".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AppError::Unauthorized("login required".into())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(AppError::Forbidden("staff only".into())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            status_of(AppError::Repository(RepositoryError::NotFound)),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AppError::Repository(RepositoryError::InsufficientStock {
                product: "Oak Desk".into(),
                available: 1,
            })),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(AppError::Auth(AuthError::InvalidCredentials)),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_ownership_violations_read_as_not_found() {
        // Foreign rows never surface as "forbidden": existence is not leaked.
        let response = AppError::Repository(RepositoryError::NotFound).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
