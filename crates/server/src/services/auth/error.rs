//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] securecart_core::EmailError),

    /// Wrong password, unknown username, or wrong login surface for the
    /// account's role. Deliberately indistinct.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Account exists but is deactivated.
    #[error("account disabled")]
    AccountDisabled,

    /// Username already registered.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Password hashing failure.
    #[error("password hashing error")]
    PasswordHash,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
