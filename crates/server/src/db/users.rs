//! User repository.

use sqlx::PgPool;

use securecart_core::{Email, Role, UserId};

use super::RepositoryError;
use crate::models::user::User;

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, password_hash, role, \
                            mfa_enabled, is_active, created_at, updated_at";

/// Repository for account rows.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(user)
    }

    /// Get a user by username.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(self.pool)
        .await?;
        Ok(user)
    }

    /// Create a new account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the username is taken.
    pub async fn create(
        &self,
        username: &str,
        email: &Email,
        first_name: &str,
        last_name: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (username, email, first_name, last_name, password_hash, role) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(username)
        .bind(email)
        .bind(first_name)
        .bind(last_name)
        .bind(password_hash)
        .bind(role)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "username"))
    }

    /// Update profile fields and (already sanitized) role.
    ///
    /// Role sanitization happens in the auth service; this method writes
    /// whatever it is handed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn update_profile(
        &self,
        id: UserId,
        email: &Email,
        first_name: &str,
        last_name: &str,
        role: Role,
    ) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users \
             SET email = $2, first_name = $3, last_name = $4, role = $5, updated_at = now() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(email)
        .bind(first_name)
        .bind(last_name)
        .bind(role)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Flip the account-level MFA flag.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn set_mfa_enabled(&self, id: UserId, enabled: bool) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET mfa_enabled = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(enabled)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// List accounts for the staff surface.
    ///
    /// Non-superuser staff only see customer accounts; superusers see
    /// everyone.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, include_staff: bool) -> Result<Vec<User>, RepositoryError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE $1 OR role = 'customer' \
             ORDER BY username ASC"
        ))
        .bind(include_staff)
        .fetch_all(self.pool)
        .await?;
        Ok(users)
    }
}
