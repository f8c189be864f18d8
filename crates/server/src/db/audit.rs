//! Login attempt audit repository.
//!
//! Append-only. The authentication entry points call `record` directly;
//! there is no event-hook indirection. The only mutation besides the
//! insert is the superuser bulk purge.

use sqlx::PgPool;

use securecart_core::UserId;

use super::RepositoryError;
use crate::models::audit::LoginAttempt;

/// Repository for the login audit log.
pub struct LoginAttemptRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> LoginAttemptRepository<'a> {
    /// Create a new login attempt repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record an authentication attempt. The username is stored as
    /// submitted, even when it resolves to no account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn record(
        &self,
        user_id: Option<UserId>,
        username: &str,
        ip_address: &str,
        success: bool,
        staff_surface: bool,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO login_attempts (user_id, username, ip_address, success, staff_surface) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(user_id)
        .bind(username)
        .bind(ip_address)
        .bind(success)
        .bind(staff_surface)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Recent attempts, newest first (superuser surface).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<LoginAttempt>, RepositoryError> {
        let attempts = sqlx::query_as::<_, LoginAttempt>(
            "SELECT id, user_id, username, ip_address, success, staff_surface, created_at \
             FROM login_attempts \
             ORDER BY created_at DESC \
             LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;
        Ok(attempts)
    }

    /// Bulk-delete the entire log (superuser surface).
    ///
    /// # Returns
    ///
    /// The number of deleted rows.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn purge(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM login_attempts")
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
