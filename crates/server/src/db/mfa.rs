//! MFA device repository.

use sqlx::PgPool;

use securecart_core::{MfaDeviceId, UserId};

use super::RepositoryError;
use crate::models::mfa::MfaDevice;

const DEVICE_COLUMNS: &str = "id, user_id, name, secret, confirmed, created_at";

/// Repository for TOTP devices.
pub struct MfaDeviceRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> MfaDeviceRepository<'a> {
    /// Create a new MFA device repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// The user's confirmed device, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_confirmed(
        &self,
        user_id: UserId,
    ) -> Result<Option<MfaDevice>, RepositoryError> {
        let device = sqlx::query_as::<_, MfaDevice>(&format!(
            "SELECT {DEVICE_COLUMNS} FROM mfa_devices WHERE user_id = $1 AND confirmed"
        ))
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(device)
    }

    /// The user's in-flight (unconfirmed) enrollment, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_unconfirmed(
        &self,
        user_id: UserId,
    ) -> Result<Option<MfaDevice>, RepositoryError> {
        let device = sqlx::query_as::<_, MfaDevice>(&format!(
            "SELECT {DEVICE_COLUMNS} FROM mfa_devices WHERE user_id = $1 AND NOT confirmed"
        ))
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(device)
    }

    /// Start an enrollment with a freshly generated secret.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if an unconfirmed device
    /// already exists for the user.
    pub async fn create_unconfirmed(
        &self,
        user_id: UserId,
        name: &str,
        secret: &str,
    ) -> Result<MfaDevice, RepositoryError> {
        sqlx::query_as::<_, MfaDevice>(&format!(
            "INSERT INTO mfa_devices (user_id, name, secret) VALUES ($1, $2, $3) \
             RETURNING {DEVICE_COLUMNS}"
        ))
        .bind(user_id)
        .bind(name)
        .bind(secret)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_unique(e, "pending enrollment"))
    }

    /// Mark a device as confirmed after a successful challenge.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the device doesn't exist and
    /// `RepositoryError::Conflict` if the user already has a confirmed
    /// device.
    pub async fn confirm(&self, device_id: MfaDeviceId) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE mfa_devices SET confirmed = TRUE WHERE id = $1")
            .bind(device_id)
            .execute(self.pool)
            .await
            .map_err(|e| RepositoryError::from_unique(e, "confirmed device"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete every device for the user, confirmed or not. Destructive
    /// and irreversible; used when MFA is disabled.
    ///
    /// # Returns
    ///
    /// The number of deleted devices.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete_all_for_user(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM mfa_devices WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
