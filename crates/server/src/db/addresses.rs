//! Address book repository.
//!
//! Every lookup is scoped to the owning user; another user's address is
//! indistinguishable from a missing one.

use sqlx::PgPool;

use securecart_core::{AddressId, UserId};

use super::RepositoryError;
use crate::models::address::{Address, AddressForm};

const ADDRESS_COLUMNS: &str = "id, user_id, full_name, street_address1, street_address2, city, \
                               state_province, postal_code, country, phone_number, \
                               delivery_instructions, created_at, updated_at";

/// Repository for saved shipping addresses.
pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressRepository<'a> {
    /// Create a new address repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All addresses saved by a user, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Address>, RepositoryError> {
        let addresses = sqlx::query_as::<_, Address>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE user_id = $1 ORDER BY created_at ASC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(addresses)
    }

    /// One address, scoped to its owner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_for_user(
        &self,
        id: AddressId,
        user_id: UserId,
    ) -> Result<Option<Address>, RepositoryError> {
        let address = sqlx::query_as::<_, Address>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(address)
    }

    /// Save a new address for a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(
        &self,
        user_id: UserId,
        form: &AddressForm,
    ) -> Result<Address, RepositoryError> {
        let address = sqlx::query_as::<_, Address>(&format!(
            "INSERT INTO addresses (user_id, full_name, street_address1, street_address2, city, \
                                    state_province, postal_code, country, phone_number, \
                                    delivery_instructions) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {ADDRESS_COLUMNS}"
        ))
        .bind(user_id)
        .bind(&form.full_name)
        .bind(&form.street_address1)
        .bind(&form.street_address2)
        .bind(&form.city)
        .bind(&form.state_province)
        .bind(&form.postal_code)
        .bind(&form.country)
        .bind(&form.phone_number)
        .bind(&form.delivery_instructions)
        .fetch_one(self.pool)
        .await?;
        Ok(address)
    }

    /// Update an address, scoped to its owner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address doesn't exist or
    /// belongs to another user.
    pub async fn update(
        &self,
        id: AddressId,
        user_id: UserId,
        form: &AddressForm,
    ) -> Result<Address, RepositoryError> {
        sqlx::query_as::<_, Address>(&format!(
            "UPDATE addresses \
             SET full_name = $3, street_address1 = $4, street_address2 = $5, city = $6, \
                 state_province = $7, postal_code = $8, country = $9, phone_number = $10, \
                 delivery_instructions = $11, updated_at = now() \
             WHERE id = $1 AND user_id = $2 \
             RETURNING {ADDRESS_COLUMNS}"
        ))
        .bind(id)
        .bind(user_id)
        .bind(&form.full_name)
        .bind(&form.street_address1)
        .bind(&form.street_address2)
        .bind(&form.city)
        .bind(&form.state_province)
        .bind(&form.postal_code)
        .bind(&form.country)
        .bind(&form.phone_number)
        .bind(&form.delivery_instructions)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete an address, scoped to its owner.
    ///
    /// Orders referencing it keep a NULL shipping address; order history
    /// survives address deletion.
    ///
    /// # Returns
    ///
    /// `true` if a row was deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, id: AddressId, user_id: UserId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM addresses WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
