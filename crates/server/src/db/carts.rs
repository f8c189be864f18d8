//! Cart repository.
//!
//! One cart per user. Quantity changes are single-statement
//! read-modify-writes so concurrent requests from the same user (e.g. a
//! double-clicked add-to-cart) cannot clobber each other with stale
//! reads. Stock is deliberately not checked at add time; it is validated
//! at checkout and again inside the order transaction.

use sqlx::PgPool;

use securecart_core::{CartId, CartItemId, ProductId, UserId};

use super::RepositoryError;
use crate::models::cart::{Cart, CartLine};

/// Repository for carts and their lines.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Fetch the user's cart, creating it on first use.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_or_create(&self, user_id: UserId) -> Result<Cart, RepositoryError> {
        let cart = sqlx::query_as::<_, Cart>(
            "INSERT INTO carts (user_id) VALUES ($1) \
             ON CONFLICT (user_id) DO UPDATE SET updated_at = now() \
             RETURNING id, user_id, created_at, updated_at",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;
        Ok(cart)
    }

    /// The cart's lines joined with live product price and stock, most
    /// recently added first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lines(&self, cart_id: CartId) -> Result<Vec<CartLine>, RepositoryError> {
        let lines = sqlx::query_as::<_, CartLine>(
            "SELECT ci.id AS item_id, p.id AS product_id, p.name, p.slug, \
                    p.price AS unit_price, p.stock, ci.quantity \
             FROM cart_items ci \
             JOIN products p ON p.id = ci.product_id \
             WHERE ci.cart_id = $1 \
             ORDER BY ci.added_at DESC",
        )
        .bind(cart_id)
        .fetch_all(self.pool)
        .await?;
        Ok(lines)
    }

    /// Add a product to the cart.
    ///
    /// Atomic upsert: a new line is created with `quantity`, an existing
    /// line is incremented by it, or overwritten when `override_quantity`
    /// is set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the statement fails (e.g.
    /// the product was deleted concurrently).
    pub async fn add_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: i32,
        override_quantity: bool,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO cart_items (cart_id, product_id, quantity) VALUES ($1, $2, $3) \
             ON CONFLICT (cart_id, product_id) DO UPDATE \
             SET quantity = CASE WHEN $4 THEN EXCLUDED.quantity \
                                 ELSE cart_items.quantity + EXCLUDED.quantity END",
        )
        .bind(cart_id)
        .bind(product_id)
        .bind(quantity)
        .bind(override_quantity)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Set a line's quantity, scoped to the owning user.
    ///
    /// A quantity of zero or less deletes the line. A quantity above the
    /// product's current stock is rejected without touching the line.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the line doesn't exist or
    /// belongs to another user's cart, and
    /// `RepositoryError::InsufficientStock` if the requested quantity
    /// exceeds current stock.
    pub async fn update_quantity(
        &self,
        item_id: CartItemId,
        user_id: UserId,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        if quantity <= 0 {
            if !self.remove_item(item_id, user_id).await? {
                return Err(RepositoryError::NotFound);
            }
            return Ok(());
        }

        let line = sqlx::query_as::<_, CartLine>(
            "SELECT ci.id AS item_id, p.id AS product_id, p.name, p.slug, \
                    p.price AS unit_price, p.stock, ci.quantity \
             FROM cart_items ci \
             JOIN carts c ON c.id = ci.cart_id \
             JOIN products p ON p.id = ci.product_id \
             WHERE ci.id = $1 AND c.user_id = $2",
        )
        .bind(item_id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        if quantity > line.stock {
            return Err(RepositoryError::InsufficientStock {
                product: line.name,
                available: line.stock,
            });
        }

        sqlx::query("UPDATE cart_items SET quantity = $2 WHERE id = $1")
            .bind(item_id)
            .bind(quantity)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Remove a line, scoped to the owning user.
    ///
    /// # Returns
    ///
    /// `true` if a line was deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn remove_item(
        &self,
        item_id: CartItemId,
        user_id: UserId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM cart_items ci \
             USING carts c \
             WHERE ci.id = $1 AND ci.cart_id = c.id AND c.user_id = $2",
        )
        .bind(item_id)
        .bind(user_id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every line in the user's cart. Clearing an empty (or
    /// missing) cart is a no-op, not an error.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn clear(&self, user_id: UserId) -> Result<(), RepositoryError> {
        sqlx::query(
            "DELETE FROM cart_items ci \
             USING carts c \
             WHERE ci.cart_id = c.id AND c.user_id = $1",
        )
        .bind(user_id)
        .execute(self.pool)
        .await?;
        Ok(())
    }
}
