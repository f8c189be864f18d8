//! Order repository.
//!
//! Materialization and cancellation are each a single transaction; any
//! failure inside rolls the whole thing back. Stock never goes negative:
//! the decrement is a conditional single-statement update re-checked at
//! commit time, so concurrent checkouts of the last unit serialize on the
//! row and exactly one wins.

use sqlx::{PgConnection, PgPool};

use securecart_core::{OrderId, OrderStatus, UserId};

use super::RepositoryError;
use crate::models::checkout::CheckoutSnapshot;
use crate::models::order::{Order, OrderItem};

const ORDER_COLUMNS: &str = "id, user_id, shipping_address_id, status, total_amount, \
                             payment_reference, confirmation_sent, created_at, updated_at";

/// Repository for orders and their lines.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Materialize an order from a consumed checkout snapshot.
    ///
    /// Inside one transaction: inserts the order and its items at
    /// snapshot prices, decrements stock with an in-transaction re-check,
    /// and clears the user's cart. Rolls back entirely if any line's
    /// stock is now insufficient or its product vanished.
    ///
    /// # Errors
    ///
    /// - `RepositoryError::NotFound` if the shipping address no longer
    ///   belongs to the user, or a snapshot product was deleted.
    /// - `RepositoryError::InsufficientStock` if current stock cannot
    ///   cover a line.
    /// - `RepositoryError::Database` for other failures.
    pub async fn create_from_snapshot(
        &self,
        user_id: UserId,
        snapshot: &CheckoutSnapshot,
        payment_reference: &str,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // The address snapshot reference must still resolve to an address
        // owned by the purchaser.
        let address_owned: Option<(i32,)> =
            sqlx::query_as("SELECT id FROM addresses WHERE id = $1 AND user_id = $2")
                .bind(snapshot.shipping_address_id)
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;
        if address_owned.is_none() {
            return Err(RepositoryError::NotFound);
        }

        let order = sqlx::query_as::<_, Order>(&format!(
            "INSERT INTO orders (user_id, shipping_address_id, total_amount, payment_reference) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(user_id)
        .bind(snapshot.shipping_address_id)
        .bind(snapshot.total_amount)
        .bind(payment_reference)
        .fetch_one(&mut *tx)
        .await?;

        for line in &snapshot.lines {
            // Conditional decrement: zero rows means either the stock
            // re-check failed or the product is gone. Either way the
            // transaction is abandoned and rolls back on drop.
            let decremented = sqlx::query(
                "UPDATE products SET stock = stock - $2, updated_at = now() \
                 WHERE id = $1 AND stock >= $2",
            )
            .bind(line.product_id)
            .bind(line.quantity)
            .execute(&mut *tx)
            .await?;

            if decremented.rows_affected() == 0 {
                let current: Option<(String, i32)> =
                    sqlx::query_as("SELECT name, stock FROM products WHERE id = $1")
                        .bind(line.product_id)
                        .fetch_optional(&mut *tx)
                        .await?;
                return Err(current.map_or(RepositoryError::NotFound, |(name, stock)| {
                    RepositoryError::InsufficientStock {
                        product: name,
                        available: stock,
                    }
                }));
            }

            sqlx::query(
                "INSERT INTO order_items (order_id, product_id, quantity, unit_price) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(order.id)
            .bind(line.product_id)
            .bind(line.quantity)
            .bind(line.unit_price)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            "DELETE FROM cart_items ci USING carts c \
             WHERE ci.cart_id = c.id AND c.user_id = $1",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(order)
    }

    /// The order's lines, with current catalog names where the product
    /// still exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT oi.id, oi.order_id, oi.product_id, p.name AS product_name, \
                    oi.quantity, oi.unit_price \
             FROM order_items oi \
             LEFT JOIN products p ON p.id = oi.product_id \
             WHERE oi.order_id = $1 \
             ORDER BY oi.id ASC",
        )
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;
        Ok(items)
    }

    /// A user's order history, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(orders)
    }

    /// One order, scoped to its owner. Foreign orders read as missing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_for_user(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND user_id = $2"
        ))
        .bind(order_id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(order)
    }

    /// One order, unscoped (staff surface only; authorization happens in
    /// the route).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, order_id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
        ))
        .bind(order_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(order)
    }

    /// All orders, newest first (staff surface).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self, limit: i64, offset: i64) -> Result<Vec<Order>, RepositoryError> {
        let orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;
        Ok(orders)
    }

    /// Apply a status transition (staff surface), restocking on
    /// cancellation. The row is locked for the duration so concurrent
    /// transitions serialize.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidTransition` if the state machine
    /// forbids the change; nothing is mutated in that case.
    pub async fn transition(
        &self,
        order_id: OrderId,
        next: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE"
        ))
        .bind(order_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let updated = apply_transition(&mut tx, &order, next).await?;
        tx.commit().await?;
        Ok(updated)
    }

    /// Cancel a pending order on behalf of its owner, restoring stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for foreign or missing orders
    /// and `RepositoryError::InvalidTransition` when the order is no
    /// longer pending.
    pub async fn cancel_for_user(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let order = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND user_id = $2 FOR UPDATE"
        ))
        .bind(order_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let updated = apply_transition(&mut tx, &order, OrderStatus::Canceled).await?;
        tx.commit().await?;
        Ok(updated)
    }

    /// Flip the confirmation flag, returning whether this call won the
    /// flip. Revisiting the confirmation step therefore sends at most one
    /// notification per order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn mark_confirmation_sent(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE orders SET confirmation_sent = TRUE, updated_at = now() \
             WHERE id = $1 AND user_id = $2 AND NOT confirmation_sent",
        )
        .bind(order_id)
        .bind(user_id)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Validate and write a status change on an already-locked order row,
/// restoring stock when the new status is `canceled`. Lines whose product
/// was deleted are skipped, not treated as an error.
async fn apply_transition(
    tx: &mut PgConnection,
    order: &Order,
    next: OrderStatus,
) -> Result<Order, RepositoryError> {
    if !order.status.can_transition_to(next) {
        return Err(RepositoryError::InvalidTransition {
            from: order.status,
            to: next,
        });
    }

    let updated = sqlx::query_as::<_, Order>(&format!(
        "UPDATE orders SET status = $2, updated_at = now() WHERE id = $1 \
         RETURNING {ORDER_COLUMNS}"
    ))
    .bind(order.id)
    .bind(next)
    .fetch_one(&mut *tx)
    .await?;

    if next == OrderStatus::Canceled {
        sqlx::query(
            "UPDATE products p \
             SET stock = p.stock + oi.quantity, updated_at = now() \
             FROM order_items oi \
             WHERE oi.order_id = $1 AND oi.product_id = p.id",
        )
        .bind(order.id)
        .execute(&mut *tx)
        .await?;
    }

    Ok(updated)
}
