//! Order lifecycle: status transitions, cancellation, and notification
//! dispatch.
//!
//! Every status change dispatches the matching notification
//! fire-and-forget; delivery failures are logged and never fed back into
//! the transaction that changed the status.

use sqlx::PgPool;

use securecart_core::{OrderId, OrderStatus, UserId};

use crate::db::RepositoryError;
use crate::db::orders::OrderRepository;
use crate::db::users::UserRepository;
use crate::models::order::Order;
use crate::services::notifications::OrderMailer;

/// Order lifecycle manager.
pub struct OrderService<'a> {
    pool: &'a PgPool,
    mailer: &'a OrderMailer,
}

impl<'a> OrderService<'a> {
    /// Create a new order service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, mailer: &'a OrderMailer) -> Self {
        Self { pool, mailer }
    }

    /// Advance an order's status (staff action) and dispatch the
    /// matching notification.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::InvalidTransition` (nothing mutated) if
    /// the state machine forbids the change.
    pub async fn transition(
        &self,
        order_id: OrderId,
        next: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let order = OrderRepository::new(self.pool).transition(order_id, next).await?;
        self.dispatch(&order).await;
        Ok(order)
    }

    /// Cancel a pending order on behalf of its owner. Stock for items
    /// whose product still exists is restored in the same transaction
    /// that flips the status; the cancellation notification follows.
    ///
    /// # Errors
    ///
    /// `RepositoryError::NotFound` for foreign/missing orders,
    /// `RepositoryError::InvalidTransition` when no longer pending.
    pub async fn cancel_for_user(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<Order, RepositoryError> {
        let order = OrderRepository::new(self.pool)
            .cancel_for_user(order_id, user_id)
            .await?;
        self.dispatch(&order).await;
        Ok(order)
    }

    /// Send the order confirmation if it hasn't been sent yet.
    ///
    /// The flag flip is the gate: revisiting the confirmation step loses
    /// the race against the flag and sends nothing.
    ///
    /// # Returns
    ///
    /// `true` if this call dispatched the confirmation.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the flag update fails.
    pub async fn send_confirmation_once(
        &self,
        order: &Order,
        user_id: UserId,
    ) -> Result<bool, RepositoryError> {
        let won = OrderRepository::new(self.pool)
            .mark_confirmation_sent(order.id, user_id)
            .await?;
        if won {
            self.dispatch(order).await;
        }
        Ok(won)
    }

    /// Spawn a fire-and-forget notification for the order's current
    /// status. Lookup failures and delivery failures are logged, not
    /// surfaced.
    async fn dispatch(&self, order: &Order) {
        let recipient = match UserRepository::new(self.pool).get_by_id(order.user_id).await {
            Ok(Some(user)) => user.email.into_inner(),
            Ok(None) => {
                tracing::warn!(order_id = %order.id, "notification skipped: user gone");
                return;
            }
            Err(e) => {
                tracing::warn!(order_id = %order.id, error = %e, "notification skipped");
                return;
            }
        };
        let items = match OrderRepository::new(self.pool).items(order.id).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(order_id = %order.id, error = %e, "notification skipped");
                return;
            }
        };

        let mailer = self.mailer.clone();
        let order = order.clone();
        tokio::spawn(async move {
            if let Err(e) = mailer
                .send_status_email(&recipient, &order, &items, order.status)
                .await
            {
                tracing::warn!(order_id = %order.id, error = %e, "notification delivery failed");
            }
        });
    }
}
