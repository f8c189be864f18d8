//! Order-status notification emails.
//!
//! Sent over SMTP via lettre. Dispatch is fire-and-forget from the
//! caller's perspective: delivery failures are logged, never surfaced
//! into the transaction that changed the order's status.

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType,
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use securecart_core::OrderStatus;

use crate::config::EmailConfig;
use crate::models::order::{Order, OrderItem};

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build the email message.
    #[error("failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("invalid email address: {0}")]
    InvalidAddress(String),
}

/// Subject line for a status notification, or `None` for statuses that
/// send nothing. Statuses without a subject are skipped silently, not
/// treated as an error.
#[must_use]
pub const fn subject_for(status: OrderStatus) -> Option<&'static str> {
    match status {
        OrderStatus::Pending => Some("Order confirmation - your SecureCart order"),
        OrderStatus::Shipped => Some("Your order has been shipped!"),
        OrderStatus::Delivered => Some("Your order has been delivered!"),
        OrderStatus::Canceled => Some("Your order has been canceled"),
    }
}

/// Plain-text body for a status notification.
fn render_body(order: &Order, items: &[OrderItem], status: OrderStatus) -> String {
    let mut body = format!("Order #{} is now {status}.\n\n", order.id);
    for item in items {
        let name = item.product_name.as_deref().unwrap_or("(item)");
        body.push_str(&format!(
            "  {} x {name} @ {}\n",
            item.quantity, item.unit_price
        ));
    }
    body.push_str(&format!("\nTotal: {:.2}\n", order.total_amount));
    body
}

/// SMTP sender for order-status notifications.
#[derive(Clone)]
pub struct OrderMailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl OrderMailer {
    /// Create a mailer from SMTP configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_owned(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    /// Send the notification matching `status` for an order, if that
    /// status has one.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be built or delivered.
    pub async fn send_status_email(
        &self,
        to: &str,
        order: &Order,
        items: &[OrderItem],
        status: OrderStatus,
    ) -> Result<(), NotificationError> {
        let Some(subject) = subject_for(status) else {
            tracing::debug!(order_id = %order.id, %status, "no notification for status, skipping");
            return Ok(());
        };

        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| NotificationError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| NotificationError::InvalidAddress(to.to_owned()))?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(render_body(order, items, status))?;

        self.mailer.send(email).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use securecart_core::{OrderId, OrderItemId, Price, ProductId, UserId};

    use super::*;

    #[test]
    fn test_every_known_status_has_a_subject() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Canceled,
        ] {
            assert!(subject_for(status).is_some());
        }
    }

    #[test]
    fn test_render_body_handles_deleted_products() {
        let order = Order {
            id: OrderId::new(12),
            user_id: UserId::new(1),
            shipping_address_id: None,
            status: OrderStatus::Canceled,
            total_amount: Decimal::new(2000, 2),
            payment_reference: String::new(),
            confirmation_sent: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let items = vec![OrderItem {
            id: OrderItemId::new(1),
            order_id: order.id,
            product_id: Some(ProductId::new(1)),
            product_name: None,
            quantity: 2,
            unit_price: Price::new(Decimal::from(10)).unwrap(),
        }];

        let body = render_body(&order, &items, OrderStatus::Canceled);
        assert!(body.contains("Order #12 is now canceled."));
        assert!(body.contains("2 x (item) @ 10.00"));
        assert!(body.contains("Total: 20.00"));
    }
}
