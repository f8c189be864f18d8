//! Order models.
//!
//! Orders are immutable once materialized except for `status` and the
//! `confirmation_sent` flag. Items carry the unit price at time of
//! purchase; the total is fixed at creation and never recomputed.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

use securecart_core::{AddressId, OrderId, OrderItemId, OrderStatus, Price, ProductId, UserId};

/// A materialized order.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    /// Snapshot reference; NULL once the address is deleted. The order
    /// survives address deletion.
    pub shipping_address_id: Option<AddressId>,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    /// Provider-side payment reference captured at verification time.
    pub payment_reference: String,
    pub confirmation_sent: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A line of a materialized order.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    /// NULL once the product is deleted from the catalog; order history
    /// is independent of catalog lifetime.
    pub product_id: Option<ProductId>,
    /// Current catalog name, if the product still exists.
    pub product_name: Option<String>,
    pub quantity: i32,
    /// Unit price at time of purchase.
    pub unit_price: Price,
}

impl OrderItem {
    /// Line total at the snapshot price.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price.times(self.quantity)
    }
}
