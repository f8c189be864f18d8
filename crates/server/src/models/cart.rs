//! Cart models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;

use securecart_core::{CartId, CartItemId, Price, ProductId, UserId};

/// A user's cart. One per user, created lazily on first use.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A cart line joined with its product's current price and stock.
///
/// Prices here are live: the immutable price snapshot is only taken at
/// checkout time.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CartLine {
    pub item_id: CartItemId,
    pub product_id: ProductId,
    pub name: String,
    pub slug: String,
    pub unit_price: Price,
    pub stock: i32,
    pub quantity: i32,
}

impl CartLine {
    /// Cost of this line at the current product price.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price.times(self.quantity)
    }
}

/// Total price over a set of cart lines, computed fresh from current
/// prices (never cached).
#[must_use]
pub fn total_price(lines: &[CartLine]) -> Decimal {
    lines.iter().map(CartLine::line_total).sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(price: Decimal, quantity: i32) -> CartLine {
        CartLine {
            item_id: CartItemId::new(1),
            product_id: ProductId::new(1),
            name: "Walnut Chair".into(),
            slug: "walnut-chair".into(),
            unit_price: Price::new(price).unwrap(),
            stock: 10,
            quantity,
        }
    }

    #[test]
    fn test_line_total() {
        assert_eq!(line(Decimal::new(1050, 2), 3).line_total(), Decimal::new(3150, 2));
    }

    #[test]
    fn test_total_price() {
        let lines = vec![line(Decimal::from(10), 2), line(Decimal::new(250, 2), 1)];
        assert_eq!(total_price(&lines), Decimal::new(2250, 2));
        assert_eq!(total_price(&[]), Decimal::ZERO);
    }
}
