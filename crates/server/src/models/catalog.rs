//! Catalog models: categories, subcategories, products.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use securecart_core::{CategoryId, Price, ProductId, SubcategoryId};

/// Top-level catalog category.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
}

/// Second-level grouping under a [`Category`].
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Subcategory {
    pub id: SubcategoryId,
    pub category_id: CategoryId,
    pub name: String,
    pub slug: String,
}

/// A sellable product with its stock counter.
///
/// Stock is mutated only by order materialization (decrement) and order
/// cancellation (restock).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Product {
    pub id: ProductId,
    pub subcategory_id: SubcategoryId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: Price,
    pub stock: i32,
    pub low_stock_threshold: i32,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether stock has fallen to or below the restock threshold.
    #[must_use]
    pub const fn is_low_stock(&self) -> bool {
        self.stock <= self.low_stock_threshold
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn product(stock: i32, threshold: i32) -> Product {
        Product {
            id: ProductId::new(1),
            subcategory_id: SubcategoryId::new(1),
            name: "Oak Desk".into(),
            slug: "oak-desk".into(),
            description: String::new(),
            price: Price::new(Decimal::from(100)).unwrap(),
            stock,
            low_stock_threshold: threshold,
            featured: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_low_stock() {
        assert!(product(5, 5).is_low_stock());
        assert!(product(0, 5).is_low_stock());
        assert!(!product(6, 5).is_low_stock());
    }
}
