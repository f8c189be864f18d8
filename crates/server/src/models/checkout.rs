//! Transient checkout snapshot.

use rust_decimal::Decimal;

use securecart_core::{AddressId, Price, ProductId};

/// One line of a [`CheckoutSnapshot`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotLine {
    pub product_id: ProductId,
    pub quantity: i32,
    /// Unit price captured at snapshot time; the order is priced from
    /// this, not from the live catalog.
    pub unit_price: Price,
}

/// Immutable capture of cart state taken when a payment session is
/// created.
///
/// The order is materialized from this snapshot regardless of later cart
/// edits. Lives in the expiring pending-checkout store, keyed by user,
/// and is consumed exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSnapshot {
    pub lines: Vec<SnapshotLine>,
    pub total_amount: Decimal,
    pub shipping_address_id: AddressId,
    /// Hosted payment session this snapshot is waiting on.
    pub payment_session_id: String,
}
