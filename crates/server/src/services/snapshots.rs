//! Expiring pending-checkout store.
//!
//! Checkout snapshots are keyed by user with a 30-minute TTL, bounding
//! how long a hosted payment session can be redeemed. `take` removes the
//! snapshot atomically, so a replayed success callback finds nothing and
//! cannot materialize a duplicate order.

use std::time::Duration;

use moka::future::Cache;

use securecart_core::UserId;

use crate::models::checkout::CheckoutSnapshot;

/// How long a pending checkout remains redeemable.
pub const PENDING_CHECKOUT_TTL: Duration = Duration::from_secs(30 * 60);

/// Keyed, expiring store of pending checkout snapshots.
#[derive(Clone)]
pub struct CheckoutStore {
    inner: Cache<UserId, CheckoutSnapshot>,
}

impl CheckoutStore {
    /// Create a store whose entries expire after `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(100_000)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Store the user's pending checkout, replacing any previous one.
    ///
    /// A user re-initiating checkout abandons the earlier snapshot; only
    /// the latest payment session can materialize an order.
    pub async fn put(&self, user_id: UserId, snapshot: CheckoutSnapshot) {
        self.inner.insert(user_id, snapshot).await;
    }

    /// Consume the user's pending checkout, if one exists and has not
    /// expired. Subsequent calls return `None` until a new checkout is
    /// initiated.
    pub async fn take(&self, user_id: UserId) -> Option<CheckoutSnapshot> {
        self.inner.remove(&user_id).await
    }
}

impl Default for CheckoutStore {
    fn default() -> Self {
        Self::new(PENDING_CHECKOUT_TTL)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use securecart_core::{AddressId, Price, ProductId};

    use super::*;
    use crate::models::checkout::SnapshotLine;

    fn snapshot(session_id: &str) -> CheckoutSnapshot {
        CheckoutSnapshot {
            lines: vec![SnapshotLine {
                product_id: ProductId::new(1),
                quantity: 2,
                unit_price: Price::new(Decimal::from(10)).unwrap(),
            }],
            total_amount: Decimal::from(20),
            shipping_address_id: AddressId::new(1),
            payment_session_id: session_id.to_owned(),
        }
    }

    #[tokio::test]
    async fn test_take_consumes_exactly_once() {
        let store = CheckoutStore::new(Duration::from_secs(60));
        let user = UserId::new(1);
        store.put(user, snapshot("cs_1")).await;

        let first = store.take(user).await;
        assert_eq!(first.unwrap().payment_session_id, "cs_1");
        // Replay: already consumed.
        assert!(store.take(user).await.is_none());
    }

    #[tokio::test]
    async fn test_put_replaces_previous_snapshot() {
        let store = CheckoutStore::new(Duration::from_secs(60));
        let user = UserId::new(1);
        store.put(user, snapshot("cs_1")).await;
        store.put(user, snapshot("cs_2")).await;

        assert_eq!(store.take(user).await.unwrap().payment_session_id, "cs_2");
    }

    #[tokio::test]
    async fn test_expired_snapshot_is_gone() {
        let store = CheckoutStore::new(Duration::from_millis(50));
        let user = UserId::new(1);
        store.put(user, snapshot("cs_1")).await;

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(store.take(user).await.is_none());
    }

    #[tokio::test]
    async fn test_isolated_per_user() {
        let store = CheckoutStore::new(Duration::from_secs(60));
        store.put(UserId::new(1), snapshot("cs_1")).await;

        assert!(store.take(UserId::new(2)).await.is_none());
        assert!(store.take(UserId::new(1)).await.is_some());
    }
}
