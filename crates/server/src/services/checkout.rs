//! Checkout orchestration.
//!
//! `begin` snapshots the cart and opens a hosted payment session;
//! `finalize` runs on the provider's success callback, re-verifies the
//! payment with the provider, and materializes the order in one
//! transaction. The snapshot, not the live cart, prices the order:
//! concurrent cart edits during payment cannot corrupt it. Stock is
//! checked at `begin` and re-checked inside the commit transaction;
//! inventory is never locked across the external payment round-trip.

use sqlx::PgPool;
use thiserror::Error;
use url::Url;

use securecart_core::AddressId;

use crate::config::SecurecartConfig;
use crate::db::RepositoryError;
use crate::db::addresses::AddressRepository;
use crate::db::carts::CartRepository;
use crate::db::orders::OrderRepository;
use crate::models::cart;
use crate::models::checkout::{CheckoutSnapshot, SnapshotLine};
use crate::models::order::Order;
use crate::models::user::User;
use crate::services::payments::{
    CreateSessionRequest, HostedSession, PaymentError, PaymentGateway, SessionLineItem,
};
use crate::services::snapshots::CheckoutStore;

/// Errors from the checkout flow.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Nothing to check out.
    #[error("cart is empty")]
    EmptyCart,

    /// The user has no saved addresses; checkout cannot start.
    #[error("no shipping address on file")]
    NoShippingAddress,

    /// The submitted address is not one of the user's.
    #[error("invalid address selection")]
    InvalidAddressSelection,

    /// A line cannot be covered by current stock. Raised at the
    /// pre-check and again, authoritatively, inside the commit
    /// transaction.
    #[error("insufficient stock for {product}: {available} available")]
    InsufficientStock {
        product: String,
        available: i32,
    },

    /// The payment session could not be created; the cart is unchanged.
    #[error("payment session error: {0}")]
    PaymentSession(PaymentError),

    /// The provider did not confirm a successful payment for this
    /// session. No order is created.
    #[error("payment verification failed")]
    PaymentVerificationFailed,

    /// No (or an expired/already-consumed) pending checkout for this
    /// user. Stale or replayed callbacks land here.
    #[error("no pending checkout")]
    NoPendingCheckout,

    /// Repository failure outside the taxonomy above.
    #[error("database error: {0}")]
    Repository(RepositoryError),

    /// The checkout redirect URLs could not be built from the base URL.
    #[error("invalid base url: {0}")]
    BaseUrl(#[from] url::ParseError),
}

impl From<RepositoryError> for CheckoutError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::InsufficientStock { product, available } => {
                Self::InsufficientStock { product, available }
            }
            other => Self::Repository(other),
        }
    }
}

/// Orchestrates one checkout attempt per user.
pub struct CheckoutService<'a, G> {
    pool: &'a PgPool,
    gateway: &'a G,
    snapshots: &'a CheckoutStore,
    config: &'a SecurecartConfig,
}

impl<'a, G: PaymentGateway> CheckoutService<'a, G> {
    /// Create a new checkout service.
    #[must_use]
    pub const fn new(
        pool: &'a PgPool,
        gateway: &'a G,
        snapshots: &'a CheckoutStore,
        config: &'a SecurecartConfig,
    ) -> Self {
        Self {
            pool,
            gateway,
            snapshots,
            config,
        }
    }

    /// Start a checkout: validate the cart and address, pre-check stock,
    /// open a hosted payment session, and stash the snapshot.
    ///
    /// Nothing is persisted on failure; the user returns to the cart (or
    /// to address management) unchanged.
    ///
    /// # Errors
    ///
    /// See [`CheckoutError`]; every variant except
    /// `PaymentVerificationFailed` and `NoPendingCheckout` can occur
    /// here.
    pub async fn begin(
        &self,
        user: &User,
        address_id: AddressId,
    ) -> Result<HostedSession, CheckoutError> {
        let carts = CartRepository::new(self.pool);
        let cart_row = carts.get_or_create(user.id).await?;
        let lines = carts.lines(cart_row.id).await?;
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let addresses = AddressRepository::new(self.pool)
            .list_for_user(user.id)
            .await?;
        if addresses.is_empty() {
            return Err(CheckoutError::NoShippingAddress);
        }
        let address = addresses
            .iter()
            .find(|address| address.id == address_id)
            .ok_or(CheckoutError::InvalidAddressSelection)?;

        // Pre-check: no partial checkout. The authoritative check runs
        // again inside the materialization transaction.
        for line in &lines {
            if line.quantity > line.stock {
                return Err(CheckoutError::InsufficientStock {
                    product: line.name.clone(),
                    available: line.stock,
                });
            }
        }

        let request = CreateSessionRequest {
            currency: self.config.payment.currency.clone(),
            customer_email: user.email.to_string(),
            success_url: self.absolute_url("/checkout/complete")?,
            cancel_url: self.absolute_url("/cart")?,
            line_items: lines
                .iter()
                .map(|line| SessionLineItem {
                    name: line.name.clone(),
                    quantity: line.quantity,
                    unit_amount: line.unit_price.minor_units(),
                })
                .collect(),
        };

        let session = self
            .gateway
            .create_session(&request)
            .await
            .map_err(CheckoutError::PaymentSession)?;

        // Snapshot taken only after the session exists, and stored last:
        // a provider failure leaves no state behind. Re-initiating
        // checkout replaces any earlier snapshot.
        let snapshot = CheckoutSnapshot {
            lines: lines
                .iter()
                .map(|line| SnapshotLine {
                    product_id: line.product_id,
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                })
                .collect(),
            total_amount: cart::total_price(&lines),
            shipping_address_id: address.id,
            payment_session_id: session.id.clone(),
        };
        self.snapshots.put(user.id, snapshot).await;

        Ok(session)
    }

    /// Materialize the order for the user's pending checkout.
    ///
    /// The snapshot is consumed up front, so a replayed callback finds
    /// nothing and cannot create a duplicate order. The payment session
    /// is then re-verified with the provider; only a confirmed `paid`
    /// status proceeds to the atomic commit (order + items + stock
    /// decrement + cart clear, all or nothing).
    ///
    /// # Errors
    ///
    /// `NoPendingCheckout` for missing/expired/replayed snapshots,
    /// `PaymentVerificationFailed` when the provider doesn't confirm the
    /// payment, `InsufficientStock` when the in-transaction re-check
    /// fails (full rollback).
    pub async fn finalize(&self, user: &User) -> Result<Order, CheckoutError> {
        let snapshot = self
            .snapshots
            .take(user.id)
            .await
            .ok_or(CheckoutError::NoPendingCheckout)?;

        let status = self
            .gateway
            .retrieve_session(&snapshot.payment_session_id)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "payment session retrieval failed");
                CheckoutError::PaymentVerificationFailed
            })?;
        if !status.payment_status.is_paid() {
            return Err(CheckoutError::PaymentVerificationFailed);
        }
        let payment_reference = status.payment_intent.unwrap_or_default();

        let order = OrderRepository::new(self.pool)
            .create_from_snapshot(user.id, &snapshot, &payment_reference)
            .await?;

        tracing::info!(order_id = %order.id, user_id = %user.id, "order materialized");
        Ok(order)
    }

    fn absolute_url(&self, path: &str) -> Result<String, url::ParseError> {
        Ok(Url::parse(&self.config.base_url)?.join(path)?.to_string())
    }
}
