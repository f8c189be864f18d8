//! Checkout route handlers.
//!
//! `begin` hands the customer off to the provider's hosted payment page;
//! `complete` is the provider's success redirect. Failures follow the
//! original flow: the user is sent back to the remediation step (cart or
//! address book) rather than shown an error page.

use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use securecart_core::AddressId;

use crate::middleware::RequireUser;
use crate::services::checkout::{CheckoutError, CheckoutService};
use crate::state::AppState;

/// Checkout form data: the chosen shipping address.
#[derive(Debug, Deserialize)]
pub struct BeginCheckoutForm {
    pub address_id: AddressId,
}

/// Where a failed checkout step sends the user.
fn redirect_for(error: &CheckoutError) -> Redirect {
    match error {
        CheckoutError::NoShippingAddress => Redirect::to("/account/addresses?error=no_address"),
        CheckoutError::InvalidAddressSelection => Redirect::to("/checkout?error=invalid_address"),
        CheckoutError::EmptyCart => Redirect::to("/cart?error=empty_cart"),
        CheckoutError::InsufficientStock { .. } => Redirect::to("/cart?error=insufficient_stock"),
        CheckoutError::PaymentSession(_) => Redirect::to("/cart?error=payment_session"),
        CheckoutError::PaymentVerificationFailed => {
            Redirect::to("/cart?error=payment_verification")
        }
        CheckoutError::NoPendingCheckout => Redirect::to("/cart?error=no_pending_checkout"),
        CheckoutError::Repository(_) | CheckoutError::BaseUrl(_) => {
            Redirect::to("/cart?error=checkout_failed")
        }
    }
}

/// Begin checkout: validate address and stock, open the hosted payment
/// session, and redirect the customer to the provider.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn begin(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Form(form): Form<BeginCheckoutForm>,
) -> Response {
    let service = CheckoutService::new(
        state.pool(),
        state.payments(),
        state.snapshots(),
        state.config(),
    );

    match service.begin(&user, form.address_id).await {
        Ok(session) => Redirect::to(&session.url).into_response(),
        Err(error) => {
            tracing::warn!(user_id = %user.id, %error, "checkout begin failed");
            redirect_for(&error).into_response()
        }
    }
}

/// Provider success callback: verify the payment and materialize the
/// order, then continue to the confirmation step.
///
/// Replays of this callback find the snapshot already consumed and
/// bounce back to the cart; no duplicate order is created.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn complete(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Response {
    let service = CheckoutService::new(
        state.pool(),
        state.payments(),
        state.snapshots(),
        state.config(),
    );

    match service.finalize(&user).await {
        Ok(order) => Redirect::to(&format!("/orders/{}/confirmation", order.id)).into_response(),
        Err(error) => {
            tracing::warn!(user_id = %user.id, %error, "checkout finalize failed");
            redirect_for(&error).into_response()
        }
    }
}
