//! Cart route handlers.
//!
//! Totals are computed fresh from current product prices on every read;
//! nothing here snapshots prices. Stock is not validated at add time by
//! design - it is checked at checkout and again at order materialization.

use axum::{
    Form, Json,
    extract::State,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use securecart_core::{CartItemId, ProductId};

use crate::db::carts::CartRepository;
use crate::db::catalog::CatalogRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::models::cart::{self, CartLine};
use crate::state::AppState;

/// Cart contents with live totals.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub total_price: Decimal,
    pub item_count: i32,
}

impl CartView {
    fn from_lines(items: Vec<CartLine>) -> Self {
        let total_price = cart::total_price(&items);
        let item_count = items.iter().map(|line| line.quantity).sum();
        Self {
            items,
            total_price,
            item_count,
        }
    }
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: ProductId,
    pub quantity: Option<i32>,
    /// Overwrite the existing quantity instead of adding to it.
    #[serde(default)]
    pub override_quantity: bool,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub item_id: CartItemId,
    pub quantity: i32,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub item_id: CartItemId,
}

async fn current_cart_view(state: &AppState, user_id: securecart_core::UserId) -> Result<CartView> {
    let repo = CartRepository::new(state.pool());
    let cart_row = repo.get_or_create(user_id).await?;
    let lines = repo.lines(cart_row.id).await?;
    Ok(CartView::from_lines(lines))
}

/// Show the cart.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<CartView>> {
    Ok(Json(current_cart_view(&state, user.id).await?))
}

/// Add a product to the cart.
///
/// Staff accounts do not shop; out-of-stock products are rejected here,
/// but available stock is otherwise not checked until checkout.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Form(form): Form<AddToCartForm>,
) -> Result<Json<CartView>> {
    if user.is_staff() {
        return Err(AppError::Forbidden(
            "administrators cannot add items to cart".to_owned(),
        ));
    }

    let product = CatalogRepository::new(state.pool())
        .get_by_id(form.product_id)
        .await?
        .ok_or_else(|| AppError::NotFound("product".to_owned()))?;
    if product.stock <= 0 {
        return Err(AppError::BadRequest(
            "sorry, this product is out of stock".to_owned(),
        ));
    }

    let quantity = form.quantity.unwrap_or(1);
    if quantity <= 0 {
        return Err(AppError::BadRequest("quantity must be positive".to_owned()));
    }

    let repo = CartRepository::new(state.pool());
    let cart_row = repo.get_or_create(user.id).await?;
    repo.add_item(cart_row.id, product.id, quantity, form.override_quantity)
        .await?;

    Ok(Json(current_cart_view(&state, user.id).await?))
}

/// Set a line's quantity. Zero or less removes the line; more than the
/// available stock is rejected with the available amount.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Form(form): Form<UpdateCartForm>,
) -> Result<Json<CartView>> {
    CartRepository::new(state.pool())
        .update_quantity(form.item_id, user.id, form.quantity)
        .await?;
    Ok(Json(current_cart_view(&state, user.id).await?))
}

/// Remove a line from the cart.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Json<CartView>> {
    if !CartRepository::new(state.pool())
        .remove_item(form.item_id, user.id)
        .await?
    {
        return Err(AppError::NotFound("cart item".to_owned()));
    }
    Ok(Json(current_cart_view(&state, user.id).await?))
}

/// Clear the cart. Idempotent: clearing an empty cart succeeds.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn clear(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<CartView>> {
    CartRepository::new(state.pool()).clear(user.id).await?;
    Ok(Json(current_cart_view(&state, user.id).await?))
}
