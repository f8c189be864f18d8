//! Customer order route handlers.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use tracing::instrument;

use securecart_core::OrderId;

use crate::db::orders::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::models::order::{Order, OrderItem};
use crate::services::orders::OrderService;
use crate::state::AppState;

/// An order with its lines.
#[derive(Debug, Serialize)]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

async fn owned_order(state: &AppState, order_id: OrderId, user_id: securecart_core::UserId) -> Result<Order> {
    OrderRepository::new(state.pool())
        .get_for_user(order_id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))
}

/// The user's order history, newest first.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn list(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Vec<Order>>> {
    let orders = OrderRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;
    Ok(Json(orders))
}

/// Order detail, scoped to the owner. A foreign order reads as missing.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn detail(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(order_id): Path<OrderId>,
) -> Result<Json<OrderView>> {
    let order = owned_order(&state, order_id, user.id).await?;
    let items = OrderRepository::new(state.pool()).items(order.id).await?;
    Ok(Json(OrderView { order, items }))
}

/// Confirmation step after a successful checkout.
///
/// The confirmation notification goes out at most once per order no
/// matter how often this endpoint is revisited.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn confirmation(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(order_id): Path<OrderId>,
) -> Result<Json<OrderView>> {
    let order = owned_order(&state, order_id, user.id).await?;

    OrderService::new(state.pool(), state.mailer())
        .send_confirmation_once(&order, user.id)
        .await?;

    // Re-read so the response reflects the flipped confirmation flag.
    let order = owned_order(&state, order_id, user.id).await?;
    let items = OrderRepository::new(state.pool()).items(order.id).await?;
    Ok(Json(OrderView { order, items }))
}

/// Cancel a pending order. Restocks surviving products and dispatches
/// the cancellation notification; rejected with no mutation for any
/// other status.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn cancel(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(order_id): Path<OrderId>,
) -> Result<Json<Order>> {
    let order = OrderService::new(state.pool(), state.mailer())
        .cancel_for_user(order_id, user.id)
        .await?;
    Ok(Json(order))
}
