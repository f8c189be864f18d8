//! Account route handlers: dashboard, profile, address book.

use axum::{
    Form, Json,
    extract::{Path, State},
};
use serde::Serialize;
use tracing::instrument;

use securecart_core::AddressId;

use crate::db::addresses::AddressRepository;
use crate::db::orders::OrderRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::models::address::{Address, AddressForm};
use crate::models::order::Order;
use crate::models::user::{ProfileUpdate, User};
use crate::services::auth::AuthService;
use crate::state::AppState;

/// Recent orders shown on the dashboard.
const RECENT_ORDERS: usize = 5;

/// Dashboard data.
#[derive(Debug, Serialize)]
pub struct DashboardView {
    pub user: User,
    pub recent_orders: Vec<Order>,
    pub address_count: usize,
}

/// Account dashboard: recent orders and address book summary.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn dashboard(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<DashboardView>> {
    let mut recent_orders = OrderRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;
    recent_orders.truncate(RECENT_ORDERS);

    let address_count = AddressRepository::new(state.pool())
        .list_for_user(user.id)
        .await?
        .len();

    Ok(Json(DashboardView {
        user,
        recent_orders,
        address_count,
    }))
}

/// Edit the user's own profile. Submitted role values are ignored for
/// non-superusers; nobody self-escalates through this form.
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Form(form): Form<ProfileUpdate>,
) -> Result<Json<User>> {
    let updated = AuthService::new(state.pool())
        .update_profile(&user, &user, &form)
        .await?;
    Ok(Json(updated))
}

/// The user's address book.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn addresses(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<Vec<Address>>> {
    let addresses = AddressRepository::new(state.pool())
        .list_for_user(user.id)
        .await?;
    Ok(Json(addresses))
}

/// Save a new address.
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn create_address(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Form(form): Form<AddressForm>,
) -> Result<Json<Address>> {
    let address = AddressRepository::new(state.pool())
        .create(user.id, &form)
        .await?;
    Ok(Json(address))
}

/// Update an address. Someone else's address reads as missing.
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn update_address(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(address_id): Path<AddressId>,
    Form(form): Form<AddressForm>,
) -> Result<Json<Address>> {
    let address = AddressRepository::new(state.pool())
        .update(address_id, user.id, &form)
        .await?;
    Ok(Json(address))
}

/// Delete an address. Orders that shipped to it keep a NULL reference.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn delete_address(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(address_id): Path<AddressId>,
) -> Result<Json<serde_json::Value>> {
    if !AddressRepository::new(state.pool())
        .delete(address_id, user.id)
        .await?
    {
        return Err(AppError::NotFound("address".to_owned()));
    }
    Ok(Json(serde_json::json!({ "deleted": true })))
}
