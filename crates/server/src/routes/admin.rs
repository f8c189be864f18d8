//! Staff surface route handlers.
//!
//! Every entry point consults the central authorization policy
//! (`services::authz::can`) rather than re-deriving role checks. The
//! staff login surface is audited separately from the customer one, and
//! staff sessions are MFA-gated by the middleware (setup is mandatory).

use std::net::SocketAddr;

use axum::{
    Form, Json,
    extract::{ConnectInfo, Path, Query, State},
    http::HeaderMap,
    response::Redirect,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use securecart_core::{OrderId, OrderStatus, Price, ProductId, SubcategoryId, UserId};

use crate::db::audit::LoginAttemptRepository;
use crate::db::catalog::CatalogRepository;
use crate::db::mfa::MfaDeviceRepository;
use crate::db::orders::OrderRepository;
use crate::db::users::UserRepository;
use crate::error::{AppError, Result};
use crate::middleware::{RequireStaff, clear_current_user, set_current_user};
use crate::models::audit::LoginAttempt;
use crate::models::catalog::Product;
use crate::models::order::Order;
use crate::models::session_keys;
use crate::models::user::{ProfileUpdate, User};
use crate::routes::client_ip;
use crate::services::auth::{AuthService, LoginSurface};
use crate::services::authz::{Action, can};
use crate::services::mfa::TotpService;
use crate::services::orders::OrderService;
use crate::state::AppState;

/// Name recorded on staff-enrolled devices.
const STAFF_DEVICE_NAME: &str = "Admin MFA Device";

/// Orders per staff listing page.
const PAGE_SIZE: i64 = 50;

fn authorize(actor: &User, action: Action) -> Result<()> {
    if can(actor.role, action) {
        Ok(())
    } else {
        Err(AppError::Forbidden("not permitted".to_owned()))
    }
}

// =============================================================================
// Session
// =============================================================================

/// Staff login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Staff login response.
#[derive(Debug, Serialize)]
pub struct StaffLoginResponse {
    pub user: User,
    /// Whether the account still has to enroll an MFA device before the
    /// staff surface opens up.
    pub mfa_setup_required: bool,
}

/// Staff login. Audited with the staff-surface flag; customer accounts
/// are rejected the same way wrong credentials are.
#[instrument(skip(state, session, headers, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Form(form): Form<LoginForm>,
) -> Result<Json<StaffLoginResponse>> {
    let ip = client_ip(&headers, peer);
    let user = AuthService::new(state.pool())
        .login(&form.username, &form.password, LoginSurface::Staff, &ip)
        .await?;

    set_current_user(&session, &user)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let mfa_setup_required = MfaDeviceRepository::new(state.pool())
        .get_confirmed(user.id)
        .await?
        .is_none();

    Ok(Json(StaffLoginResponse {
        user,
        mfa_setup_required,
    }))
}

/// Staff logout.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<Redirect> {
    clear_current_user(&session)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Redirect::to("/staff/login"))
}

// =============================================================================
// Orders
// =============================================================================

/// Paging for staff listings.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: i64,
}

/// All orders, newest first.
#[instrument(skip(state, actor), fields(actor_id = %actor.id))]
pub async fn orders(
    State(state): State<AppState>,
    RequireStaff(actor): RequireStaff,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<Order>>> {
    authorize(&actor, Action::ViewOrders)?;
    let orders = OrderRepository::new(state.pool())
        .list_all(PAGE_SIZE, query.page.max(0) * PAGE_SIZE)
        .await?;
    Ok(Json(orders))
}

/// Status change form data.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: OrderStatus,
}

/// Advance an order's status. Illegal transitions are rejected with no
/// mutation; every applied change dispatches its notification.
#[instrument(skip(state, actor), fields(actor_id = %actor.id))]
pub async fn order_status(
    State(state): State<AppState>,
    RequireStaff(actor): RequireStaff,
    Path(order_id): Path<OrderId>,
    Form(form): Form<StatusForm>,
) -> Result<Json<Order>> {
    authorize(&actor, Action::TransitionOrder)?;
    let order = OrderService::new(state.pool(), state.mailer())
        .transition(order_id, form.status)
        .await?;
    Ok(Json(order))
}

// =============================================================================
// Products
// =============================================================================

/// Products at or below their restock threshold.
#[instrument(skip(state, actor), fields(actor_id = %actor.id))]
pub async fn low_stock(
    State(state): State<AppState>,
    RequireStaff(actor): RequireStaff,
) -> Result<Json<Vec<Product>>> {
    authorize(&actor, Action::ManageProducts)?;
    let products = CatalogRepository::new(state.pool()).list_low_stock().await?;
    Ok(Json(products))
}

/// Product creation form data.
#[derive(Debug, Deserialize)]
pub struct CreateProductForm {
    pub subcategory_id: SubcategoryId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub stock: i32,
    pub low_stock_threshold: Option<i32>,
    #[serde(default)]
    pub featured: bool,
}

/// Create a product. Price is validated non-negative at the type
/// boundary.
#[instrument(skip(state, actor, form), fields(actor_id = %actor.id))]
pub async fn create_product(
    State(state): State<AppState>,
    RequireStaff(actor): RequireStaff,
    Form(form): Form<CreateProductForm>,
) -> Result<Json<Product>> {
    authorize(&actor, Action::ManageProducts)?;
    let price = Price::new(form.price).map_err(|e| AppError::BadRequest(e.to_string()))?;
    if form.stock < 0 {
        return Err(AppError::BadRequest("stock cannot be negative".to_owned()));
    }

    let product = CatalogRepository::new(state.pool())
        .create_product(
            form.subcategory_id,
            &form.name,
            &form.slug,
            &form.description,
            price,
            form.stock,
            form.low_stock_threshold.unwrap_or(5),
            form.featured,
        )
        .await?;
    Ok(Json(product))
}

/// Product update form data. Stock is deliberately absent: only the
/// order flow mutates it.
#[derive(Debug, Deserialize)]
pub struct UpdateProductForm {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub low_stock_threshold: i32,
    #[serde(default)]
    pub featured: bool,
}

/// Update a product's catalog fields.
#[instrument(skip(state, actor, form), fields(actor_id = %actor.id))]
pub async fn update_product(
    State(state): State<AppState>,
    RequireStaff(actor): RequireStaff,
    Path(product_id): Path<ProductId>,
    Form(form): Form<UpdateProductForm>,
) -> Result<Json<Product>> {
    authorize(&actor, Action::ManageProducts)?;
    let price = Price::new(form.price).map_err(|e| AppError::BadRequest(e.to_string()))?;

    let product = CatalogRepository::new(state.pool())
        .update_product(
            product_id,
            &form.name,
            &form.description,
            price,
            form.low_stock_threshold,
            form.featured,
        )
        .await?;
    Ok(Json(product))
}

// =============================================================================
// Users
// =============================================================================

/// Account listing. Non-superuser staff only see customers.
#[instrument(skip(state, actor), fields(actor_id = %actor.id))]
pub async fn users(
    State(state): State<AppState>,
    RequireStaff(actor): RequireStaff,
) -> Result<Json<Vec<User>>> {
    authorize(&actor, Action::ViewUsers)?;
    let users = UserRepository::new(state.pool())
        .list(actor.role.is_superuser())
        .await?;
    Ok(Json(users))
}

/// Edit another account. The role actually written goes through the
/// same sanitizer as self-edits: only superusers change roles, and
/// non-superuser staff cannot touch staff accounts at all.
#[instrument(skip(state, actor, form), fields(actor_id = %actor.id))]
pub async fn edit_user(
    State(state): State<AppState>,
    RequireStaff(actor): RequireStaff,
    Path(user_id): Path<UserId>,
    Form(form): Form<ProfileUpdate>,
) -> Result<Json<User>> {
    let target = UserRepository::new(state.pool())
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("user".to_owned()))?;
    authorize(&actor, Action::EditUser { target: target.role })?;

    let updated = AuthService::new(state.pool())
        .update_profile(&actor, &target, &form)
        .await?;
    Ok(Json(updated))
}

// =============================================================================
// Audit log
// =============================================================================

/// The login audit log, newest first (superuser only).
#[instrument(skip(state, actor), fields(actor_id = %actor.id))]
pub async fn login_attempts(
    State(state): State<AppState>,
    RequireStaff(actor): RequireStaff,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<LoginAttempt>>> {
    authorize(&actor, Action::ViewAuditLog)?;
    let attempts = LoginAttemptRepository::new(state.pool())
        .list(PAGE_SIZE, query.page.max(0) * PAGE_SIZE)
        .await?;
    Ok(Json(attempts))
}

/// Bulk-delete the audit log (superuser only). The one sanctioned
/// mutation of an otherwise append-only log.
#[instrument(skip(state, actor), fields(actor_id = %actor.id))]
pub async fn purge_login_attempts(
    State(state): State<AppState>,
    RequireStaff(actor): RequireStaff,
) -> Result<Json<serde_json::Value>> {
    authorize(&actor, Action::PurgeAuditLog)?;
    let deleted = LoginAttemptRepository::new(state.pool()).purge().await?;
    tracing::info!(actor_id = %actor.id, deleted, "login audit log purged");
    Ok(Json(serde_json::json!({ "deleted": deleted })))
}

// =============================================================================
// Staff MFA
// =============================================================================

/// Code submission form.
#[derive(Debug, Deserialize)]
pub struct CodeForm {
    pub code: String,
}

/// Staff enrollment material.
#[derive(Debug, Serialize)]
pub struct StaffEnrollmentView {
    pub otpauth_url: String,
    pub qr_png_base64: String,
}

/// Start (or resume) staff device enrollment.
#[instrument(skip(state, actor), fields(actor_id = %actor.id))]
pub async fn mfa_setup(
    State(state): State<AppState>,
    RequireStaff(actor): RequireStaff,
) -> Result<Json<StaffEnrollmentView>> {
    let repo = MfaDeviceRepository::new(state.pool());
    let device = match repo.get_unconfirmed(actor.id).await? {
        Some(device) => device,
        None => {
            repo.create_unconfirmed(actor.id, STAFF_DEVICE_NAME, &TotpService::generate_secret())
                .await?
        }
    };

    let account = actor.email.as_str();
    Ok(Json(StaffEnrollmentView {
        otpauth_url: state.totp().provisioning_uri(&device.secret, account)?,
        qr_png_base64: state.totp().qr_png_base64(&device.secret, account)?,
    }))
}

/// Confirm the staff device with one valid code and mark this session
/// verified for the staff surface.
#[instrument(skip(state, session, actor, form), fields(actor_id = %actor.id))]
pub async fn mfa_confirm(
    State(state): State<AppState>,
    session: Session,
    RequireStaff(actor): RequireStaff,
    Form(form): Form<CodeForm>,
) -> Result<Json<serde_json::Value>> {
    let repo = MfaDeviceRepository::new(state.pool());
    let device = repo
        .get_unconfirmed(actor.id)
        .await?
        .ok_or_else(|| AppError::NotFound("no enrollment in progress".to_owned()))?;

    if !state
        .totp()
        .verify(&device.secret, actor.email.as_str(), &form.code)?
    {
        return Err(AppError::BadRequest("invalid token".to_owned()));
    }

    repo.confirm(device.id).await?;
    session
        .insert(session_keys::STAFF_MFA_VERIFIED, true)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    tracing::info!(actor_id = %actor.id, "staff MFA device confirmed");
    Ok(Json(serde_json::json!({ "confirmed": true })))
}

/// Verify a staff session against the confirmed device.
#[instrument(skip(state, session, actor, form), fields(actor_id = %actor.id))]
pub async fn mfa_verify(
    State(state): State<AppState>,
    session: Session,
    RequireStaff(actor): RequireStaff,
    Form(form): Form<CodeForm>,
) -> Result<Json<serde_json::Value>> {
    let device = MfaDeviceRepository::new(state.pool())
        .get_confirmed(actor.id)
        .await?
        .ok_or_else(|| AppError::NotFound("no confirmed device".to_owned()))?;

    if !state
        .totp()
        .verify(&device.secret, actor.email.as_str(), &form.code)?
    {
        return Err(AppError::BadRequest("invalid token".to_owned()));
    }

    session
        .insert(session_keys::STAFF_MFA_VERIFIED, true)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(serde_json::json!({ "verified": true })))
}
