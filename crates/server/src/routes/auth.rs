//! Authentication route handlers (customer surface).

use std::net::SocketAddr;

use axum::{
    Form, Json,
    extract::{ConnectInfo, State},
    http::HeaderMap,
    response::Redirect,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use crate::error::Result;
use crate::middleware::{clear_current_user, set_current_user};
use crate::models::user::User;
use crate::routes::client_ip;
use crate::services::auth::{AuthService, LoginSurface};
use crate::state::AppState;

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// Login response: the account plus whether this session still needs an
/// MFA code before it can go anywhere.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: User,
    pub mfa_required: bool,
}

/// Register a new customer and log them straight in.
#[instrument(skip(state, session, form))]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Json<User>> {
    let user = AuthService::new(state.pool())
        .register(
            &form.username,
            &form.email,
            &form.first_name,
            &form.last_name,
            &form.password,
        )
        .await?;

    set_current_user(&session, &user)
        .await
        .map_err(|e| crate::error::AppError::Internal(e.to_string()))?;

    tracing::info!(user_id = %user.id, "account registered");
    Ok(Json(user))
}

/// Customer login. Every attempt lands in the audit log, success or not,
/// keyed to the customer surface.
#[instrument(skip(state, session, headers, form))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Form(form): Form<LoginForm>,
) -> Result<Json<LoginResponse>> {
    let ip = client_ip(&headers, peer);
    let user = AuthService::new(state.pool())
        .login(&form.username, &form.password, LoginSurface::Customer, &ip)
        .await?;

    set_current_user(&session, &user)
        .await
        .map_err(|e| crate::error::AppError::Internal(e.to_string()))?;

    let mfa_required = user.mfa_enabled;
    Ok(Json(LoginResponse { user, mfa_required }))
}

/// Log out: the session (and its MFA verification mark) is destroyed.
#[instrument(skip(session))]
pub async fn logout(session: Session) -> Result<Redirect> {
    clear_current_user(&session)
        .await
        .map_err(|e| crate::error::AppError::Internal(e.to_string()))?;
    Ok(Redirect::to("/"))
}
