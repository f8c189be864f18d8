//! Authentication extractors.
//!
//! The session stores only the user ID; the account row is loaded fresh
//! on every request so role and MFA changes take effect immediately.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use securecart_core::UserId;

use crate::db::users::UserRepository;
use crate::models::session_keys;
use crate::models::user::User;
use crate::state::AppState;

/// Rejection for authentication-requiring extractors.
pub enum AuthRejection {
    /// Redirect to the matching login page.
    RedirectToLogin {
        staff: bool,
    },
    /// Logged in, but the surface is off-limits for this role.
    Forbidden,
    /// Session machinery unavailable or account unusable.
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin { staff: true } => Redirect::to("/staff/login").into_response(),
            Self::RedirectToLogin { staff: false } => Redirect::to("/auth/login").into_response(),
            Self::Forbidden => StatusCode::FORBIDDEN.into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

/// Load the session's user, if any.
async fn load_session_user(parts: &mut Parts, state: &AppState) -> Option<User> {
    let session = parts.extensions.get::<Session>()?;
    let user_id: UserId = session.get(session_keys::USER_ID).await.ok().flatten()?;
    UserRepository::new(state.pool())
        .get_by_id(user_id)
        .await
        .ok()
        .flatten()
        .filter(|user| user.is_active)
}

/// Extractor that requires a logged-in user.
pub struct RequireUser(pub User);

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let staff = parts.uri.path().starts_with("/staff");
        load_session_user(parts, state)
            .await
            .map(Self)
            .ok_or(AuthRejection::RedirectToLogin { staff })
    }
}

/// Extractor that requires a logged-in staff member.
pub struct RequireStaff(pub User);

impl FromRequestParts<AppState> for RequireStaff {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = load_session_user(parts, state)
            .await
            .ok_or(AuthRejection::RedirectToLogin { staff: true })?;
        if !user.is_staff() {
            return Err(AuthRejection::Forbidden);
        }
        Ok(Self(user))
    }
}

/// Extractor that optionally resolves the current user without rejecting.
pub struct OptionalUser(pub Option<User>);

impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self(load_session_user(parts, state).await))
    }
}

/// Mark the session as belonging to `user`. Any MFA verification mark
/// from a previous login is discarded.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &User,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(session_keys::USER_ID, user.id).await?;
    session
        .remove::<bool>(session_keys::MFA_VERIFIED)
        .await?;
    session
        .remove::<bool>(session_keys::STAFF_MFA_VERIFIED)
        .await?;
    Ok(())
}

/// Destroy the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be deleted.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
