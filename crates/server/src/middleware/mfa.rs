//! MFA session-gating middleware.
//!
//! Once an account has MFA enabled, every request outside a small
//! allow-list is blocked until the current session has passed a code
//! check. The verification mark is session-scoped and does not persist
//! across sessions. The staff surface is gated separately: staff with a
//! confirmed device must verify per session, staff without one are sent
//! to setup first.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use securecart_core::UserId;

use crate::db::mfa::MfaDeviceRepository;
use crate::db::users::UserRepository;
use crate::models::session_keys;
use crate::state::AppState;

/// Path prefixes reachable without an MFA-verified session.
///
/// Login, logout, registration, the verification endpoints themselves,
/// static assets, and health checks.
const EXEMPT_PREFIXES: &[&str] = &[
    "/auth/login",
    "/auth/logout",
    "/auth/register",
    "/auth/mfa/verify",
    "/staff/login",
    "/staff/logout",
    "/staff/mfa/setup",
    "/staff/mfa/verify",
    "/static",
    "/media",
    "/health",
];

/// Whether a path is reachable without MFA verification.
#[must_use]
pub fn is_exempt(path: &str) -> bool {
    EXEMPT_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

/// Gate requests on the session's MFA verification mark.
pub async fn require_mfa_verification(
    State(state): State<AppState>,
    session: Session,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_owned();
    if is_exempt(&path) {
        return next.run(request).await;
    }

    // Anonymous requests pass through; the auth extractors handle them.
    let Some(user_id) = session
        .get::<UserId>(session_keys::USER_ID)
        .await
        .ok()
        .flatten()
    else {
        return next.run(request).await;
    };
    let Ok(Some(user)) = UserRepository::new(state.pool()).get_by_id(user_id).await else {
        return next.run(request).await;
    };

    if path.starts_with("/staff") && user.is_staff() {
        // Staff MFA is mandatory: no confirmed device means setup, a
        // confirmed device means a per-session code check.
        return match MfaDeviceRepository::new(state.pool())
            .get_confirmed(user.id)
            .await
        {
            Ok(Some(_)) => {
                if session_flag(&session, session_keys::STAFF_MFA_VERIFIED).await {
                    next.run(request).await
                } else {
                    Redirect::to("/staff/mfa/verify").into_response()
                }
            }
            Ok(None) => Redirect::to("/staff/mfa/setup").into_response(),
            Err(e) => {
                tracing::error!(error = %e, "MFA device lookup failed");
                axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        };
    }

    if user.mfa_enabled && !session_flag(&session, session_keys::MFA_VERIFIED).await {
        return Redirect::to("/auth/mfa/verify").into_response();
    }

    next.run(request).await
}

async fn session_flag(session: &Session, key: &str) -> bool {
    session.get::<bool>(key).await.ok().flatten().unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_list() {
        assert!(is_exempt("/auth/login"));
        assert!(is_exempt("/auth/logout"));
        assert!(is_exempt("/auth/register"));
        assert!(is_exempt("/auth/mfa/verify"));
        assert!(is_exempt("/static/css/site.css"));
        assert!(is_exempt("/media/products/desk.jpg"));
        assert!(is_exempt("/health"));
        assert!(is_exempt("/staff/mfa/setup"));
    }

    #[test]
    fn test_everything_else_is_gated() {
        assert!(!is_exempt("/"));
        assert!(!is_exempt("/products"));
        assert!(!is_exempt("/cart"));
        assert!(!is_exempt("/checkout"));
        assert!(!is_exempt("/orders/1"));
        assert!(!is_exempt("/account"));
        assert!(!is_exempt("/auth/mfa/disable"));
        assert!(!is_exempt("/staff/orders"));
    }
}
