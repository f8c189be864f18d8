//! Login attempt audit record.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use securecart_core::{LoginAttemptId, UserId};

/// One authentication attempt, success or failure.
///
/// The username is recorded as submitted, even when it matches no
/// account. Append-only: the only mutation the application performs is
/// the superuser bulk purge.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LoginAttempt {
    pub id: LoginAttemptId,
    /// Resolved account, if the username matched one.
    pub user_id: Option<UserId>,
    pub username: String,
    pub ip_address: String,
    pub success: bool,
    /// Whether the attempt hit the staff login surface.
    pub staff_surface: bool,
    pub created_at: DateTime<Utc>,
}
