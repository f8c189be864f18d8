//! User account model.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use securecart_core::{Email, Role, UserId};

/// A registered account, customer or staff.
///
/// Staff access is derived from [`Role`]; there is no separately stored
/// staff flag to keep in sync.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: Email,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip)]
    pub password_hash: String,
    pub role: Role,
    pub mfa_enabled: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether this account may use the staff surface.
    #[must_use]
    pub const fn is_staff(&self) -> bool {
        self.role.is_staff()
    }
}

/// Profile fields a user (or staff member) may submit when editing an
/// account. Role changes are sanitized separately; see
/// `AuthService::sanitize_role_change`.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct ProfileUpdate {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Requested role; honored only for superuser actors.
    pub role: Option<Role>,
}
