//! Domain models for the storefront.
//!
//! Row-shaped types decoded straight from Postgres via `sqlx::FromRow`,
//! plus the transient checkout snapshot. Validation lives in the core
//! newtypes (`Price`, `Email`, `Role`, `OrderStatus`).

pub mod address;
pub mod audit;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod mfa;
pub mod order;
pub mod user;

/// Session keys used by the storefront.
///
/// Keys are namespaced as constants so handlers and middleware cannot
/// drift apart on spelling.
pub mod session_keys {
    /// The authenticated user's ID (`UserId`).
    pub const USER_ID: &str = "securecart.user_id";
    /// Whether this session has passed MFA verification (customer surface).
    pub const MFA_VERIFIED: &str = "securecart.mfa_verified";
    /// Whether this session has passed MFA verification (staff surface).
    pub const STAFF_MFA_VERIFIED: &str = "securecart.staff_mfa_verified";
}
