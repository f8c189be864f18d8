//! MFA device model.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use securecart_core::{MfaDeviceId, UserId};

/// A time-based one-time-password device.
///
/// At most one confirmed device and one in-flight enrollment exist per
/// user (enforced by partial unique indexes). The secret is the base32
/// provisioning secret; codes are verified against it by the TOTP
/// collaborator.
#[derive(Debug, Clone, FromRow)]
pub struct MfaDevice {
    pub id: MfaDeviceId,
    pub user_id: UserId,
    pub name: String,
    pub secret: String,
    pub confirmed: bool,
    pub created_at: DateTime<Utc>,
}
