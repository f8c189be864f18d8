//! Customer MFA route handlers.
//!
//! Enrollment creates an unconfirmed device and shows its provisioning
//! secret as a QR code; the device is confirmed only after one valid
//! time-step code, which also flips the account flag. Disabling deletes
//! every device, confirmed or not.

use axum::{Form, Json, extract::State};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use crate::db::mfa::MfaDeviceRepository;
use crate::db::users::UserRepository;
use crate::error::{AppError, Result};
use crate::middleware::RequireUser;
use crate::models::session_keys;
use crate::services::mfa::TotpService;
use crate::state::AppState;

/// Name recorded on customer-enrolled devices.
const CUSTOMER_DEVICE_NAME: &str = "Customer MFA Device";

/// Code submission form.
#[derive(Debug, Deserialize)]
pub struct CodeForm {
    pub code: String,
}

/// Current MFA state for the settings page.
#[derive(Debug, Serialize)]
pub struct MfaSettingsView {
    pub mfa_enabled: bool,
    pub has_confirmed_device: bool,
}

/// Enrollment material presented to the user.
#[derive(Debug, Serialize)]
pub struct EnrollmentView {
    pub otpauth_url: String,
    /// PNG QR code, base64-encoded, scannable by authenticator apps.
    pub qr_png_base64: String,
}

/// MFA settings.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn settings(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<MfaSettingsView>> {
    let confirmed = MfaDeviceRepository::new(state.pool())
        .get_confirmed(user.id)
        .await?;
    Ok(Json(MfaSettingsView {
        mfa_enabled: user.mfa_enabled,
        has_confirmed_device: confirmed.is_some(),
    }))
}

/// Start (or resume) enrollment: get or create the unconfirmed device
/// and return its provisioning secret as URI + QR code.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn enroll(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Result<Json<EnrollmentView>> {
    let repo = MfaDeviceRepository::new(state.pool());
    let device = match repo.get_unconfirmed(user.id).await? {
        Some(device) => device,
        None => {
            repo.create_unconfirmed(user.id, CUSTOMER_DEVICE_NAME, &TotpService::generate_secret())
                .await?
        }
    };

    let account = user.email.as_str();
    Ok(Json(EnrollmentView {
        otpauth_url: state.totp().provisioning_uri(&device.secret, account)?,
        qr_png_base64: state.totp().qr_png_base64(&device.secret, account)?,
    }))
}

/// Confirm the pending device with one valid code, enabling MFA for the
/// account and marking this session verified.
#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn confirm(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    Form(form): Form<CodeForm>,
) -> Result<Json<MfaSettingsView>> {
    let repo = MfaDeviceRepository::new(state.pool());
    let device = repo
        .get_unconfirmed(user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("no enrollment in progress".to_owned()))?;

    if !state
        .totp()
        .verify(&device.secret, user.email.as_str(), &form.code)?
    {
        return Err(AppError::BadRequest("invalid token, please try again".to_owned()));
    }

    repo.confirm(device.id).await?;
    UserRepository::new(state.pool())
        .set_mfa_enabled(user.id, true)
        .await?;
    session
        .insert(session_keys::MFA_VERIFIED, true)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    tracing::info!(user_id = %user.id, "MFA enabled");
    Ok(Json(MfaSettingsView {
        mfa_enabled: true,
        has_confirmed_device: true,
    }))
}

/// Verify a code against the confirmed device, marking this session
/// MFA-verified. The mark does not persist across sessions.
#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn verify(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
    Form(form): Form<CodeForm>,
) -> Result<Json<serde_json::Value>> {
    let device = MfaDeviceRepository::new(state.pool())
        .get_confirmed(user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("no confirmed device".to_owned()))?;

    if !state
        .totp()
        .verify(&device.secret, user.email.as_str(), &form.code)?
    {
        return Err(AppError::BadRequest("invalid token, please try again".to_owned()));
    }

    session
        .insert(session_keys::MFA_VERIFIED, true)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(Json(serde_json::json!({ "verified": true })))
}

/// Disable MFA: clears the account flag and deletes every device,
/// confirmed or not. Destructive and irreversible.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn disable(
    State(state): State<AppState>,
    session: Session,
    RequireUser(user): RequireUser,
) -> Result<Json<MfaSettingsView>> {
    UserRepository::new(state.pool())
        .set_mfa_enabled(user.id, false)
        .await?;
    let deleted = MfaDeviceRepository::new(state.pool())
        .delete_all_for_user(user.id)
        .await?;
    session
        .remove::<bool>(session_keys::MFA_VERIFIED)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    tracing::info!(user_id = %user.id, deleted, "MFA disabled");
    Ok(Json(MfaSettingsView {
        mfa_enabled: false,
        has_confirmed_device: false,
    }))
}
