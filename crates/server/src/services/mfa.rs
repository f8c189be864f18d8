//! TOTP enrollment and verification.
//!
//! Wraps the time-based one-time-password collaborator: secrets are
//! generated here, presented to the user as an otpauth URI plus a
//! scannable QR code, and submitted codes are checked against the
//! current time step.

use thiserror::Error;
use totp_rs::{Algorithm, Secret, TOTP};

/// Errors from TOTP operations.
#[derive(Debug, Error)]
pub enum MfaError {
    /// The stored secret could not be decoded.
    #[error("invalid device secret")]
    InvalidSecret,

    /// QR code rendering failed.
    #[error("QR code generation failed: {0}")]
    Qr(String),

    /// The system clock was unusable for time-step computation.
    #[error("system clock error")]
    Clock,
}

/// TOTP code generator/verifier.
#[derive(Debug, Clone)]
pub struct TotpService {
    issuer: String,
}

impl TotpService {
    /// Create a service labelling provisioned devices with `issuer`.
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            issuer: issuer.into(),
        }
    }

    /// Generate a fresh base32 provisioning secret for a new device.
    #[must_use]
    pub fn generate_secret() -> String {
        match Secret::generate_secret().to_encoded() {
            Secret::Encoded(encoded) => encoded,
            // to_encoded never yields Raw
            Secret::Raw(_) => String::new(),
        }
    }

    /// The otpauth:// provisioning URI for a device secret.
    ///
    /// # Errors
    ///
    /// Returns `MfaError::InvalidSecret` if the stored secret is corrupt.
    pub fn provisioning_uri(&self, secret: &str, account: &str) -> Result<String, MfaError> {
        Ok(self.totp_for(secret, account)?.get_url())
    }

    /// The provisioning URI rendered as a base64-encoded PNG QR code.
    ///
    /// # Errors
    ///
    /// Returns `MfaError::InvalidSecret` for a corrupt secret or
    /// `MfaError::Qr` if rendering fails.
    pub fn qr_png_base64(&self, secret: &str, account: &str) -> Result<String, MfaError> {
        self.totp_for(secret, account)?
            .get_qr_base64()
            .map_err(MfaError::Qr)
    }

    /// Check a submitted code against the current time step.
    ///
    /// # Errors
    ///
    /// Returns `MfaError::InvalidSecret` for a corrupt secret or
    /// `MfaError::Clock` if the system time is unusable.
    pub fn verify(&self, secret: &str, account: &str, code: &str) -> Result<bool, MfaError> {
        self.totp_for(secret, account)?
            .check_current(code)
            .map_err(|_| MfaError::Clock)
    }

    /// Build the TOTP instance for a stored secret. 6 digits, 30-second
    /// step, one step of clock skew either way.
    fn totp_for(&self, secret: &str, account: &str) -> Result<TOTP, MfaError> {
        let bytes = Secret::Encoded(secret.to_owned())
            .to_bytes()
            .map_err(|_| MfaError::InvalidSecret)?;
        TOTP::new(
            Algorithm::SHA1,
            6,
            1,
            30,
            bytes,
            Some(self.issuer.clone()),
            account.to_owned(),
        )
        .map_err(|_| MfaError::InvalidSecret)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_secret_round_trips() {
        let service = TotpService::new("SecureCart");
        let secret = TotpService::generate_secret();

        let totp = service.totp_for(&secret, "shopper@example.com").unwrap();
        let code = totp.generate_current().unwrap();
        assert!(service.verify(&secret, "shopper@example.com", &code).unwrap());
    }

    #[test]
    fn test_wrong_code_rejected() {
        let service = TotpService::new("SecureCart");
        let secret = TotpService::generate_secret();

        // A 7-digit token can never match a 6-digit code.
        assert!(!service.verify(&secret, "shopper@example.com", "0000000").unwrap());
    }

    #[test]
    fn test_provisioning_uri_names_issuer_and_account() {
        let service = TotpService::new("SecureCart");
        let secret = TotpService::generate_secret();

        let uri = service.provisioning_uri(&secret, "shopper@example.com").unwrap();
        assert!(uri.starts_with("otpauth://totp/"));
        assert!(uri.contains("SecureCart"));
        assert!(uri.contains("shopper"));
    }

    #[test]
    fn test_corrupt_secret_rejected() {
        let service = TotpService::new("SecureCart");
        assert!(matches!(
            service.verify("not base32!!", "a@b", "123456"),
            Err(MfaError::InvalidSecret)
        ));
    }
}
