//! Business services for the storefront.
//!
//! Services own the orchestration between repositories and external
//! collaborators (payment provider, SMTP, TOTP). Route handlers stay
//! thin and translate service errors into responses.

pub mod auth;
pub mod authz;
pub mod checkout;
pub mod mfa;
pub mod notifications;
pub mod orders;
pub mod payments;
pub mod snapshots;
