//! HTTP middleware stack.
//!
//! # Middleware Order (outermost first)
//!
//! 1. `TraceLayer` (request tracing)
//! 2. Session layer (tower-sessions with `PostgreSQL` store)
//! 3. MFA gate (session verification mark + allow-list)

pub mod auth;
pub mod mfa;
pub mod session;

pub use auth::{OptionalUser, RequireStaff, RequireUser, clear_current_user, set_current_user};
pub use mfa::require_mfa_verification;
pub use session::create_session_layer;
