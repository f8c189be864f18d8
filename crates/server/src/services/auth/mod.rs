//! Authentication service.
//!
//! Registration, login for both surfaces, profile edits with the
//! role-escalation guard, and the explicit audit-log write on every
//! attempt (there is no event-hook indirection; the entry points call
//! the audit writer directly).

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;

use securecart_core::{Email, Role, UserId};

use crate::db::RepositoryError;
use crate::db::audit::LoginAttemptRepository;
use crate::db::users::UserRepository;
use crate::models::user::{ProfileUpdate, User};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Which login page an attempt came through. Customer accounts cannot
/// log in through the staff surface and vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginSurface {
    Customer,
    Staff,
}

impl LoginSurface {
    const fn is_staff(self) -> bool {
        matches!(self, Self::Staff)
    }

    /// Whether an account with `role` belongs on this surface.
    const fn admits(self, role: Role) -> bool {
        match self {
            Self::Customer => matches!(role, Role::Customer),
            Self::Staff => role.is_staff(),
        }
    }
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    audit: LoginAttemptRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
            audit: LoginAttemptRepository::new(pool),
        }
    }

    /// Register a new customer account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email is malformed,
    /// `AuthError::WeakPassword` if the password fails validation, and
    /// `AuthError::UserAlreadyExists` if the username is taken.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        first_name: &str,
        last_name: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let user = self
            .users
            .create(
                username,
                &email,
                first_name,
                last_name,
                &password_hash,
                Role::Customer,
            )
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        Ok(user)
    }

    /// Authenticate a username/password pair against one login surface,
    /// recording the attempt in the audit log either way.
    ///
    /// The stored username is the submitted one, even when it matches no
    /// account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for a wrong password,
    /// unknown username, or an account that doesn't belong on this
    /// surface, and `AuthError::AccountDisabled` for deactivated
    /// accounts.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        surface: LoginSurface,
        ip_address: &str,
    ) -> Result<User, AuthError> {
        let result = self.authenticate(username, password, surface).await;

        let user_id = result.as_ref().ok().map(|user| user.id);
        self.audit
            .record(
                user_id,
                username,
                ip_address,
                result.is_ok(),
                surface.is_staff(),
            )
            .await?;

        result
    }

    async fn authenticate(
        &self,
        username: &str,
        password: &str,
        surface: LoginSurface,
    ) -> Result<User, AuthError> {
        let user = self
            .users
            .get_by_username(username)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &user.password_hash)?;

        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }
        if !surface.admits(user.role) {
            // Wrong surface reads the same as wrong credentials.
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Apply a profile edit. The role actually written is the result of
    /// [`sanitize_role_change`], so a non-superuser actor can never
    /// escalate or de-escalate anyone, including themselves, regardless
    /// of what the form submitted.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the new email is malformed.
    pub async fn update_profile(
        &self,
        actor: &User,
        target: &User,
        update: &ProfileUpdate,
    ) -> Result<User, AuthError> {
        let email = Email::parse(&update.email)?;
        let role = sanitize_role_change(actor.role, target.role, update.role);

        let user = self
            .users
            .update_profile(
                target.id,
                &email,
                &update.first_name,
                &update.last_name,
                role,
            )
            .await?;
        Ok(user)
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the user doesn't exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidCredentials)
    }
}

/// The role to persist when `actor` edits an account currently holding
/// `target` and the form requested `requested`. Only superusers change
/// roles; everyone else gets the current role echoed back.
#[must_use]
pub const fn sanitize_role_change(actor: Role, target: Role, requested: Option<Role>) -> Role {
    match requested {
        Some(next) if actor.is_superuser() => next,
        _ => target,
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a stored hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(verify_password("correct horse battery", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_short_password_rejected() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("long enough").is_ok());
    }

    #[test]
    fn test_surface_admission() {
        assert!(LoginSurface::Customer.admits(Role::Customer));
        assert!(!LoginSurface::Customer.admits(Role::Admin));
        assert!(!LoginSurface::Customer.admits(Role::Superuser));
        assert!(LoginSurface::Staff.admits(Role::Admin));
        assert!(LoginSurface::Staff.admits(Role::Superuser));
        assert!(!LoginSurface::Staff.admits(Role::Customer));
    }

    #[test]
    fn test_role_change_requires_superuser() {
        // Admin editing a customer cannot change the role, even when the
        // form asks for it.
        assert_eq!(
            sanitize_role_change(Role::Admin, Role::Customer, Some(Role::Admin)),
            Role::Customer
        );
        // Nor can a customer self-escalate.
        assert_eq!(
            sanitize_role_change(Role::Customer, Role::Customer, Some(Role::Superuser)),
            Role::Customer
        );
        // A superuser can.
        assert_eq!(
            sanitize_role_change(Role::Superuser, Role::Customer, Some(Role::Admin)),
            Role::Admin
        );
        // Absent request preserves the current role.
        assert_eq!(
            sanitize_role_change(Role::Superuser, Role::Admin, None),
            Role::Admin
        );
    }
}
