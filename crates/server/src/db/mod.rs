//! Database operations for the SecureCart `PostgreSQL` store.
//!
//! # Tables
//!
//! - `users`, `addresses` - accounts and address books
//! - `categories`, `subcategories`, `products` - catalog with stock counters
//! - `carts`, `cart_items` - one mutable cart per user
//! - `orders`, `order_items` - immutable purchase records
//! - `login_attempts` - append-only authentication audit
//! - `mfa_devices` - TOTP enrollment state
//! - `sessions` - created by the tower-sessions store
//!
//! # Migrations
//!
//! Migrations live in `crates/server/migrations/` and are applied at
//! startup via [`MIGRATOR`].

pub mod addresses;
pub mod audit;
pub mod carts;
pub mod catalog;
pub mod mfa;
pub mod orders;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use securecart_core::OrderStatus;

/// Embedded migrations for the server schema.
pub static MIGRATOR: Migrator = sqlx::migrate!();

/// Errors surfaced by the repository layer.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The requested row does not exist (or is not visible to the acting
    /// user; foreign rows are indistinguishable from missing ones).
    #[error("not found")]
    NotFound,

    /// A uniqueness constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A stock-guarded write could not proceed. The whole enclosing
    /// transaction is rolled back when this is returned.
    #[error("insufficient stock for {product}: {available} available")]
    InsufficientStock {
        /// Product name, for the user-facing message.
        product: String,
        /// Units currently available.
        available: i32,
    },

    /// An order status change that the state machine forbids.
    #[error("invalid order status transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// A stored value failed domain validation on the way out.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

impl RepositoryError {
    /// Map a sqlx error, translating unique violations into `Conflict`.
    pub(crate) fn from_unique(e: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e
            && db_err.is_unique_violation()
        {
            return Self::Conflict(format!("{what} already exists"));
        }
        Self::Database(e)
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
