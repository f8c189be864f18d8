//! SecureCart Core - Shared types library.
//!
//! This crate provides the common types used across the SecureCart
//! components:
//! - `server` - The storefront HTTP service (catalog, cart, checkout,
//!   orders, accounts)
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be
//! used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, roles,
//!   and order statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
