//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                    - Liveness check
//! GET  /health/ready              - Readiness check (DB ping)
//!
//! # Catalog
//! GET  /categories                - Categories with subcategories
//! GET  /products                  - Product listing (filters, search, sort)
//! GET  /products/{slug}           - Product detail
//!
//! # Cart (requires auth)
//! GET  /cart                      - Cart contents with live totals
//! POST /cart/add                  - Add product (atomic upsert)
//! POST /cart/update               - Set line quantity (0 deletes)
//! POST /cart/remove               - Remove line
//! POST /cart/clear                - Clear cart (idempotent)
//!
//! # Checkout (requires auth)
//! POST /checkout                  - Begin: snapshot + hosted payment session
//! GET  /checkout/complete         - Provider success callback: verify + materialize
//!
//! # Orders (requires auth)
//! GET  /orders                    - Order history
//! GET  /orders/{id}               - Order detail (ownership-scoped)
//! GET  /orders/{id}/confirmation  - Confirmation step (notifies at most once)
//! POST /orders/{id}/cancel        - Cancel a pending order (restocks)
//!
//! # Auth
//! POST /auth/register             - Customer registration
//! POST /auth/login                - Customer login (audited)
//! POST /auth/logout               - Logout
//! GET  /auth/mfa                  - MFA settings
//! POST /auth/mfa/enroll           - Start enrollment (QR + otpauth URI)
//! POST /auth/mfa/confirm          - Confirm device with one valid code
//! POST /auth/mfa/verify           - Mark this session MFA-verified
//! POST /auth/mfa/disable          - Disable MFA (deletes all devices)
//!
//! # Account (requires auth)
//! GET  /account                   - Dashboard (recent orders, addresses)
//! POST /account/profile           - Profile edit (role-escalation guarded)
//! GET  /account/addresses         - Address book
//! POST /account/addresses         - Add address
//! POST /account/addresses/{id}    - Update address
//! DELETE /account/addresses/{id}  - Delete address
//!
//! # Staff surface
//! POST /staff/login               - Staff login (audited separately)
//! POST /staff/logout              - Logout
//! GET  /staff/orders              - All orders
//! POST /staff/orders/{id}/status  - Advance order status
//! GET  /staff/products/low-stock  - Products at/below threshold
//! POST /staff/products            - Create product
//! POST /staff/products/{id}       - Update product
//! GET  /staff/users               - Account listing
//! POST /staff/users/{id}          - Account edit (role guard)
//! GET  /staff/login-attempts      - Audit log (superuser)
//! POST /staff/login-attempts/purge - Bulk purge (superuser)
//! GET  /staff/mfa/setup           - Staff device enrollment
//! POST /staff/mfa/setup           - Confirm staff device
//! POST /staff/mfa/verify          - Mark staff session MFA-verified
//! ```

pub mod account;
pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod mfa;
pub mod orders;

use axum::http::HeaderMap;
use axum::{
    Router,
    routing::{get, post},
};
use std::net::SocketAddr;

use crate::state::AppState;

/// Resolve the client IP: first hop of `X-Forwarded-For` when present,
/// otherwise the peer address.
pub(crate) fn client_ip(headers: &HeaderMap, peer: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|ip| ip.trim().to_owned())
        .filter(|ip| !ip.is_empty())
        .unwrap_or_else(|| peer.ip().to_string())
}

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(catalog::categories))
        .route("/products", get(catalog::index))
        .route("/products/{slug}", get(catalog::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(checkout::begin))
        .route("/complete", get(checkout::complete))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::list))
        .route("/{id}", get(orders::detail))
        .route("/{id}/confirmation", get(orders::confirmation))
        .route("/{id}/cancel", post(orders::cancel))
}

/// Create the auth routes router (including customer MFA).
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/mfa", get(mfa::settings))
        .route("/mfa/enroll", post(mfa::enroll))
        .route("/mfa/confirm", post(mfa::confirm))
        .route("/mfa/verify", post(mfa::verify))
        .route("/mfa/disable", post(mfa::disable))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    use axum::routing::delete;

    Router::new()
        .route("/", get(account::dashboard))
        .route("/profile", post(account::update_profile))
        .route(
            "/addresses",
            get(account::addresses).post(account::create_address),
        )
        .route(
            "/addresses/{id}",
            post(account::update_address).delete(account::delete_address),
        )
}

/// Create the staff surface router.
pub fn staff_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(admin::login))
        .route("/logout", post(admin::logout))
        .route("/orders", get(admin::orders))
        .route("/orders/{id}/status", post(admin::order_status))
        .route("/products/low-stock", get(admin::low_stock))
        .route("/products", post(admin::create_product))
        .route("/products/{id}", post(admin::update_product))
        .route("/users", get(admin::users))
        .route("/users/{id}", post(admin::edit_user))
        .route("/login-attempts", get(admin::login_attempts))
        .route("/login-attempts/purge", post(admin::purge_login_attempts))
        .route("/mfa/setup", get(admin::mfa_setup).post(admin::mfa_confirm))
        .route("/mfa/verify", post(admin::mfa_verify))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(catalog_routes())
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .nest("/orders", order_routes())
        .nest("/auth", auth_routes())
        .nest("/account", account_routes())
        .nest("/staff", staff_routes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_ip_prefers_forwarded_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());
        let peer: SocketAddr = "127.0.0.1:9999".parse().unwrap();
        assert_eq!(client_ip(&headers, peer), "203.0.113.9");
    }

    #[test]
    fn test_client_ip_falls_back_to_peer() {
        let peer: SocketAddr = "192.0.2.7:1234".parse().unwrap();
        assert_eq!(client_ip(&HeaderMap::new(), peer), "192.0.2.7");
    }
}
