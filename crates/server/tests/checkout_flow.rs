//! Integration tests for the checkout/order consistency flow.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//! - The server running (`cargo run -p securecart-server`)
//! - A stub payment provider at `PAYMENT_API_BASE` that confirms every
//!   session as `paid`
//!
//! Run with: `cargo test -p securecart-server -- --ignored`

use reqwest::{Client, StatusCode, redirect};
use serde_json::Value;

/// Base URL for the server (configurable via environment).
fn base_url() -> String {
    std::env::var("SECURECART_BASE_URL").unwrap_or_else(|_| "http://localhost:8000".to_string())
}

/// A client with its own cookie jar and redirects disabled, so the
/// checkout redirects can be asserted on.
fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(redirect::Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// Test helper: register and log in a fresh customer, returning the
/// client holding its session.
async fn register_customer(suffix: &str) -> Client {
    let client = client();
    let base = base_url();
    let username = format!("shopper-{suffix}");

    let resp = client
        .post(format!("{base}/auth/register"))
        .form(&[
            ("username", username.as_str()),
            ("email", &format!("{username}@example.com")),
            ("first_name", "Test"),
            ("last_name", "Shopper"),
            ("password", "a long enough password"),
        ])
        .send()
        .await
        .expect("Failed to register");
    assert!(resp.status().is_success());
    client
}

/// Test helper: save an address so checkout can start.
async fn add_address(client: &Client) {
    let resp = client
        .post(format!("{}/account/addresses", base_url()))
        .form(&[
            ("full_name", "Test Shopper"),
            ("street_address1", "1 High Street"),
            ("city", "Leeds"),
            ("postal_code", "LS1 1AA"),
            ("country", "United Kingdom"),
        ])
        .send()
        .await
        .expect("Failed to add address");
    assert!(resp.status().is_success());
}

/// Test helper: first address id for the session's user.
async fn first_address_id(client: &Client) -> i64 {
    let addresses: Value = client
        .get(format!("{}/account/addresses", base_url()))
        .send()
        .await
        .expect("Failed to list addresses")
        .json()
        .await
        .expect("Failed to parse addresses");
    addresses[0]["id"].as_i64().expect("address id")
}

// ============================================================================
// End-to-end materialization
// ============================================================================

#[tokio::test]
#[ignore = "Requires running server, Postgres, and stub payment provider"]
async fn test_checkout_materializes_order_and_decrements_stock() {
    let base = base_url();
    let client = register_customer("e2e").await;
    add_address(&client).await;
    let address_id = first_address_id(&client).await;

    // Seed assumption: product 1 exists with price 10.00 and stock 5.
    let product: Value = client
        .get(format!("{base}/products/oak-desk"))
        .send()
        .await
        .expect("product")
        .json()
        .await
        .expect("product json");
    let product_id = product["id"].as_i64().expect("product id");
    let stock_before = product["stock"].as_i64().expect("stock");

    let resp = client
        .post(format!("{base}/cart/add"))
        .form(&[("product_id", product_id.to_string()), ("quantity", "2".into())])
        .send()
        .await
        .expect("add to cart");
    assert!(resp.status().is_success());

    // Begin checkout: redirect to the provider's hosted page.
    let resp = client
        .post(format!("{base}/checkout"))
        .form(&[("address_id", address_id.to_string())])
        .send()
        .await
        .expect("begin checkout");
    assert!(resp.status().is_redirection());

    // Stub provider confirms payment; hit the success callback.
    let resp = client
        .get(format!("{base}/checkout/complete"))
        .send()
        .await
        .expect("complete checkout");
    assert!(resp.status().is_redirection());
    let location = resp
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("redirect location")
        .to_owned();
    assert!(location.contains("/confirmation"), "got {location}");

    // Order is pending with the snapshot total; stock went down; cart is empty.
    let orders: Value = client
        .get(format!("{base}/orders"))
        .send()
        .await
        .expect("orders")
        .json()
        .await
        .expect("orders json");
    assert_eq!(orders[0]["status"], "pending");
    assert_eq!(orders[0]["total_amount"], "20.00");

    let product: Value = client
        .get(format!("{base}/products/oak-desk"))
        .send()
        .await
        .expect("product")
        .json()
        .await
        .expect("product json");
    assert_eq!(product["stock"].as_i64().expect("stock"), stock_before - 2);

    let cart: Value = client
        .get(format!("{base}/cart"))
        .send()
        .await
        .expect("cart")
        .json()
        .await
        .expect("cart json");
    assert_eq!(cart["item_count"].as_i64().expect("count"), 0);
}

#[tokio::test]
#[ignore = "Requires running server, Postgres, and stub payment provider"]
async fn test_replayed_success_callback_is_a_noop() {
    let base = base_url();
    let client = register_customer("replay").await;
    add_address(&client).await;
    let address_id = first_address_id(&client).await;

    let resp = client
        .post(format!("{base}/cart/add"))
        .form(&[("product_id", "1"), ("quantity", "1")])
        .send()
        .await
        .expect("add to cart");
    assert!(resp.status().is_success());

    let resp = client
        .post(format!("{base}/checkout"))
        .form(&[("address_id", address_id.to_string())])
        .send()
        .await
        .expect("begin checkout");
    assert!(resp.status().is_redirection());

    let first = client
        .get(format!("{base}/checkout/complete"))
        .send()
        .await
        .expect("first callback");
    assert!(first.status().is_redirection());

    // Replay: snapshot already consumed, no second order.
    let second = client
        .get(format!("{base}/checkout/complete"))
        .send()
        .await
        .expect("second callback");
    let location = second
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("location");
    assert!(location.starts_with("/cart"), "got {location}");

    let orders: Value = client
        .get(format!("{base}/orders"))
        .send()
        .await
        .expect("orders")
        .json()
        .await
        .expect("orders json");
    assert_eq!(orders.as_array().expect("array").len(), 1);
}

#[tokio::test]
#[ignore = "Requires running server, Postgres, and stub payment provider"]
async fn test_concurrent_checkout_of_last_unit() {
    // Two carts both holding the last unit of a product: exactly one
    // order materializes, the other checkout fails at final commit.
    let base = base_url();
    let first = register_customer("race-a").await;
    let second = register_customer("race-b").await;
    add_address(&first).await;
    add_address(&second).await;

    // Seed assumption: product "last-unit" has stock 1.
    for client in [&first, &second] {
        let resp = client
            .post(format!("{base}/cart/add"))
            .form(&[("product_id", "2"), ("quantity", "1")])
            .send()
            .await
            .expect("add to cart");
        assert!(resp.status().is_success());
        let address_id = first_address_id(client).await;
        let resp = client
            .post(format!("{base}/checkout"))
            .form(&[("address_id", address_id.to_string())])
            .send()
            .await
            .expect("begin checkout");
        assert!(resp.status().is_redirection());
    }

    let (a, b) = tokio::join!(
        first.get(format!("{base}/checkout/complete")).send(),
        second.get(format!("{base}/checkout/complete")).send(),
    );
    let locations: Vec<String> = [a.expect("a"), b.expect("b")]
        .iter()
        .map(|resp| {
            resp.headers()
                .get("location")
                .and_then(|v| v.to_str().ok())
                .expect("location")
                .to_owned()
        })
        .collect();

    let wins = locations
        .iter()
        .filter(|l| l.contains("/confirmation"))
        .count();
    let losses = locations
        .iter()
        .filter(|l| l.contains("insufficient_stock"))
        .count();
    assert_eq!(wins, 1, "exactly one checkout wins: {locations:?}");
    assert_eq!(losses, 1, "the other hits the stock re-check: {locations:?}");
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
#[ignore = "Requires running server, Postgres, and stub payment provider"]
async fn test_cancel_restores_stock_and_blocks_double_cancel() {
    let base = base_url();
    let client = register_customer("cancel").await;
    add_address(&client).await;
    let address_id = first_address_id(&client).await;

    let stock_before = client
        .get(format!("{base}/products/oak-desk"))
        .send()
        .await
        .expect("product")
        .json::<Value>()
        .await
        .expect("json")["stock"]
        .as_i64()
        .expect("stock");

    let resp = client
        .post(format!("{base}/cart/add"))
        .form(&[("product_id", "1"), ("quantity", "2")])
        .send()
        .await
        .expect("add");
    assert!(resp.status().is_success());
    let resp = client
        .post(format!("{base}/checkout"))
        .form(&[("address_id", address_id.to_string())])
        .send()
        .await
        .expect("begin");
    assert!(resp.status().is_redirection());
    let resp = client
        .get(format!("{base}/checkout/complete"))
        .send()
        .await
        .expect("complete");
    assert!(resp.status().is_redirection());

    let orders: Value = client
        .get(format!("{base}/orders"))
        .send()
        .await
        .expect("orders")
        .json()
        .await
        .expect("json");
    let order_id = orders[0]["id"].as_i64().expect("order id");

    // Cancel: status flips, stock comes back.
    let resp = client
        .post(format!("{base}/orders/{order_id}/cancel"))
        .send()
        .await
        .expect("cancel");
    assert_eq!(resp.status(), StatusCode::OK);
    let order: Value = resp.json().await.expect("json");
    assert_eq!(order["status"], "canceled");

    let stock_after = client
        .get(format!("{base}/products/oak-desk"))
        .send()
        .await
        .expect("product")
        .json::<Value>()
        .await
        .expect("json")["stock"]
        .as_i64()
        .expect("stock");
    assert_eq!(stock_after, stock_before);

    // Canceling again is an invalid transition, rejected with no change.
    let resp = client
        .post(format!("{base}/orders/{order_id}/cancel"))
        .send()
        .await
        .expect("double cancel");
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

// ============================================================================
// Ownership scoping
// ============================================================================

#[tokio::test]
#[ignore = "Requires running server and Postgres"]
async fn test_foreign_order_reads_as_missing() {
    let base = base_url();
    let owner = register_customer("owner").await;
    let stranger = register_customer("stranger").await;
    add_address(&owner).await;

    // Any order id belonging to `owner` must 404 for `stranger`; probe a
    // low id that exists for someone.
    let resp = stranger
        .get(format!("{base}/orders/1"))
        .send()
        .await
        .expect("foreign order");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
