//! SecureCart server - storefront service.
//!
//! # Architecture
//!
//! - Axum handlers speaking JSON and redirects (template rendering is an
//!   external concern)
//! - `PostgreSQL` via sqlx for catalog, carts, orders, accounts, audit
//! - tower-sessions (Postgres store) for login state and the MFA
//!   verification marks
//! - Hosted payment API for checkout; SMTP for order notifications
//!
//! The order flow is the only multi-table state transition here and runs
//! inside a single transaction; see `db::orders`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Router, routing::get};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod db;
mod error;
mod middleware;
mod models;
mod routes;
mod services;
mod state;

use config::SecurecartConfig;
use state::AppState;

#[tokio::main]
async fn main() {
    // Load configuration from environment
    let config = SecurecartConfig::from_env().expect("Failed to load configuration");

    // Initialize tracing with EnvFilter
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "securecart_server=info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Initialize database connection pool and apply migrations
    let pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");
    db::MIGRATOR
        .run(&pool)
        .await
        .expect("Failed to run migrations");
    tracing::info!("Database ready");

    // Build application state
    let state = AppState::new(config.clone(), pool).expect("Failed to initialize state");

    // Session layer (creates its table on first run) and MFA gate
    let session_store = tower_sessions_sqlx_store::PostgresStore::new(state.pool().clone());
    session_store
        .migrate()
        .await
        .expect("Failed to migrate session store");
    let session_layer = middleware::create_session_layer(state.pool(), state.config());
    let mfa_layer =
        axum::middleware::from_fn_with_state(state.clone(), middleware::require_mfa_verification);

    // Build router. Layer order: trace wraps sessions wraps the MFA gate.
    let app = Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes::routes())
        .nest_service("/static", ServeDir::new("crates/server/static"))
        .layer(mfa_layer)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr = config.socket_addr();
    tracing::info!("securecart listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Verifies database connectivity before returning OK.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
