//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::SecurecartConfig;
use crate::services::mfa::TotpService;
use crate::services::notifications::OrderMailer;
use crate::services::payments::HostedCheckoutClient;
use crate::services::snapshots::CheckoutStore;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`; provides access to the pool,
/// configuration, and the external-collaborator clients.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: SecurecartConfig,
    pool: PgPool,
    payments: HostedCheckoutClient,
    mailer: OrderMailer,
    totp: TotpService,
    snapshots: CheckoutStore,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP relay cannot be configured.
    pub fn new(
        config: SecurecartConfig,
        pool: PgPool,
    ) -> Result<Self, lettre::transport::smtp::Error> {
        let payments = HostedCheckoutClient::new(&config.payment);
        let mailer = OrderMailer::new(&config.email)?;
        let totp = TotpService::new("SecureCart");
        let snapshots = CheckoutStore::default();

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                payments,
                mailer,
                totp,
                snapshots,
            }),
        })
    }

    /// Get a reference to the configuration.
    #[must_use]
    pub fn config(&self) -> &SecurecartConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the payment provider client.
    #[must_use]
    pub fn payments(&self) -> &HostedCheckoutClient {
        &self.inner.payments
    }

    /// Get a reference to the notification mailer.
    #[must_use]
    pub fn mailer(&self) -> &OrderMailer {
        &self.inner.mailer
    }

    /// Get a reference to the TOTP service.
    #[must_use]
    pub fn totp(&self) -> &TotpService {
        &self.inner.totp
    }

    /// Get a reference to the pending-checkout store.
    #[must_use]
    pub fn snapshots(&self) -> &CheckoutStore {
        &self.inner.snapshots
    }
}
