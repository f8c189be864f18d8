//! Hosted payment provider client.
//!
//! The provider exposes two calls the storefront consumes: create a
//! hosted checkout session from line items and redirect URLs, and
//! retrieve a session by id to learn its payment status. Only a
//! provider-confirmed `paid` status is ever trusted; client-supplied
//! flags are not.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::PaymentConfig;

/// Errors from the payment provider client.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Transport-level failure reaching the provider.
    #[error("payment provider unreachable: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("payment provider rejected the request ({status}): {message}")]
    Api {
        /// HTTP status code from the provider.
        status: u16,
        /// Provider error body, verbatim.
        message: String,
    },
}

/// One line of a hosted checkout session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionLineItem {
    pub name: String,
    pub quantity: i32,
    /// Unit amount in the currency's minor unit.
    pub unit_amount: i64,
}

/// Request body for creating a hosted checkout session.
#[derive(Debug, Clone, Serialize)]
pub struct CreateSessionRequest {
    pub currency: String,
    pub customer_email: String,
    pub success_url: String,
    pub cancel_url: String,
    pub line_items: Vec<SessionLineItem>,
}

/// A created hosted checkout session.
#[derive(Debug, Clone, Deserialize)]
pub struct HostedSession {
    pub id: String,
    /// Provider-hosted page the customer is redirected to.
    pub url: String,
}

/// Provider-reported payment status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Unpaid,
    NoPaymentRequired,
}

impl PaymentStatus {
    /// Whether this status counts as a successful payment.
    #[must_use]
    pub const fn is_paid(self) -> bool {
        matches!(self, Self::Paid)
    }
}

/// A retrieved session with its payment confirmation.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionStatus {
    pub id: String,
    pub payment_status: PaymentStatus,
    /// Provider-side payment reference, present once a payment exists.
    pub payment_intent: Option<String>,
}

/// Interface the checkout orchestrator talks to.
///
/// Implemented by [`HostedCheckoutClient`] in production and by stubs in
/// tests.
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted checkout session.
    fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> impl Future<Output = Result<HostedSession, PaymentError>> + Send;

    /// Retrieve a session and its payment confirmation by id.
    fn retrieve_session(
        &self,
        session_id: &str,
    ) -> impl Future<Output = Result<SessionStatus, PaymentError>> + Send;
}

// =============================================================================
// HostedCheckoutClient
// =============================================================================

/// HTTP client for the hosted payment API.
#[derive(Clone)]
pub struct HostedCheckoutClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    client: reqwest::Client,
    api_base: String,
    secret_key: SecretString,
}

impl HostedCheckoutClient {
    /// Create a new client from configuration.
    #[must_use]
    pub fn new(config: &PaymentConfig) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                client: reqwest::Client::new(),
                api_base: config.api_base.trim_end_matches('/').to_owned(),
                secret_key: config.secret_key.clone(),
            }),
        }
    }

    /// Decode a provider response, surfacing non-success statuses as
    /// [`PaymentError::Api`] with the raw body for diagnostics.
    async fn decode<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, PaymentError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_else(|_| String::new());
            return Err(PaymentError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json().await?)
    }
}

impl PaymentGateway for HostedCheckoutClient {
    async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<HostedSession, PaymentError> {
        let response = self
            .inner
            .client
            .post(format!("{}/v1/checkout/sessions", self.inner.api_base))
            .bearer_auth(self.inner.secret_key.expose_secret())
            // Retried session creation must not mint a second session.
            .header("Idempotency-Key", Uuid::new_v4().to_string())
            .json(request)
            .send()
            .await?;

        Self::decode(response).await
    }

    async fn retrieve_session(&self, session_id: &str) -> Result<SessionStatus, PaymentError> {
        let response = self
            .inner
            .client
            .get(format!(
                "{}/v1/checkout/sessions/{session_id}",
                self.inner.api_base
            ))
            .bearer_auth(self.inner.secret_key.expose_secret())
            .send()
            .await?;

        Self::decode(response).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_session_status_deserializes() {
        let json = r#"{"id":"cs_123","payment_status":"paid","payment_intent":"pi_456"}"#;
        let status: SessionStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status.id, "cs_123");
        assert!(status.payment_status.is_paid());
        assert_eq!(status.payment_intent.as_deref(), Some("pi_456"));
    }

    #[test]
    fn test_unpaid_status_is_not_trusted() {
        let json = r#"{"id":"cs_123","payment_status":"unpaid","payment_intent":null}"#;
        let status: SessionStatus = serde_json::from_str(json).unwrap();
        assert!(!status.payment_status.is_paid());
        assert!(!PaymentStatus::NoPaymentRequired.is_paid());
    }

    #[test]
    fn test_hosted_session_deserializes() {
        let json = r#"{"id":"cs_123","url":"https://pay.example.com/cs_123"}"#;
        let session: HostedSession = serde_json::from_str(json).unwrap();
        assert_eq!(session.url, "https://pay.example.com/cs_123");
    }
}
