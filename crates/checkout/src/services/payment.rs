//! Payment gateway trait, in-memory gateway and HTTP gateway client.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result of a successful capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentCapture {
    /// Reference assigned by the gateway.
    pub reference_id: String,
}

/// Errors returned by a payment gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The gateway refused the payment.
    #[error("payment declined: {0}")]
    Declined(String),

    /// The gateway could not be reached or failed internally.
    #[error("gateway unavailable: {0}")]
    Unavailable(String),

    /// The gateway answered with something unexpected.
    #[error("unexpected gateway response: {0}")]
    InvalidResponse(String),
}

/// Trait for capturing payments.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Authorizes and immediately captures `amount_minor` (in minor units).
    async fn authorize_and_capture(
        &self,
        amount_minor: i64,
        currency: &str,
        payment_method_token: &str,
    ) -> Result<PaymentCapture, GatewayError>;
}

#[async_trait]
impl<T: PaymentGateway + ?Sized> PaymentGateway for Arc<T> {
    async fn authorize_and_capture(
        &self,
        amount_minor: i64,
        currency: &str,
        payment_method_token: &str,
    ) -> Result<PaymentCapture, GatewayError> {
        (**self)
            .authorize_and_capture(amount_minor, currency, payment_method_token)
            .await
    }
}

/// A payment captured by the in-memory gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedPayment {
    pub reference_id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub payment_method_token: String,
}

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    captures: Vec<CapturedPayment>,
    next_id: u32,
    fail_on_charge: bool,
    delay: Option<Duration>,
}

/// In-memory payment gateway for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentGateway {
    state: Arc<RwLock<InMemoryGatewayState>>,
}

impl InMemoryPaymentGateway {
    /// Creates a new in-memory gateway that accepts every payment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the gateway to decline every charge.
    pub fn set_fail_on_charge(&self, fail: bool) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .fail_on_charge = fail;
    }

    /// Makes every charge wait before answering.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .delay = delay;
    }

    /// Returns every captured payment in capture order.
    pub fn captures(&self) -> Vec<CapturedPayment> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .captures
            .clone()
    }

    /// Returns the number of captured payments.
    pub fn capture_count(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .captures
            .len()
    }
}

#[async_trait]
impl PaymentGateway for InMemoryPaymentGateway {
    async fn authorize_and_capture(
        &self,
        amount_minor: i64,
        currency: &str,
        payment_method_token: &str,
    ) -> Result<PaymentCapture, GatewayError> {
        let delay = self
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        if state.fail_on_charge {
            return Err(GatewayError::Declined("card declined".to_string()));
        }
        if amount_minor <= 0 {
            return Err(GatewayError::Declined(
                "amount must be positive".to_string(),
            ));
        }

        state.next_id += 1;
        let reference_id = format!("PAY-{:04}", state.next_id);
        state.captures.push(CapturedPayment {
            reference_id: reference_id.clone(),
            amount_minor,
            currency: currency.to_string(),
            payment_method_token: payment_method_token.to_string(),
        });

        Ok(PaymentCapture { reference_id })
    }
}

/// Request sent to the gateway's payment intent endpoint.
#[derive(Debug, Serialize)]
struct PaymentIntentRequest<'a> {
    amount: i64,
    currency: &'a str,
    payment_method: &'a str,
    confirm: bool,
}

#[derive(Debug, Deserialize)]
struct PaymentIntentResponse {
    id: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// HTTP client for a payment-intent style gateway.
///
/// Creates a confirmed payment intent with `POST {base_url}/v1/payment_intents`
/// authenticated by a bearer secret. The intent must come back `succeeded`.
#[derive(Debug, Clone)]
pub struct HttpPaymentGateway {
    http: Client,
    base_url: String,
    secret_key: String,
}

impl HttpPaymentGateway {
    /// Creates a new gateway client.
    pub fn new(base_url: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        }
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    #[tracing::instrument(skip(self, payment_method_token))]
    async fn authorize_and_capture(
        &self,
        amount_minor: i64,
        currency: &str,
        payment_method_token: &str,
    ) -> Result<PaymentCapture, GatewayError> {
        let url = format!("{}/v1/payment_intents", self.base_url);
        let request = PaymentIntentRequest {
            amount: amount_minor,
            currency,
            payment_method: payment_method_token,
            confirm: true,
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.secret_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&text)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("HTTP {status}"));
            return Err(if status.is_server_error() {
                GatewayError::Unavailable(message)
            } else {
                GatewayError::Declined(message)
            });
        }

        let intent: PaymentIntentResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        if intent.status != "succeeded" {
            return Err(GatewayError::Declined(format!(
                "payment intent {} ended in status {}",
                intent.id, intent.status
            )));
        }

        Ok(PaymentCapture {
            reference_id: intent.id,
        })
    }
}
