//! Checkout request payload.

use serde::{Deserialize, Serialize};

use crate::error::{CheckoutError, Result};

/// Input to a checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    /// Opaque payment-method token forwarded to the gateway.
    pub payment_method_token: String,
    /// ISO 4217 currency code.
    pub currency: String,
    #[serde(default)]
    pub coupon_code: Option<String>,
}

impl CheckoutRequest {
    /// Creates a request without a coupon.
    pub fn new(payment_method_token: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            payment_method_token: payment_method_token.into(),
            currency: currency.into(),
            coupon_code: None,
        }
    }

    /// Adds a coupon code to the request.
    pub fn with_coupon(mut self, code: impl Into<String>) -> Self {
        self.coupon_code = Some(code.into());
        self
    }

    /// Checks the fields and normalizes them.
    ///
    /// The currency is lowercased and a blank coupon code is dropped.
    pub fn validate(mut self) -> Result<Self> {
        self.payment_method_token = self.payment_method_token.trim().to_string();
        if self.payment_method_token.is_empty() {
            return Err(CheckoutError::InvalidRequest(
                "payment_method_token is required".to_string(),
            ));
        }

        let currency = self.currency.trim();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CheckoutError::InvalidRequest(format!(
                "currency must be a three-letter code, got {:?}",
                self.currency
            )));
        }
        self.currency = currency.to_ascii_lowercase();

        self.coupon_code = self
            .coupon_code
            .map(|code| code.trim().to_string())
            .filter(|code| !code.is_empty());

        Ok(self)
    }
}
