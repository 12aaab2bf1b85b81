//! Checkout error types.

use common::{OrderId, ProductId, ReconciliationId, UserId};
use document_store::DocumentStoreError;
use domain::DomainError;
use thiserror::Error;

/// Errors that can occur during checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The request failed validation.
    #[error("Invalid checkout request: {0}")]
    InvalidRequest(String),

    /// The user has no cart, or it has no lines.
    #[error("Cart not found or empty")]
    EmptyCart,

    /// Another checkout of the same cart is still running.
    #[error("A checkout of the cart of user {0} is already in progress")]
    CheckoutInProgress(UserId),

    /// A cart line references a product that no longer exists.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// Not enough stock to fill a cart line.
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// The coupon does not exist or cannot be used.
    #[error("Invalid coupon: {0}")]
    InvalidCoupon(String),

    /// The gateway declined, failed or timed out. Nothing was written.
    #[error("Payment failed: {0}")]
    PaymentFailed(String),

    /// The cart stopped being held by this checkout before it could commit.
    #[error("Cart is no longer held by order {0}")]
    HoldLost(OrderId),

    /// The payment was captured but the order could not be committed.
    #[error(
        "Payment {payment_reference} was captured but the order could not be recorded ({reason}); reconciliation {reconciliation_id} opened"
    )]
    PostPaymentCommitFailure {
        reconciliation_id: ReconciliationId,
        payment_reference: String,
        reason: String,
    },

    /// Domain error.
    #[error("Domain error: {0}")]
    Domain(DomainError),

    /// Document store error.
    #[error("Document store error: {0}")]
    DocumentStore(#[from] DocumentStoreError),
}

impl From<DomainError> for CheckoutError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::InsufficientStock {
                product_id,
                requested,
                available,
            } => CheckoutError::InsufficientStock {
                product_id,
                requested,
                available,
            },
            DomainError::InvalidCoupon(message) => CheckoutError::InvalidCoupon(message),
            DomainError::CheckoutInProgress(user_id) => CheckoutError::CheckoutInProgress(user_id),
            DomainError::DocumentStore(e) => CheckoutError::DocumentStore(e),
            other => CheckoutError::Domain(other),
        }
    }
}

impl CheckoutError {
    /// Returns true if the error is an optimistic concurrency conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, CheckoutError::DocumentStore(e) if e.is_conflict())
    }

    /// Short label used for the aborted-checkout metric.
    pub fn reason(&self) -> &'static str {
        match self {
            CheckoutError::InvalidRequest(_) => "invalid_request",
            CheckoutError::EmptyCart => "empty_cart",
            CheckoutError::CheckoutInProgress(_) => "in_progress",
            CheckoutError::ProductNotFound(_) => "product_not_found",
            CheckoutError::InsufficientStock { .. } => "insufficient_stock",
            CheckoutError::InvalidCoupon(_) => "invalid_coupon",
            CheckoutError::PaymentFailed(_) => "payment_failed",
            CheckoutError::HoldLost(_) => "hold_lost",
            CheckoutError::PostPaymentCommitFailure { .. } => "post_payment_commit_failure",
            CheckoutError::Domain(_) | CheckoutError::DocumentStore(_) => "internal",
        }
    }
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;
