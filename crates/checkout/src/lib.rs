//! Checkout orchestration for the storefront.
//!
//! This crate turns a user's cart into a paid order:
//! 1. Price the cart from current catalog prices and hold it
//! 2. Apply an optional coupon
//! 3. Authorize and capture the payment
//! 4. Atomically record the coupon use, decrement stock, create the order
//!    and remove the purchased lines from the cart
//!
//! The cart hold is the only write before the payment succeeds, and it is
//! released if the checkout stops before charging. If the final commit fails
//! after the payment was captured, a reconciliation record is persisted for
//! manual follow-up.

pub mod coordinator;
pub mod error;
pub mod reconciliation;
pub mod request;
pub mod services;
pub mod state;

pub use coordinator::{CheckoutConfig, CheckoutCoordinator};
pub use error::{CheckoutError, Result};
pub use reconciliation::{Reconciliation, ReconciliationService};
pub use request::CheckoutRequest;
pub use services::{
    GatewayError, HttpPaymentGateway, InMemoryPaymentGateway, PaymentCapture, PaymentGateway,
};
pub use state::CheckoutState;
