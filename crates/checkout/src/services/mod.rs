//! External services called during checkout.

pub mod payment;

pub use payment::{
    GatewayError, HttpPaymentGateway, InMemoryPaymentGateway, PaymentCapture, PaymentGateway,
};
