//! Per-user shopping carts.

mod model;
mod service;

pub use model::{Cart, CartLine, CartLineView, CartView, CheckoutHold};
pub use service::CartService;
