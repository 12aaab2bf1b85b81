//! Completed purchases and their fulfilment status.

mod model;
mod service;
mod status;

pub use model::{Order, OrderLine};
pub use service::OrderService;
pub use status::OrderStatus;
