//! Identifier types shared by every storefront crate.

mod types;

pub use types::{CouponId, NotificationId, OrderId, ProductId, ReconciliationId, UserId};
