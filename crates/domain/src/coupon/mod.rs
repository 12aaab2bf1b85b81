//! Discount coupons.

mod model;
mod service;

pub use model::{Coupon, Discount, NewCoupon, apply_discount};
pub use service::CouponService;
