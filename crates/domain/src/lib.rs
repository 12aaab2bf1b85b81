//! Domain layer for the storefront.
//!
//! This crate provides the storefront entities and the rules that guard them:
//! - Record trait and Repository for versioned read-modify-write
//! - Catalog products with reviews and stock
//! - Per-user carts with an incrementally maintained total
//! - Coupons and the pure discount calculation
//! - Order snapshots and their status lifecycle
//! - Notifications and wishlists

pub mod cart;
pub mod catalog;
pub mod coupon;
pub mod error;
pub mod identity;
pub mod money;
pub mod notification;
pub mod order;
pub mod repository;
pub mod wishlist;

pub use cart::{Cart, CartLine, CartLineView, CartService, CartView, CheckoutHold};
pub use catalog::{CatalogService, NewProduct, Product, ProductSearch, ProductUpdate, Review};
pub use coupon::{Coupon, CouponService, Discount, NewCoupon, apply_discount};
pub use error::{DomainError, Result};
pub use identity::Identity;
pub use money::Money;
pub use notification::{Notification, NotificationService, NotificationSink};
pub use order::{Order, OrderLine, OrderService, OrderStatus};
pub use repository::{Record, Repository, Stored};
pub use wishlist::{Wishlist, WishlistService, WishlistView};
