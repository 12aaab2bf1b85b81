//! Read-only sales reports.
//!
//! Reports aggregate stored orders over an inclusive date range:
//! - [`ReportService::total_revenue`] sums what was charged
//! - [`ReportService::order_count`] counts orders
//! - [`ReportService::top_selling_products`] ranks products by units sold
//!
//! Non-admin callers only ever see their own orders.

pub mod error;
pub mod range;
pub mod service;

pub use error::{ReportError, Result};
pub use range::DateRange;
pub use service::{
    DEFAULT_TOP_SELLING_LIMIT, OrderCount, ProductSales, ReportService, RevenueReport,
};
