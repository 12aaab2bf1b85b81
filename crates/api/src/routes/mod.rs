//! HTTP route handlers.

pub mod cart;
pub mod checkout;
pub mod coupons;
pub mod health;
pub mod metrics;
pub mod notifications;
pub mod orders;
pub mod products;
pub mod reconciliations;
pub mod reports;
pub mod wishlist;

use crate::error::ApiError;

/// Parses a UUID identifier from a path segment or body field.
pub(crate) fn parse_id<T>(
    field: &str,
    raw: &str,
    parse: fn(&str) -> Result<T, uuid::Error>,
) -> Result<T, ApiError> {
    parse(raw.trim()).map_err(|e| ApiError::BadRequest(format!("Invalid {field}: {e}")))
}
