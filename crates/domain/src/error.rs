//! Domain error types.

use common::{ProductId, UserId};
use document_store::DocumentStoreError;
use thiserror::Error;

use crate::order::OrderStatus;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the document store.
    #[error("Document store error: {0}")]
    DocumentStore(#[from] DocumentStoreError),

    /// The requested entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A record with the same key already exists.
    #[error("{entity} already exists: {id}")]
    AlreadyExists { entity: &'static str, id: String },

    /// The request was rejected by validation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Not enough units of a product are in stock.
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// The coupon cannot be used.
    #[error("Invalid coupon: {0}")]
    InvalidCoupon(String),

    /// The caller is not allowed to perform the operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The order status change is not allowed.
    #[error("Cannot change order status from {from} to {to}")]
    InvalidStatusTransition { from: OrderStatus, to: OrderStatus },

    /// Another checkout of the same cart has not finished yet.
    #[error("A checkout of the cart of user {0} is already in progress")]
    CheckoutInProgress(UserId),

    /// Concurrent writers kept winning until the retry budget ran out.
    #[error("Too many concurrent updates of {entity} {id}")]
    Contention { entity: &'static str, id: String },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    /// Creates a not-found error for an entity key.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        DomainError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;
