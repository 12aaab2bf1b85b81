//! Report error types.

use thiserror::Error;

/// Errors that can occur while building a report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The date range is malformed or reversed.
    #[error("Invalid date range: {0}")]
    InvalidRange(String),

    /// Loading orders failed.
    #[error("Domain error: {0}")]
    Domain(#[from] domain::DomainError),
}

/// Result type for report operations.
pub type Result<T> = std::result::Result<T, ReportError>;
