//! CLI error types.

use thiserror::Error;

/// Errors reported to the user before exiting.
#[derive(Debug, Error)]
pub enum CliError {
    /// A prompted or passed value was not usable.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Reading from the terminal failed.
    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),

    /// The request could not be sent or its response not read.
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with an error status.
    #[error("API returned {status}: {message}")]
    Api { status: u16, message: String },
}
