//! Error types for the Lanza CLI

use color_eyre::eyre::Report;
use thiserror::Error;

/// CLI error type with minimal variants
#[derive(Debug, Error)]
pub enum CliError {
    /// API communication errors
    #[error(transparent)]
    Client(#[from] lanza_sdk::ClientError),

    /// Account and token cache issues
    #[error(transparent)]
    Auth(#[from] lanza_sdk::auth::AuthError),

    /// A query failed; the cause has already been logged
    #[error("Unable to get a valid response")]
    NoValidResponse,

    /// Bad arguments or input files
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Everything else (using color-eyre's Report for rich errors)
    #[error(transparent)]
    Internal(#[from] Report),
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
