//! Error types for the Lanza SDK

use crate::auth::AuthError;
use crate::exchange::GraphQLError;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors surfaced by the GraphQL client and its pipeline
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Token acquisition failed before the request was sent
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// HTTP transport failure
    #[error("HTTP client error: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// The API rejected the credentials (401)
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The credentials lack permission (403)
    #[error("Access forbidden: {message}")]
    Authorization { message: String },

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Any other non-success HTTP status
    #[error("Request failed with status {status}: {message}")]
    Http { status: u16, message: String },

    /// The response carried GraphQL errors and no data
    #[error("GraphQL error: {}", format_graphql_errors(.errors))]
    GraphQL { errors: Vec<GraphQLError> },

    /// Response data did not match the expected shape
    #[error("Failed to decode response data: {0}")]
    Decode(#[source] serde_json::Error),

    /// The operation was torn down before it completed
    #[error("Operation cancelled")]
    Cancelled,

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

fn format_graphql_errors(errors: &[GraphQLError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

impl ClientError {
    /// Whether the failure came from authentication rather than the network
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            ClientError::Auth(_) | ClientError::Authentication { .. } | ClientError::Authorization { .. }
        )
    }
}
