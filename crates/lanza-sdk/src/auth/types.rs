//! Authentication-related types and data structures
//!
//! This module defines the types shared by the identity client, the token
//! provider and the request interceptor: accounts, token sets, silent
//! acquisition requests and the auth error taxonomy.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use etcetera::{choose_base_strategy, BaseStrategy};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;

/// Current Unix time in seconds
pub(crate) fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Decode the claims segment of a JWT without verifying it
///
/// Tokens are issued to us by the authority, so the payload is only read for
/// expiry and identity hints; signature checking is the API's job.
pub(crate) fn decode_jwt_claims(token: &str) -> Option<serde_json::Value> {
    let mut parts = token.split('.');
    let (_header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let decoded = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('=').as_bytes())
        .ok()?;
    serde_json::from_slice(&decoded).ok()
}

/// An identity known to the identity client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Stable identifier, `<object id>.<tenant id>`
    pub home_account_id: String,
    /// Directory (tenant) the account signed in to
    pub tenant_id: String,
    /// Sign-in name, usually an email address
    pub username: String,
    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Account {
    pub fn new(
        home_account_id: impl Into<String>,
        tenant_id: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            home_account_id: home_account_id.into(),
            tenant_id: tenant_id.into(),
            username: username.into(),
            name: None,
        }
    }

    /// Build an account from the claims of an ID token
    ///
    /// Requires the `oid` and `tid` claims; the username falls back from
    /// `preferred_username` to `upn` to `email`.
    pub fn from_id_token(id_token: &str) -> Option<Self> {
        let claims = decode_jwt_claims(id_token)?;
        let oid = claims.get("oid")?.as_str()?;
        let tid = claims.get("tid")?.as_str()?;
        let username = ["preferred_username", "upn", "email"]
            .iter()
            .find_map(|key| claims.get(*key).and_then(|v| v.as_str()))
            .unwrap_or_default();

        Some(Self {
            home_account_id: format!("{}.{}", oid, tid),
            tenant_id: tid.to_string(),
            username: username.to_string(),
            name: claims
                .get("name")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
        })
    }
}

/// OAuth token set containing access token and optional refresh token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenSet {
    /// Access token for API requests
    pub access_token: String,
    /// Optional refresh token for silent renewal
    pub refresh_token: Option<String>,
    /// Token type (usually "Bearer")
    pub token_type: String,
    /// Token expiration time as Unix timestamp
    pub expires_at: Option<u64>,
    /// OAuth scopes granted with this token
    pub scopes: Vec<String>,
}

impl TokenSet {
    /// Create a new token set
    pub fn new(
        access_token: String,
        refresh_token: Option<String>,
        token_type: String,
        expires_in: Option<u64>,
        scopes: Vec<String>,
    ) -> Self {
        let expires_at = expires_in.map(|seconds| now_secs().saturating_add(seconds));

        Self {
            access_token,
            refresh_token,
            token_type,
            expires_at,
            scopes,
        }
    }

    /// Get the expiration time, either from stored value or by decoding JWT
    fn get_expiration(&self) -> Option<u64> {
        if let Some(exp) = self.expires_at {
            return Some(exp);
        }

        decode_jwt_claims(&self.access_token)?.get("exp")?.as_u64()
    }

    /// Check if the access token is expired
    pub fn is_expired(&self) -> bool {
        self.expires_within(Duration::ZERO)
    }

    /// Check if the token expires within the specified duration
    pub fn expires_within(&self, duration: Duration) -> bool {
        match self.get_expiration() {
            Some(expires_at) => expires_at <= now_secs().saturating_add(duration.as_secs()),
            None => false, // No expiration time means token doesn't expire
        }
    }

    /// Whether every requested scope was granted with this token
    pub fn covers(&self, scopes: &[String]) -> bool {
        scopes
            .iter()
            .all(|wanted| self.scopes.iter().any(|s| s.eq_ignore_ascii_case(wanted)))
    }
}

/// Request for a token without user interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SilentTokenRequest {
    /// Scopes the token must carry
    pub scopes: Vec<String>,
    /// Account the token is acquired for
    pub account: Account,
    /// Skip the cache and go straight to the token endpoint
    pub force_refresh: bool,
}

impl SilentTokenRequest {
    pub fn new(scopes: Vec<String>, account: Account) -> Self {
        Self {
            scopes,
            account,
            force_refresh: false,
        }
    }
}

/// Outcome of a successful token acquisition
#[derive(Debug, Clone)]
pub struct AuthenticationResult {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: Option<u64>,
    pub scopes: Vec<String>,
    pub account: Account,
    /// Whether the token was served from the cache
    pub from_cache: bool,
}

/// Authentication errors
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No active account and no cached accounts
    #[error("No accounts found. Please login")]
    NoAccount,

    /// Account is not in the identity client's cache
    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    /// Silent acquisition is impossible; the user has to sign in again
    #[error("Interaction required: {0}")]
    InteractionRequired(String),

    /// Silent acquisition failed for any other reason
    #[error("Token acquisition failed: {0}")]
    Acquisition(String),

    /// Network error talking to the token endpoint
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Invalid OAuth response
    #[error("Invalid OAuth response: {0}")]
    InvalidResponse(String),

    /// Token acquisition did not finish in time
    #[error("Token acquisition timed out")]
    Timeout,

    /// Token cache storage error
    #[error("Token storage error: {0}")]
    StorageError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

/// Get the default data directory for the token cache
/// Returns platform-specific data directory (e.g., ~/.local/share/lanza on Linux)
pub fn get_sdk_data_dir() -> AuthResult<PathBuf> {
    let strategy = choose_base_strategy().map_err(|e| {
        AuthError::ConfigError(format!("Failed to determine base directories: {}", e))
    })?;

    Ok(strategy.data_dir().join("lanza"))
}
