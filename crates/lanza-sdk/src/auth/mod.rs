//! Authentication module for the Lanza SDK
//!
//! This module provides:
//! - The identity client boundary and a public client implementation
//! - A persistent account and token cache
//! - Silent bearer token acquisition for API requests

pub mod cache;
pub mod client;
pub mod provider;
pub mod types;

// Re-export commonly used types
pub use cache::TokenCacheStore;
pub use client::{IdentityClient, IdentityConfig, PublicClientApplication};
pub use provider::TokenProvider;
pub use types::{Account, AuthError, AuthResult, AuthenticationResult, SilentTokenRequest, TokenSet};
