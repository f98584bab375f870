//! # Lanza SDK
//!
//! Authenticated GraphQL access to the Lanza Lake API.
//!
//! - [`auth`]: identity client, token cache and silent token acquisition
//! - [`exchange`]: operations and the interceptor pipeline, including the
//!   interceptor that attaches bearer tokens
//! - [`transport`]: JSON-over-HTTP transport
//! - [`client`]: the client and its builder
//! - [`config`]: sign-in and endpoint configuration

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod exchange;
pub mod transport;

pub use client::{ClientBuilder, GraphQLClient};
pub use config::SsoConfig;
pub use error::{ClientError, Result};
pub use exchange::{
    FetchOptions, FetchOptionsSource, GraphQLRequest, Operation, OperationContext, OperationKind,
    OperationResult,
};
