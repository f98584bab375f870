//! # Lanza CLI
//!
//! Command-line client for the Lanza Lake API: sign-in account management
//! and authenticated GraphQL queries.

pub mod cli;
pub mod error;
pub mod output;
pub mod progress;

pub use error::*;
