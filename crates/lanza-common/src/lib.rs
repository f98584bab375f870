//! Shared utilities for Lanza components

pub mod logging;
