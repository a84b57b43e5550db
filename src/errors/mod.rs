//! # Error Handling
//!
//! Crate-wide error type. Rule-lifecycle failures (duplicate names, incomplete
//! match fields, unknown instance versions, missing rules) are distinct variants
//! so callers can map each to its own response.

pub mod types;

pub use types::{GatewayError, MissingFields, Result};

/// Short alias used throughout the crate
pub type Error = GatewayError;
