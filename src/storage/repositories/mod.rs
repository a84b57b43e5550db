//! # Repository implementations
//!
//! Query functions for the application registry and route rule tables, plus
//! the SQLx store that composes them behind the storage traits.

pub mod application;
pub mod route_rule;
pub mod store;

pub use store::{SqlxRuleStore, SqlxRuleTransaction};
