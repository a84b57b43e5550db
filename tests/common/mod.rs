//! Common test utilities for all integration tests.
//!
//! Provides shared test database setup and seeding helpers.

#![allow(dead_code)]
#![allow(clippy::duplicate_mod)]

pub mod test_db;

pub use test_db::TestDatabase;
