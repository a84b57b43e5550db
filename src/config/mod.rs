//! # Configuration Management
//!
//! Layered configuration for the gateway admin core: compiled-in defaults, an
//! optional TOML/YAML file, then `GATEWAY__*` environment variables.

pub mod settings;

pub use settings::{AppConfig, DatabaseConfig, EventChannelConfig, ObservabilityConfig, ENV_PREFIX};
