//! # Observability Infrastructure
//!
//! Structured logging and metrics for the gateway admin core.

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, log_config_info};
pub use metrics::{describe_rule_metrics, record_event_published, record_rule_mutation};
