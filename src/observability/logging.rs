//! # Structured Logging
//!
//! Subscriber setup plus the span macro for rule operations.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{AppConfig, ObservabilityConfig};
use crate::errors::{GatewayError, Result};

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Returns `Ok(false)`
/// when a subscriber was already installed (e.g. by a test harness).
pub fn init_logging(config: &ObservabilityConfig) -> Result<bool> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level).map_err(|e| {
            GatewayError::config(format!("Invalid log level '{}': {}", config.log_level, e))
        })?,
    };

    let installed = if config.json_logging {
        fmt().json().with_env_filter(filter).with_current_span(true).try_init().is_ok()
    } else {
        fmt().with_env_filter(filter).with_target(false).try_init().is_ok()
    };

    if installed {
        tracing::debug!(
            service_name = %config.service_name,
            log_level = %config.log_level,
            json = config.json_logging,
            "Logging initialized"
        );
    }

    Ok(installed)
}

/// Create a tracing span for a rule lifecycle operation.
///
/// ```rust,ignore
/// let span = rule_span!("add_rule", rule_name = %input.name);
/// ```
#[macro_export]
macro_rules! rule_span {
    ($operation:expr) => {
        tracing::info_span!(
            "rule_operation",
            operation = %$operation,
            operation_id = %uuid::Uuid::new_v4()
        )
    };
    ($operation:expr, $($field:tt)*) => {
        tracing::info_span!(
            "rule_operation",
            operation = %$operation,
            operation_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Log configuration at startup
pub fn log_config_info(config: &AppConfig) {
    tracing::info!(
        database_url = %crate::storage::pool::sanitize_url(&config.database.url),
        max_connections = config.database.max_connections,
        auto_migrate = config.database.auto_migrate,
        event_buffer = config.events.buffer_size,
        snapshot_refresh_secs = config.events.snapshot_refresh_interval_seconds,
        "Gateway admin configuration"
    );
}
