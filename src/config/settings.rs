//! # Configuration Settings
//!
//! Defines the configuration structure for the gateway admin core.

use crate::errors::{GatewayError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use validator::Validate;

/// Environment variable prefix for layered configuration (`GATEWAY__DATABASE__URL`)
pub const ENV_PREFIX: &str = "GATEWAY";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Database configuration
    #[validate(nested)]
    pub database: DatabaseConfig,

    /// Observability configuration
    #[validate(nested)]
    pub observability: ObservabilityConfig,

    /// Rule change event channel configuration
    #[validate(nested)]
    pub events: EventChannelConfig,
}

impl AppConfig {
    /// Load configuration from defaults, an optional file, and `GATEWAY__*` env vars
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX).separator("__").try_parsing(true),
            )
            .build()?;

        let app_config: AppConfig = settings.try_deserialize()?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(GatewayError::from)?;

        if !self.database.is_sqlite() {
            return Err(GatewayError::config("Database URL must start with 'sqlite:'"));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(GatewayError::config(
                "min_connections cannot be greater than max_connections",
            ));
        }

        Ok(())
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL
    #[validate(length(min = 1, message = "Database URL cannot be empty"))]
    pub url: String,

    /// Maximum number of connections in the pool
    #[validate(range(min = 1, max = 100, message = "Max connections must be between 1 and 100"))]
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    #[validate(range(max = 50, message = "Min connections must be between 0 and 50"))]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[validate(range(
        min = 1,
        max = 60,
        message = "Connect timeout must be between 1 and 60 seconds"
    ))]
    pub connect_timeout_seconds: u64,

    /// Idle timeout in seconds (0 = no timeout)
    pub idle_timeout_seconds: u64,

    /// Enable automatic migrations
    pub auto_migrate: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://./data/gateway-admin.db".to_string(),
            max_connections: 10,
            min_connections: 0,
            connect_timeout_seconds: 10,
            idle_timeout_seconds: 600, // 10 minutes
            auto_migrate: true,
        }
    }
}

impl DatabaseConfig {
    /// In-memory database on a single long-lived connection
    pub fn in_memory() -> Self {
        Self {
            url: "sqlite://:memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            idle_timeout_seconds: 0,
            ..Default::default()
        }
    }

    /// Get connection timeout as Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    /// Get idle timeout as Duration (None if 0)
    pub fn idle_timeout(&self) -> Option<Duration> {
        if self.idle_timeout_seconds == 0 {
            None
        } else {
            Some(Duration::from_secs(self.idle_timeout_seconds))
        }
    }

    /// Check if this is a SQLite configuration
    pub fn is_sqlite(&self) -> bool {
        self.url.starts_with("sqlite:")
    }

    pub fn is_in_memory(&self) -> bool {
        self.url.contains(":memory:")
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Service name attached to log output
    #[validate(length(min = 1, message = "Service name cannot be empty"))]
    pub service_name: String,

    /// Log level (trace, debug, info, warn, error); `RUST_LOG` overrides it
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: "gateway-admin".to_string(),
            log_level: "info".to_string(),
            json_logging: false,
        }
    }
}

/// Rule change event channel configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct EventChannelConfig {
    /// Events retained for slow subscribers before they are told to resync
    #[validate(range(
        min = 1,
        max = 65536,
        message = "Event buffer must hold between 1 and 65536 events"
    ))]
    pub buffer_size: usize,

    /// How often consumers should reload the enabled-rule snapshot, in seconds
    #[validate(range(
        min = 1,
        max = 3600,
        message = "Snapshot refresh interval must be between 1 and 3600 seconds"
    ))]
    pub snapshot_refresh_interval_seconds: u64,
}

impl Default for EventChannelConfig {
    fn default() -> Self {
        Self {
            buffer_size: crate::events::DEFAULT_EVENT_BUFFER_SIZE,
            snapshot_refresh_interval_seconds: 10,
        }
    }
}

impl EventChannelConfig {
    /// Get snapshot refresh interval as Duration
    pub fn snapshot_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.snapshot_refresh_interval_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    // Serialise tests that touch process-wide environment variables
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.events.snapshot_refresh_interval(), Duration::from_secs(10));
        assert_eq!(config.database.idle_timeout(), Some(Duration::from_secs(600)));
    }

    #[test]
    fn test_rejects_non_sqlite_url() {
        let mut config = AppConfig::default();
        config.database.url = "postgresql://localhost/gateway".to_string();
        assert!(matches!(config.validate(), Err(GatewayError::Config { .. })));
    }

    #[test]
    fn test_rejects_inverted_pool_bounds() {
        let mut config = AppConfig::default();
        config.database.max_connections = 2;
        config.database.min_connections = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_event_buffer() {
        let mut config = AppConfig::default();
        config.events.buffer_size = 0;
        assert!(matches!(config.validate(), Err(GatewayError::InvalidParameter { .. })));
    }

    #[test]
    fn test_in_memory_database_config() {
        let config = DatabaseConfig::in_memory();
        assert!(config.is_sqlite());
        assert_eq!(config.max_connections, 1);
        assert_eq!(config.idle_timeout(), None);
    }

    #[test]
    fn test_load_layers_file_and_env() {
        let _guard = ENV_MUTEX.lock().unwrap();

        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[database]\nurl = \"sqlite://./data/from-file.db\"\n\n[events]\nbuffer_size = 64"
        )
        .unwrap();

        std::env::set_var("GATEWAY__EVENTS__SNAPSHOT_REFRESH_INTERVAL_SECONDS", "30");
        let config = AppConfig::load(Some(file.path()));
        std::env::remove_var("GATEWAY__EVENTS__SNAPSHOT_REFRESH_INTERVAL_SECONDS");

        let config = config.unwrap();
        assert_eq!(config.database.url, "sqlite://./data/from-file.db");
        assert_eq!(config.events.buffer_size, 64);
        assert_eq!(config.events.snapshot_refresh_interval_seconds, 30);
        assert_eq!(config.observability.log_level, "info");
    }
}
