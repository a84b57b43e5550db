//! # Gateway Admin
//!
//! Route rule lifecycle core for an API gateway. It validates, persists,
//! deletes and toggles the rules that map traffic to an upstream
//! application/instance version, and it publishes every effective change as a
//! `RuleActivated`/`RuleDeactivated` event so a downstream route cache stays in
//! step with the store without reloading it per request.
//!
//! ## Architecture
//!
//! ```text
//! caller → RuleService → validate_rule → RuleTransaction → commit
//!                                                           ↓
//!                               RuleEventPublisher ← publish event
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use gateway_admin::config::AppConfig;
//! use gateway_admin::domain::{ApplicationId, RuleInput};
//! use gateway_admin::{Result, RuleCore};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = AppConfig::load(None)?;
//!     let core = RuleCore::connect(&config).await?;
//!     let mut events = core.events.subscribe();
//!
//!     let input = RuleInput::new_default("r1", ApplicationId::new(1), "v1", true);
//!     core.service.add_rule(input).await?;
//!     println!("{:?}", events.recv().await);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod domain;
pub mod errors;
pub mod events;
pub mod observability;
pub mod services;
pub mod storage;

use std::sync::Arc;
use std::time::Duration;

// Re-export commonly used types and traits
pub use config::AppConfig;
pub use errors::{Error, GatewayError, Result};
pub use events::{RuleChangeEvent, RuleEventBroadcaster, RuleEventPublisher};
pub use services::{RuleService, RuleView};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// A connected rule service together with its pool and event channel
#[derive(Debug)]
pub struct RuleCore {
    pub pool: storage::DbPool,
    pub events: Arc<RuleEventBroadcaster>,
    pub service: RuleService,
    snapshot_refresh_interval: Duration,
}

impl RuleCore {
    /// Open the database described by `config` and wire up the service
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        let pool = storage::create_pool(&config.database).await?;
        Ok(Self::from_pool(pool, config))
    }

    pub fn from_pool(pool: storage::DbPool, config: &AppConfig) -> Self {
        let events = Arc::new(RuleEventBroadcaster::from_config(&config.events));
        let store = Arc::new(storage::SqlxRuleStore::new(pool.clone()));
        let service = RuleService::new(store, events.clone());

        tracing::debug!(
            app_name = APP_NAME,
            version = VERSION,
            event_buffer = config.events.buffer_size,
            "Rule core initialised"
        );

        Self {
            pool,
            events,
            service,
            snapshot_refresh_interval: config.events.snapshot_refresh_interval(),
        }
    }

    /// How often event consumers should reload [`RuleService::get_enabled_rules`]
    /// to repair a cache that missed events. The core itself runs no timer.
    pub fn snapshot_refresh_interval(&self) -> Duration {
        self.snapshot_refresh_interval
    }
}
