//! # Storage and Persistence
//!
//! Database connectivity and the persistence layer for route rules and the
//! application registry they reference.

pub mod migrations;
pub mod pool;
pub mod repositories;
pub mod repository;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use crate::config::DatabaseConfig;

pub use migrations::{
    get_migration_version, list_applied_migrations, pending_migrations,
    run_migrations as run_db_migrations, validate_migrations, MigrationInfo, PendingMigration,
};
pub use pool::{create_pool, DbPool};
pub use repositories::{SqlxRuleStore, SqlxRuleTransaction};
pub use repository::{RuleStore, RuleTransaction};

use crate::errors::{GatewayError, Result};

/// Check database connectivity
pub async fn check_connection(pool: &DbPool) -> Result<()> {
    sqlx::query("SELECT 1")
        .fetch_one(pool)
        .await
        .map_err(|e| GatewayError::database(e, "Database connectivity check failed"))?;

    Ok(())
}
