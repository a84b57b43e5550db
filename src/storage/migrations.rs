//! # Database Migration Management
//!
//! Schema evolution using SQL migrations embedded in the binary from the
//! `migrations/` directory. Migrations run automatically on pool creation when
//! `auto_migrate` is enabled, or on demand via the CLI.

use crate::errors::{GatewayError, Result};
use crate::storage::DbPool;
use serde::{Deserialize, Serialize};
use sqlx::migrate::Migrator;
use sqlx::Row;
use tracing::{info, warn};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Applied migration as recorded in the tracking table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationInfo {
    pub version: i64,
    pub description: String,
    pub installed_on: String,
    pub execution_time: i64,
    pub checksum: Vec<u8>,
}

/// An embedded migration that has not been applied yet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingMigration {
    pub version: i64,
    pub description: String,
}

/// Run all pending database migrations
pub async fn run_migrations(pool: &DbPool) -> Result<()> {
    let before = get_migration_version(pool).await?;
    info!(current_version = before, "Starting database migration process");

    MIGRATOR.run(pool).await.map_err(|e| {
        tracing::error!(error = %e, "Database migration failed");
        GatewayError::from(e)
    })?;

    let after = get_migration_version(pool).await?;
    if after > before {
        info!(from_version = before, to_version = after, "Database migrations completed");
    } else {
        info!("No pending migrations");
    }

    Ok(())
}

/// Embedded migrations not yet recorded as applied
pub async fn pending_migrations(pool: &DbPool) -> Result<Vec<PendingMigration>> {
    let applied: Vec<i64> =
        list_applied_migrations(pool).await?.into_iter().map(|m| m.version).collect();

    Ok(MIGRATOR
        .iter()
        .filter(|migration| !applied.contains(&migration.version))
        .map(|migration| PendingMigration {
            version: migration.version,
            description: migration.description.to_string(),
        })
        .collect())
}

/// Validate that the applied migrations match the embedded set
pub async fn validate_migrations(pool: &DbPool) -> Result<bool> {
    info!("Validating migration integrity");

    let applied = list_applied_migrations(pool).await?;

    for migration in MIGRATOR.iter() {
        match applied.iter().find(|a| a.version == migration.version) {
            None => {
                warn!(version = migration.version, "Missing migration");
                return Ok(false);
            }
            Some(a) if a.checksum.as_slice() != migration.checksum.as_ref() => {
                warn!(version = migration.version, "Migration checksum mismatch");
                return Ok(false);
            }
            Some(_) => {}
        }
    }

    for a in &applied {
        if !MIGRATOR.iter().any(|m| m.version == a.version) {
            warn!(version = a.version, "Unexpected migration found");
            return Ok(false);
        }
    }

    info!("Migration validation successful");
    Ok(true)
}

/// Get the current migration version (highest applied)
pub async fn get_migration_version(pool: &DbPool) -> Result<i64> {
    let applied = list_applied_migrations(pool).await?;
    Ok(applied.into_iter().map(|m| m.version).max().unwrap_or(0))
}

/// List all applied migrations
pub async fn list_applied_migrations(pool: &DbPool) -> Result<Vec<MigrationInfo>> {
    let rows = sqlx::query(
        "SELECT version, description, CAST(installed_on AS TEXT) AS installed_on, \
         execution_time, checksum FROM _sqlx_migrations WHERE success = 1 ORDER BY version",
    )
    .fetch_all(pool)
    .await;

    match rows {
        Ok(rows) => {
            let migrations = rows
                .into_iter()
                .map(|row| MigrationInfo {
                    version: row.get("version"),
                    description: row.get("description"),
                    installed_on: row.get("installed_on"),
                    execution_time: row.get("execution_time"),
                    checksum: row.get("checksum"),
                })
                .collect();
            Ok(migrations)
        }
        Err(sqlx::Error::Database(db_err))
            if db_err.message().contains("no such table: _sqlx_migrations") =>
        {
            // Table doesn't exist yet - expected before the first run
            Ok(Vec::new())
        }
        Err(e) => Err(GatewayError::database(e, "Failed to list applied migrations")),
    }
}
