//! Test database utilities for integration tests.
//!
//! File-backed SQLite databases in a per-test temporary directory, so several
//! pooled connections can run concurrently against the same data.

#![allow(clippy::duplicate_mod)]

use std::sync::Arc;

use gateway_admin::config::{AppConfig, DatabaseConfig};
use gateway_admin::domain::ApplicationId;
use gateway_admin::storage::{create_pool, DbPool};
use gateway_admin::RuleCore;
use tempfile::TempDir;

/// A migrated test database; the directory is removed on drop.
pub struct TestDatabase {
    pub pool: DbPool,
    _dir: TempDir,
}

impl TestDatabase {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("create test database directory");
        let url = format!("sqlite://{}", dir.path().join("rules.db").display());
        let config = DatabaseConfig { url, max_connections: 8, ..Default::default() };

        let pool = create_pool(&config).await.expect("create test database pool");
        Self { pool, _dir: dir }
    }

    /// Register an application in the registry tables
    pub async fn application(&self, name: &str, enabled: bool) -> ApplicationId {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO applications (app_name, enabled) VALUES ($1, $2) RETURNING id",
        )
        .bind(name)
        .bind(enabled)
        .fetch_one(&self.pool)
        .await
        .expect("seed application");
        ApplicationId::new(id)
    }

    /// Register a deployable version of an application
    pub async fn instance(&self, application_id: ApplicationId, version: &str) {
        sqlx::query("INSERT INTO app_instances (app_id, version) VALUES ($1, $2)")
            .bind(application_id.get())
            .bind(version)
            .execute(&self.pool)
            .await
            .expect("seed instance");
    }

    /// Wire a rule core over this database with default event settings
    pub fn core(&self) -> Arc<RuleCore> {
        Arc::new(RuleCore::from_pool(self.pool.clone(), &AppConfig::default()))
    }
}
