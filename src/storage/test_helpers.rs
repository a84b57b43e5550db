//! Test database utilities for in-library tests.
//!
//! Each `TestDatabase` is a fresh in-memory SQLite database with all
//! migrations applied. The application registry is seeded with plain SQL since
//! the rule core never writes to it.

use crate::config::DatabaseConfig;
use crate::domain::ApplicationId;
use crate::storage::{create_pool, DbPool};

pub struct TestDatabase {
    pub pool: DbPool,
}

impl TestDatabase {
    pub async fn new() -> Self {
        let pool = create_pool(&DatabaseConfig::in_memory())
            .await
            .expect("in-memory test database should be created");
        Self { pool }
    }
}

pub async fn seed_application(pool: &DbPool, name: &str, enabled: bool) -> ApplicationId {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO applications (app_name, enabled) VALUES ($1, $2) RETURNING id",
    )
    .bind(name)
    .bind(enabled)
    .fetch_one(pool)
    .await
    .expect("seed application");
    ApplicationId::new(id)
}

pub async fn seed_instance(pool: &DbPool, application_id: ApplicationId, version: &str) {
    sqlx::query("INSERT INTO app_instances (app_id, version) VALUES ($1, $2)")
        .bind(application_id.get())
        .bind(version)
        .execute(pool)
        .await
        .expect("seed instance");
}
