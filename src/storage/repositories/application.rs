//! Application registry queries
//!
//! Read-only lookups against the `applications` and `app_instances` tables.
//! Each query is generic over the executor so it can run against the pool or
//! inside an open transaction.

use crate::domain::{Application, ApplicationId, ApplicationInstance};
use crate::errors::{GatewayError, Result};
use sqlx::{Executor, FromRow, QueryBuilder, Sqlite};
use tracing::instrument;

#[derive(Debug, Clone, FromRow)]
struct ApplicationRow {
    pub id: i64,
    pub app_name: String,
    pub enabled: bool,
}

impl From<ApplicationRow> for Application {
    fn from(row: ApplicationRow) -> Self {
        Self { id: ApplicationId::new(row.id), name: row.app_name, enabled: row.enabled }
    }
}

#[derive(Debug, Clone, FromRow)]
struct InstanceRow {
    pub app_id: i64,
    pub version: String,
}

impl From<InstanceRow> for ApplicationInstance {
    fn from(row: InstanceRow) -> Self {
        Self { application_id: ApplicationId::new(row.app_id), version: row.version }
    }
}

#[instrument(skip(executor), name = "db_find_applications_by_enabled")]
pub(crate) async fn find_by_enabled<'e, E>(executor: E, enabled: bool) -> Result<Vec<Application>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, ApplicationRow>(
        "SELECT id, app_name, enabled FROM applications WHERE enabled = $1 ORDER BY id",
    )
    .bind(enabled)
    .fetch_all(executor)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, enabled, "Failed to list applications by enabled flag");
        GatewayError::database(e, "Failed to list applications by enabled flag")
    })?;

    Ok(rows.into_iter().map(Application::from).collect())
}

#[instrument(skip(executor), fields(application_id = %id), name = "db_find_application_by_id")]
pub(crate) async fn find_by_id<'e, E>(executor: E, id: ApplicationId) -> Result<Option<Application>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, ApplicationRow>(
        "SELECT id, app_name, enabled FROM applications WHERE id = $1",
    )
    .bind(id.get())
    .fetch_optional(executor)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, application_id = %id, "Failed to get application by id");
        GatewayError::database(e, format!("Failed to get application '{}'", id))
    })?;

    Ok(row.map(Application::from))
}

#[instrument(skip(executor), name = "db_find_application_by_name")]
pub(crate) async fn find_by_name<'e, E>(executor: E, name: &str) -> Result<Option<Application>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, ApplicationRow>(
        "SELECT id, app_name, enabled FROM applications WHERE app_name = $1",
    )
    .bind(name)
    .fetch_optional(executor)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, app_name = %name, "Failed to get application by name");
        GatewayError::database(e, format!("Failed to get application by name '{}'", name))
    })?;

    Ok(row.map(Application::from))
}

#[instrument(skip(executor, ids), fields(count = ids.len()), name = "db_find_applications_by_ids")]
pub(crate) async fn find_by_ids<'e, E>(
    executor: E,
    ids: &[ApplicationId],
) -> Result<Vec<Application>>
where
    E: Executor<'e, Database = Sqlite>,
{
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder =
        QueryBuilder::<Sqlite>::new("SELECT id, app_name, enabled FROM applications WHERE id IN (");
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(id.get());
    }
    separated.push_unseparated(") ORDER BY id");

    let rows = builder.build_query_as::<ApplicationRow>().fetch_all(executor).await.map_err(|e| {
        tracing::error!(error = %e, count = ids.len(), "Failed to batch load applications");
        GatewayError::database(e, "Failed to batch load applications")
    })?;

    Ok(rows.into_iter().map(Application::from).collect())
}

#[instrument(
    skip(executor),
    fields(application_id = %application_id),
    name = "db_find_instance"
)]
pub(crate) async fn find_instance<'e, E>(
    executor: E,
    application_id: ApplicationId,
    version: &str,
) -> Result<Option<ApplicationInstance>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, InstanceRow>(
        "SELECT app_id, version FROM app_instances WHERE app_id = $1 AND version = $2",
    )
    .bind(application_id.get())
    .bind(version)
    .fetch_optional(executor)
    .await
    .map_err(|e| {
        tracing::error!(
            error = %e,
            application_id = %application_id,
            version = %version,
            "Failed to get application instance"
        );
        GatewayError::database(
            e,
            format!("Failed to get instance '{}' of application '{}'", version, application_id),
        )
    })?;

    Ok(row.map(ApplicationInstance::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_helpers::{seed_application, seed_instance, TestDatabase};

    #[tokio::test]
    async fn test_lookups_by_id_and_name() {
        let db = TestDatabase::new().await;
        let id = seed_application(&db.pool, "svc-a", true).await;

        let by_id = find_by_id(&db.pool, id).await.unwrap().unwrap();
        assert_eq!(by_id.name, "svc-a");
        assert!(by_id.enabled);

        let by_name = find_by_name(&db.pool, "svc-a").await.unwrap().unwrap();
        assert_eq!(by_name.id, id);

        assert!(find_by_name(&db.pool, "missing").await.unwrap().is_none());
        assert!(find_by_id(&db.pool, ApplicationId::new(999)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_by_enabled_partitions_applications() {
        let db = TestDatabase::new().await;
        let on = seed_application(&db.pool, "on", true).await;
        let off = seed_application(&db.pool, "off", false).await;

        let enabled = find_by_enabled(&db.pool, true).await.unwrap();
        assert_eq!(enabled.iter().map(|a| a.id).collect::<Vec<_>>(), vec![on]);

        let disabled = find_by_enabled(&db.pool, false).await.unwrap();
        assert_eq!(disabled.iter().map(|a| a.id).collect::<Vec<_>>(), vec![off]);
    }

    #[tokio::test]
    async fn test_find_by_ids_skips_unknown() {
        let db = TestDatabase::new().await;
        let a = seed_application(&db.pool, "a", true).await;
        let b = seed_application(&db.pool, "b", false).await;

        let found = find_by_ids(&db.pool, &[b, ApplicationId::new(404), a]).await.unwrap();
        assert_eq!(found.len(), 2);
        assert!(find_by_ids(&db.pool, &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_instance_requires_exact_version() {
        let db = TestDatabase::new().await;
        let app = seed_application(&db.pool, "svc", true).await;
        seed_instance(&db.pool, app, "v1").await;

        let instance = find_instance(&db.pool, app, "v1").await.unwrap().unwrap();
        assert_eq!(instance.application_id, app);
        assert!(find_instance(&db.pool, app, "v2").await.unwrap().is_none());
    }
}
