//! Route rule queries
//!
//! CRUD against the `route_rules` table. Creation times are stored as
//! fixed-width RFC 3339 text so that lexical order equals chronological order.

use crate::domain::{
    ApplicationId, MatchFields, MatchMethod, MatchObject, NewRouteRule, RouteRule, RuleId,
};
use crate::errors::{GatewayError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{Executor, FromRow, QueryBuilder, Sqlite};
use tracing::instrument;

const RULE_COLUMNS: &str = "id, name, app_id, version, enabled, match_object, match_key, \
                            match_method, match_rule, created_time";

// SQLite extended result code for UNIQUE constraint violations
const SQLITE_CONSTRAINT_UNIQUE: &str = "2067";

#[derive(Debug, Clone, FromRow)]
struct RouteRuleRow {
    pub id: i64,
    pub name: String,
    pub app_id: i64,
    pub version: String,
    pub enabled: bool,
    pub match_object: String,
    pub match_key: Option<String>,
    pub match_method: Option<String>,
    pub match_rule: Option<String>,
    pub created_time: String,
}

impl TryFrom<RouteRuleRow> for RouteRule {
    type Error = GatewayError;

    fn try_from(row: RouteRuleRow) -> Result<Self> {
        let match_object: MatchObject = row.match_object.parse().map_err(|e: String| {
            GatewayError::internal(format!("Failed to parse match object: {}", e))
        })?;

        let method = row
            .match_method
            .as_deref()
            .map(str::parse::<MatchMethod>)
            .transpose()
            .map_err(|e| GatewayError::internal(format!("Failed to parse match method: {}", e)))?;

        let created_at = DateTime::parse_from_rfc3339(&row.created_time)
            .map_err(|e| {
                GatewayError::internal(format!(
                    "Invalid created_time '{}' on rule {}: {}",
                    row.created_time, row.id, e
                ))
            })?
            .with_timezone(&Utc);

        Ok(Self {
            id: RuleId::new(row.id),
            name: row.name,
            application_id: ApplicationId::new(row.app_id),
            version: row.version,
            enabled: row.enabled,
            match_object,
            match_fields: MatchFields { key: row.match_key, method, rule: row.match_rule },
            created_at,
        })
    }
}

fn rows_to_rules(rows: Vec<RouteRuleRow>) -> Result<Vec<RouteRule>> {
    rows.into_iter().map(RouteRule::try_from).collect()
}

pub(crate) fn format_created_time(created_at: &DateTime<Utc>) -> String {
    created_at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db_err| db_err.code())
        .is_some_and(|code| code.as_ref() == SQLITE_CONSTRAINT_UNIQUE)
}

#[instrument(skip(executor), name = "db_find_rule_by_name")]
pub(crate) async fn find_by_name<'e, E>(executor: E, name: &str) -> Result<Option<RouteRule>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {} FROM route_rules WHERE name = $1", RULE_COLUMNS);
    let row = sqlx::query_as::<_, RouteRuleRow>(&sql)
        .bind(name)
        .fetch_optional(executor)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, rule_name = %name, "Failed to get rule by name");
            GatewayError::database(e, format!("Failed to get rule by name '{}'", name))
        })?;

    row.map(RouteRule::try_from).transpose()
}

#[instrument(skip(executor), fields(rule_id = %id), name = "db_find_rule_by_id")]
pub(crate) async fn find_by_id<'e, E>(executor: E, id: RuleId) -> Result<Option<RouteRule>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {} FROM route_rules WHERE id = $1", RULE_COLUMNS);
    let row = sqlx::query_as::<_, RouteRuleRow>(&sql)
        .bind(id.get())
        .fetch_optional(executor)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, rule_id = %id, "Failed to get rule by id");
            GatewayError::database(e, format!("Failed to get rule '{}'", id))
        })?;

    row.map(RouteRule::try_from).transpose()
}

#[instrument(skip(executor), name = "db_list_rules")]
pub(crate) async fn list<'e, E>(
    executor: E,
    application_id: Option<ApplicationId>,
) -> Result<Vec<RouteRule>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let mut builder =
        QueryBuilder::<Sqlite>::new(format!("SELECT {} FROM route_rules", RULE_COLUMNS));
    if let Some(application_id) = application_id {
        builder.push(" WHERE app_id = ").push_bind(application_id.get());
    }
    builder.push(" ORDER BY created_time DESC, id DESC");

    let rows = builder.build_query_as::<RouteRuleRow>().fetch_all(executor).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to list rules");
        GatewayError::database(e, "Failed to list rules")
    })?;

    rows_to_rules(rows)
}

#[instrument(
    skip(executor, application_ids),
    fields(app_count = application_ids.len()),
    name = "db_list_enabled_rules"
)]
pub(crate) async fn list_enabled_for_apps<'e, E>(
    executor: E,
    application_ids: &[ApplicationId],
) -> Result<Vec<RouteRule>>
where
    E: Executor<'e, Database = Sqlite>,
{
    if application_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {} FROM route_rules WHERE enabled = 1 AND app_id IN (",
        RULE_COLUMNS
    ));
    let mut separated = builder.separated(", ");
    for id in application_ids {
        separated.push_bind(id.get());
    }
    separated.push_unseparated(") ORDER BY created_time DESC, id DESC");

    let rows = builder.build_query_as::<RouteRuleRow>().fetch_all(executor).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to list enabled rules");
        GatewayError::database(e, "Failed to list enabled rules")
    })?;

    rows_to_rules(rows)
}

#[instrument(skip(executor, rule), fields(rule_name = %rule.name), name = "db_insert_rule")]
pub(crate) async fn insert<'e, E>(executor: E, rule: NewRouteRule) -> Result<RouteRule>
where
    E: Executor<'e, Database = Sqlite>,
{
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO route_rules (name, app_id, version, enabled, match_object, match_key, \
         match_method, match_rule, created_time) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING id",
    )
    .bind(&rule.name)
    .bind(rule.application_id.get())
    .bind(&rule.version)
    .bind(rule.enabled)
    .bind(rule.match_object.as_str())
    .bind(rule.match_fields.key.as_deref())
    .bind(rule.match_fields.method.map(|method| method.as_str()))
    .bind(rule.match_fields.rule.as_deref())
    .bind(format_created_time(&rule.created_at))
    .fetch_one(executor)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            tracing::warn!(rule_name = %rule.name, "Rule name already in use");
            return GatewayError::duplicate_name(rule.name.clone());
        }
        tracing::error!(error = %e, rule_name = %rule.name, "Failed to insert rule");
        GatewayError::database(e, format!("Failed to insert rule '{}'", rule.name))
    })?;

    Ok(rule.with_id(RuleId::new(id)))
}

#[instrument(skip(executor), fields(rule_id = %id), name = "db_update_rule_enabled")]
pub(crate) async fn update_enabled<'e, E>(executor: E, id: RuleId, enabled: bool) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE route_rules SET enabled = $1 WHERE id = $2")
        .bind(enabled)
        .bind(id.get())
        .execute(executor)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, rule_id = %id, enabled, "Failed to update rule status");
            GatewayError::database(e, format!("Failed to update status of rule '{}'", id))
        })?;

    Ok(result.rows_affected() > 0)
}

#[instrument(skip(executor), fields(rule_id = %id), name = "db_delete_rule")]
pub(crate) async fn delete<'e, E>(executor: E, id: RuleId) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM route_rules WHERE id = $1")
        .bind(id.get())
        .execute(executor)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, rule_id = %id, "Failed to delete rule");
            GatewayError::database(e, format!("Failed to delete rule '{}'", id))
        })?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RuleInput;
    use crate::storage::test_helpers::{seed_application, seed_instance, TestDatabase};
    use chrono::Duration;

    fn new_rule(
        name: &str,
        app: ApplicationId,
        enabled: bool,
        created_at: DateTime<Utc>,
    ) -> NewRouteRule {
        RuleInput::new_default(name, app, "v1", enabled).into_new_rule(created_at)
    }

    #[test]
    fn test_created_time_is_fixed_width() {
        let a = "2025-03-01T10:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let b = a + Duration::microseconds(1500);
        let (fa, fb) = (format_created_time(&a), format_created_time(&b));
        assert_eq!(fa.len(), fb.len());
        assert!(fa < fb);
        assert_eq!(fa, "2025-03-01T10:00:00.000000Z");
    }

    #[tokio::test]
    async fn test_insert_and_read_back_keyed_rule() {
        let db = TestDatabase::new().await;
        let app = seed_application(&db.pool, "svc", true).await;
        seed_instance(&db.pool, app, "v1").await;

        let new = RuleInput::new_default("canary", app, "v1", true)
            .with_match(MatchObject::Header, MatchFields::new("X-Canary", MatchMethod::Equals, "1"))
            .into_new_rule(Utc::now());
        let inserted = insert(&db.pool, new).await.unwrap();
        assert!(inserted.id.is_valid());

        let loaded = find_by_id(&db.pool, inserted.id).await.unwrap().unwrap();
        assert_eq!(loaded.match_object, MatchObject::Header);
        assert_eq!(loaded.match_fields, MatchFields::new("X-Canary", MatchMethod::Equals, "1"));
        assert_eq!(loaded.created_at.timestamp_micros(), inserted.created_at.timestamp_micros());

        let by_name = find_by_name(&db.pool, "canary").await.unwrap().unwrap();
        assert_eq!(by_name.id, inserted.id);
    }

    #[tokio::test]
    async fn test_duplicate_name_maps_to_duplicate_error() {
        let db = TestDatabase::new().await;
        let app = seed_application(&db.pool, "svc", true).await;

        insert(&db.pool, new_rule("r1", app, true, Utc::now())).await.unwrap();
        let err = insert(&db.pool, new_rule("r1", app, false, Utc::now())).await.unwrap_err();
        assert!(matches!(err, GatewayError::DuplicateName { ref name } if name == "r1"));
    }

    #[tokio::test]
    async fn test_list_orders_newest_first_and_filters() {
        let db = TestDatabase::new().await;
        let a = seed_application(&db.pool, "a", true).await;
        let b = seed_application(&db.pool, "b", true).await;
        let base = Utc::now();

        insert(&db.pool, new_rule("old", a, true, base)).await.unwrap();
        insert(&db.pool, new_rule("new", a, true, base + Duration::seconds(5))).await.unwrap();
        insert(&db.pool, new_rule("other", b, true, base + Duration::seconds(1))).await.unwrap();

        let all = list(&db.pool, None).await.unwrap();
        let names: Vec<_> = all.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["new", "other", "old"]);

        let only_a = list(&db.pool, Some(a)).await.unwrap();
        let names: Vec<_> = only_a.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["new", "old"]);
    }

    #[tokio::test]
    async fn test_list_enabled_for_apps() {
        let db = TestDatabase::new().await;
        let a = seed_application(&db.pool, "a", true).await;
        let b = seed_application(&db.pool, "b", true).await;

        insert(&db.pool, new_rule("a-on", a, true, Utc::now())).await.unwrap();
        insert(&db.pool, new_rule("a-off", a, false, Utc::now())).await.unwrap();
        insert(&db.pool, new_rule("b-on", b, true, Utc::now())).await.unwrap();

        let rules = list_enabled_for_apps(&db.pool, &[a]).await.unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].name, "a-on");
        assert!(list_enabled_for_apps(&db.pool, &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_and_delete_report_missing_rows() {
        let db = TestDatabase::new().await;
        let app = seed_application(&db.pool, "svc", true).await;
        let rule = insert(&db.pool, new_rule("r1", app, false, Utc::now())).await.unwrap();

        assert!(update_enabled(&db.pool, rule.id, true).await.unwrap());
        assert!(find_by_id(&db.pool, rule.id).await.unwrap().unwrap().enabled);
        assert!(!update_enabled(&db.pool, RuleId::new(999), true).await.unwrap());

        assert!(delete(&db.pool, rule.id).await.unwrap());
        assert!(!delete(&db.pool, rule.id).await.unwrap());
        assert!(find_by_id(&db.pool, rule.id).await.unwrap().is_none());
    }
}
