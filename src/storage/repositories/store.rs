//! SQLx-backed [`RuleStore`] and [`RuleTransaction`]

use crate::domain::{
    Application, ApplicationId, ApplicationInstance, NewRouteRule, RouteRule, RuleId,
};
use crate::errors::{GatewayError, Result};
use crate::storage::repositories::{application, route_rule};
use crate::storage::repository::{RuleStore, RuleTransaction};
use crate::storage::DbPool;
use async_trait::async_trait;
use sqlx::{Sqlite, Transaction};
use tracing::instrument;

#[derive(Debug, Clone)]
pub struct SqlxRuleStore {
    pool: DbPool,
}

impl SqlxRuleStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl RuleStore for SqlxRuleStore {
    async fn find_applications_by_enabled(&self, enabled: bool) -> Result<Vec<Application>> {
        application::find_by_enabled(&self.pool, enabled).await
    }

    async fn find_application_by_id(&self, id: ApplicationId) -> Result<Option<Application>> {
        application::find_by_id(&self.pool, id).await
    }

    async fn find_application_by_name(&self, name: &str) -> Result<Option<Application>> {
        application::find_by_name(&self.pool, name).await
    }

    async fn find_applications_by_ids(&self, ids: &[ApplicationId]) -> Result<Vec<Application>> {
        application::find_by_ids(&self.pool, ids).await
    }

    async fn find_instance(
        &self,
        application_id: ApplicationId,
        version: &str,
    ) -> Result<Option<ApplicationInstance>> {
        application::find_instance(&self.pool, application_id, version).await
    }

    async fn find_rule_by_name(&self, name: &str) -> Result<Option<RouteRule>> {
        route_rule::find_by_name(&self.pool, name).await
    }

    async fn find_rule_by_id(&self, id: RuleId) -> Result<Option<RouteRule>> {
        route_rule::find_by_id(&self.pool, id).await
    }

    async fn list_rules(&self, application_id: Option<ApplicationId>) -> Result<Vec<RouteRule>> {
        route_rule::list(&self.pool, application_id).await
    }

    async fn list_enabled_rules_for_apps(
        &self,
        application_ids: &[ApplicationId],
    ) -> Result<Vec<RouteRule>> {
        route_rule::list_enabled_for_apps(&self.pool, application_ids).await
    }

    /// Takes the write lock before the first read; other writers wait on the
    /// busy timeout.
    #[instrument(skip(self), name = "db_begin_rule_transaction")]
    async fn begin(&self) -> Result<Box<dyn RuleTransaction>> {
        let tx = self.pool.begin_with("BEGIN IMMEDIATE").await.map_err(|e| {
            tracing::error!(error = %e, "Failed to begin rule transaction");
            GatewayError::database(e, "Failed to begin transaction for rule mutation")
        })?;

        Ok(Box::new(SqlxRuleTransaction { tx }))
    }
}

/// Open SQLite transaction; rolled back on drop unless committed
#[derive(Debug)]
pub struct SqlxRuleTransaction {
    tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl RuleTransaction for SqlxRuleTransaction {
    async fn find_rule_by_name(&mut self, name: &str) -> Result<Option<RouteRule>> {
        route_rule::find_by_name(&mut *self.tx, name).await
    }

    async fn find_rule_by_id(&mut self, id: RuleId) -> Result<Option<RouteRule>> {
        route_rule::find_by_id(&mut *self.tx, id).await
    }

    async fn find_instance(
        &mut self,
        application_id: ApplicationId,
        version: &str,
    ) -> Result<Option<ApplicationInstance>> {
        application::find_instance(&mut *self.tx, application_id, version).await
    }

    async fn find_application_by_id(&mut self, id: ApplicationId) -> Result<Option<Application>> {
        application::find_by_id(&mut *self.tx, id).await
    }

    async fn insert_rule(&mut self, rule: NewRouteRule) -> Result<RouteRule> {
        route_rule::insert(&mut *self.tx, rule).await
    }

    async fn update_rule_enabled(&mut self, id: RuleId, enabled: bool) -> Result<bool> {
        route_rule::update_enabled(&mut *self.tx, id, enabled).await
    }

    async fn delete_rule(&mut self, id: RuleId) -> Result<bool> {
        route_rule::delete(&mut *self.tx, id).await
    }

    #[instrument(skip(self), name = "db_commit_rule_transaction")]
    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to commit rule transaction");
            GatewayError::database(e, "Failed to commit rule mutation")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RuleInput;
    use crate::storage::test_helpers::{seed_application, TestDatabase};
    use chrono::Utc;

    #[tokio::test]
    async fn test_dropped_transaction_rolls_back() {
        let db = TestDatabase::new().await;
        let app = seed_application(&db.pool, "svc", true).await;
        let store = SqlxRuleStore::new(db.pool.clone());

        {
            let mut tx = store.begin().await.unwrap();
            let rule = RuleInput::new_default("r1", app, "v1", true).into_new_rule(Utc::now());
            tx.insert_rule(rule).await.unwrap();
            assert!(tx.find_rule_by_name("r1").await.unwrap().is_some());
        }

        assert!(store.find_rule_by_name("r1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_committed_transaction_is_visible() {
        let db = TestDatabase::new().await;
        let app = seed_application(&db.pool, "svc", true).await;
        let store = SqlxRuleStore::new(db.pool.clone());

        let mut tx = store.begin().await.unwrap();
        let rule = RuleInput::new_default("r1", app, "v1", false).into_new_rule(Utc::now());
        let inserted = tx.insert_rule(rule).await.unwrap();
        assert!(tx.update_rule_enabled(inserted.id, true).await.unwrap());
        tx.commit().await.unwrap();

        let loaded = store.find_rule_by_id(inserted.id).await.unwrap().unwrap();
        assert!(loaded.enabled);
        assert_eq!(store.list_rules(Some(app)).await.unwrap().len(), 1);
    }
}
