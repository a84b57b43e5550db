//! Storage seams for the rule lifecycle
//!
//! [`RuleStore`] serves reads outside any transaction and opens
//! [`RuleTransaction`]s for mutations. A transaction that is dropped without
//! [`RuleTransaction::commit`] is rolled back, so an early `?` return from a
//! mutation leaves no partial writes behind.

use crate::domain::{
    Application, ApplicationId, ApplicationInstance, NewRouteRule, RouteRule, RuleId,
};
use crate::errors::Result;
use async_trait::async_trait;

/// Read access to applications and rules, plus the entry point for writes.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Applications whose enabled flag equals `enabled`
    async fn find_applications_by_enabled(&self, enabled: bool) -> Result<Vec<Application>>;

    async fn find_application_by_id(&self, id: ApplicationId) -> Result<Option<Application>>;

    async fn find_application_by_name(&self, name: &str) -> Result<Option<Application>>;

    /// Batch lookup; ids with no matching application are skipped
    async fn find_applications_by_ids(&self, ids: &[ApplicationId]) -> Result<Vec<Application>>;

    /// Instance with exactly this application id and version
    async fn find_instance(
        &self,
        application_id: ApplicationId,
        version: &str,
    ) -> Result<Option<ApplicationInstance>>;

    async fn find_rule_by_name(&self, name: &str) -> Result<Option<RouteRule>>;

    async fn find_rule_by_id(&self, id: RuleId) -> Result<Option<RouteRule>>;

    /// All rules, optionally restricted to one application, newest first
    async fn list_rules(&self, application_id: Option<ApplicationId>) -> Result<Vec<RouteRule>>;

    /// Enabled rules belonging to any of the given applications, newest first
    async fn list_enabled_rules_for_apps(
        &self,
        application_ids: &[ApplicationId],
    ) -> Result<Vec<RouteRule>>;

    /// Open a transaction for a mutation
    async fn begin(&self) -> Result<Box<dyn RuleTransaction>>;
}

/// A single atomic unit of rule mutation.
///
/// Reads made through the transaction observe its own uncommitted writes.
#[async_trait]
pub trait RuleTransaction: Send {
    async fn find_rule_by_name(&mut self, name: &str) -> Result<Option<RouteRule>>;

    async fn find_rule_by_id(&mut self, id: RuleId) -> Result<Option<RouteRule>>;

    async fn find_instance(
        &mut self,
        application_id: ApplicationId,
        version: &str,
    ) -> Result<Option<ApplicationInstance>>;

    async fn find_application_by_id(&mut self, id: ApplicationId) -> Result<Option<Application>>;

    /// Insert a rule; fails with `DuplicateName` if the name is taken
    async fn insert_rule(&mut self, rule: NewRouteRule) -> Result<RouteRule>;

    /// Set the enabled flag; returns false when no rule has this id
    async fn update_rule_enabled(&mut self, id: RuleId, enabled: bool) -> Result<bool>;

    /// Remove a rule; returns false when no rule has this id
    async fn delete_rule(&mut self, id: RuleId) -> Result<bool>;

    /// Make all writes durable
    async fn commit(self: Box<Self>) -> Result<()>;
}
