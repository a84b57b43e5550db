//! Rule lifecycle service
//!
//! Orchestrates validate → write → commit → publish for rule mutations and
//! serves the list and enabled-snapshot queries.
//!
//! Every mutation runs inside one store transaction. The transaction is only
//! committed once the write has succeeded, and the change event is published
//! after the commit. An early return drops the uncommitted transaction, which
//! rolls it back, so a failed call never leaves a rule or an event behind.
//!
//! Mutations are serialised by `write_gate`, held until the event has been
//! published. Subscribers therefore see events in commit order, and two adds
//! with the same name cannot both pass the uniqueness check.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{info, Instrument};

use crate::domain::{ApplicationId, RouteRule, RuleId, RuleInput};
use crate::errors::{GatewayError, Result};
use crate::events::{RuleChangeEvent, RuleEventPublisher, RuleWithAppName};
use crate::observability::metrics::record_rule_mutation;
use crate::rule_span;
use crate::services::rule_validator::validate_rule;
use crate::services::rule_view::{application_names, build_views, RuleView};
use crate::storage::{RuleStore, RuleTransaction};

/// Route rule lifecycle operations over an injected store and event publisher.
pub struct RuleService {
    store: Arc<dyn RuleStore>,
    publisher: Arc<dyn RuleEventPublisher>,
    write_gate: Mutex<()>,
}

impl RuleService {
    pub fn new(store: Arc<dyn RuleStore>, publisher: Arc<dyn RuleEventPublisher>) -> Self {
        Self { store, publisher, write_gate: Mutex::new(()) }
    }

    /// Rules of enabled applications that are themselves enabled.
    ///
    /// Used to warm up or resync a consumer cache; incremental changes arrive
    /// as events.
    pub async fn get_enabled_rules(&self) -> Result<Vec<RuleWithAppName>> {
        let applications = self.store.find_applications_by_enabled(true).await?;
        if applications.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<ApplicationId> = applications.iter().map(|app| app.id).collect();
        let names = application_names(applications);
        let rules = self.store.list_enabled_rules_for_apps(&ids).await?;

        Ok(rules
            .into_iter()
            .filter_map(|rule| {
                let name = names.get(&rule.application_id)?.clone();
                Some(RuleWithAppName::new(rule, name))
            })
            .collect())
    }

    /// Validate and persist a new rule.
    ///
    /// Publishes `RuleActivated` when the stored rule is enabled.
    pub async fn add_rule(&self, input: RuleInput) -> Result<RouteRule> {
        let span = rule_span!("add_rule", rule_name = %input.name);
        async move {
            let _gate = self.write_gate.lock().await;
            let result = self.add_rule_locked(input).await;
            record_rule_mutation("add", result.is_ok());
            result
        }
        .instrument(span)
        .await
    }

    async fn add_rule_locked(&self, mut input: RuleInput) -> Result<RouteRule> {
        let mut tx = self.store.begin().await?;

        validate_rule(&mut input, tx.as_mut()).await?;

        let rule = tx.insert_rule(input.into_new_rule(Utc::now())).await?;
        let application_name = if rule.enabled {
            Some(resolve_application_name(tx.as_mut(), rule.application_id).await?)
        } else {
            None
        };

        tx.commit().await?;

        info!(
            rule_id = %rule.id,
            rule_name = %rule.name,
            application_id = %rule.application_id,
            enabled = rule.enabled,
            "Route rule created"
        );

        if let Some(application_name) = application_name {
            self.publisher.publish(RuleChangeEvent::activated(rule.clone(), application_name));
        }

        Ok(rule)
    }

    /// Remove a rule.
    ///
    /// Always publishes `RuleDeactivated`, whatever the rule's enabled flag was,
    /// so consumers drop any cached entry for the id.
    pub async fn delete_rule(&self, id: RuleId) -> Result<()> {
        ensure_valid_rule_id(id)?;

        let span = rule_span!("delete_rule", rule_id = %id);
        async move {
            let _gate = self.write_gate.lock().await;
            let result = self.delete_rule_locked(id).await;
            record_rule_mutation("delete", result.is_ok());
            result
        }
        .instrument(span)
        .await
    }

    async fn delete_rule_locked(&self, id: RuleId) -> Result<()> {
        let mut tx = self.store.begin().await?;

        let rule = tx
            .find_rule_by_id(id)
            .await?
            .ok_or_else(|| GatewayError::not_found("RouteRule", id))?;
        let application_name = resolve_application_name(tx.as_mut(), rule.application_id).await?;

        if !tx.delete_rule(id).await? {
            return Err(GatewayError::not_found("RouteRule", id));
        }

        tx.commit().await?;

        info!(rule_id = %id, rule_name = %rule.name, "Route rule deleted");
        self.publisher.publish(RuleChangeEvent::deactivated(rule, application_name));

        Ok(())
    }

    /// Set a rule's enabled flag without re-validating it.
    ///
    /// The event carries `application_name` as given; it is not checked against
    /// the rule's owning application.
    pub async fn change_status(
        &self,
        id: RuleId,
        enabled: bool,
        application_name: &str,
    ) -> Result<()> {
        ensure_valid_rule_id(id)?;

        let span = rule_span!("change_status", rule_id = %id, enabled);
        async move {
            let _gate = self.write_gate.lock().await;
            let result = self.change_status_locked(id, enabled, application_name).await;
            record_rule_mutation("change_status", result.is_ok());
            result
        }
        .instrument(span)
        .await
    }

    async fn change_status_locked(
        &self,
        id: RuleId,
        enabled: bool,
        application_name: &str,
    ) -> Result<()> {
        let mut tx = self.store.begin().await?;

        if !tx.update_rule_enabled(id, enabled).await? {
            return Err(GatewayError::not_found("RouteRule", id));
        }
        let rule = tx
            .find_rule_by_id(id)
            .await?
            .ok_or_else(|| GatewayError::not_found("RouteRule", id))?;

        tx.commit().await?;

        info!(rule_id = %id, rule_name = %rule.name, enabled, "Route rule status changed");

        let event = if enabled {
            RuleChangeEvent::activated(rule, application_name)
        } else {
            RuleChangeEvent::deactivated(rule, application_name)
        };
        self.publisher.publish(event);

        Ok(())
    }

    /// List rules newest first, optionally for a single application by name.
    ///
    /// An empty name lists every rule; an unknown name yields an empty list.
    pub async fn list_rules(&self, application_name: Option<&str>) -> Result<Vec<RuleView>> {
        let application_id = match application_name.filter(|name| !name.is_empty()) {
            Some(name) => match self.store.find_application_by_name(name).await? {
                Some(application) => Some(application.id),
                None => return Ok(Vec::new()),
            },
            None => None,
        };

        let rules = self.store.list_rules(application_id).await?;

        let ids: Vec<ApplicationId> = rules
            .iter()
            .map(|rule| rule.application_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let names = application_names(self.store.find_applications_by_ids(&ids).await?);

        Ok(build_views(rules, &names))
    }
}

impl std::fmt::Debug for RuleService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleService").finish_non_exhaustive()
    }
}

fn ensure_valid_rule_id(id: RuleId) -> Result<()> {
    if id.is_valid() {
        Ok(())
    } else {
        Err(GatewayError::invalid_field("Rule ID must be a positive integer", "id"))
    }
}

async fn resolve_application_name(
    tx: &mut dyn RuleTransaction,
    application_id: ApplicationId,
) -> Result<String> {
    tx.find_application_by_id(application_id)
        .await?
        .map(|application| application.name)
        .ok_or_else(|| GatewayError::not_found("Application", application_id))
}
