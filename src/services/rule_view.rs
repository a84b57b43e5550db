//! Presentation shape for rule listings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::{Application, ApplicationId, MatchFields, MatchObject, RouteRule, RuleId};

/// A listed rule with its owning application's name and match descriptor.
///
/// `application_name` is `None` when the owning application could not be
/// resolved; listings are not a consistent snapshot across tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleView {
    pub id: RuleId,
    pub name: String,
    pub application_id: ApplicationId,
    pub application_name: Option<String>,
    pub version: String,
    pub enabled: bool,
    pub match_object: MatchObject,
    #[serde(flatten)]
    pub match_fields: MatchFields,
    pub match_descriptor: String,
    pub created_at: DateTime<Utc>,
}

impl RuleView {
    pub fn new(rule: RouteRule, application_name: Option<String>) -> Self {
        let match_descriptor = rule.match_descriptor();
        Self {
            id: rule.id,
            name: rule.name,
            application_id: rule.application_id,
            application_name,
            version: rule.version,
            enabled: rule.enabled,
            match_object: rule.match_object,
            match_fields: rule.match_fields,
            match_descriptor,
            created_at: rule.created_at,
        }
    }
}

/// Map application ids to names for batch denormalisation
pub(crate) fn application_names(applications: Vec<Application>) -> HashMap<ApplicationId, String> {
    applications.into_iter().map(|app| (app.id, app.name)).collect()
}

/// Build views, keeping the rules' order
pub(crate) fn build_views(
    rules: Vec<RouteRule>,
    names: &HashMap<ApplicationId, String>,
) -> Vec<RuleView> {
    rules
        .into_iter()
        .map(|rule| {
            let name = names.get(&rule.application_id).cloned();
            RuleView::new(rule, name)
        })
        .collect()
}
