//! Rule change event payloads

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::{ApplicationId, MatchFields, MatchObject, RouteRule, RuleId};

/// A rule's routing-relevant fields with its owning application's name.
///
/// Used both as the payload of [`RuleChangeEvent`] and as an element of the
/// enabled-rule snapshot that consumers load at warm-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleWithAppName {
    pub id: RuleId,
    pub name: String,
    pub application_id: ApplicationId,
    pub application_name: String,
    pub version: String,
    pub enabled: bool,
    pub match_object: MatchObject,
    #[serde(flatten)]
    pub match_fields: MatchFields,
}

impl RuleWithAppName {
    pub fn new(rule: RouteRule, application_name: impl Into<String>) -> Self {
        Self {
            id: rule.id,
            name: rule.name,
            application_id: rule.application_id,
            application_name: application_name.into(),
            version: rule.version,
            enabled: rule.enabled,
            match_object: rule.match_object,
            match_fields: rule.match_fields,
        }
    }
}

/// Which way a rule transitioned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleEventKind {
    Activated,
    Deactivated,
}

impl RuleEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleEventKind::Activated => "activated",
            RuleEventKind::Deactivated => "deactivated",
        }
    }
}

impl fmt::Display for RuleEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notification that a rule became effective or stopped being effective.
///
/// Consumers add or replace their cached entry for the rule id on `Activated`
/// and drop it on `Deactivated`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RuleChangeEvent {
    #[serde(rename = "RuleActivated")]
    Activated(RuleWithAppName),
    #[serde(rename = "RuleDeactivated")]
    Deactivated(RuleWithAppName),
}

impl RuleChangeEvent {
    pub fn activated(rule: RouteRule, application_name: impl Into<String>) -> Self {
        Self::Activated(RuleWithAppName::new(rule, application_name))
    }

    pub fn deactivated(rule: RouteRule, application_name: impl Into<String>) -> Self {
        Self::Deactivated(RuleWithAppName::new(rule, application_name))
    }

    pub fn kind(&self) -> RuleEventKind {
        match self {
            RuleChangeEvent::Activated(_) => RuleEventKind::Activated,
            RuleChangeEvent::Deactivated(_) => RuleEventKind::Deactivated,
        }
    }

    pub fn rule(&self) -> &RuleWithAppName {
        match self {
            RuleChangeEvent::Activated(rule) | RuleChangeEvent::Deactivated(rule) => rule,
        }
    }

    pub fn rule_id(&self) -> RuleId {
        self.rule().id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MatchMethod, RuleInput};
    use chrono::Utc;

    fn header_rule() -> RouteRule {
        RuleInput::new_default("r-header", ApplicationId::new(2), "v3", true)
            .with_match(
                MatchObject::Header,
                MatchFields::new("X-Token", MatchMethod::Equals, "abc"),
            )
            .into_new_rule(Utc::now())
            .with_id(RuleId::new(8))
    }

    #[test]
    fn test_event_accessors() {
        let event = RuleChangeEvent::activated(header_rule(), "svc-b");
        assert_eq!(event.kind(), RuleEventKind::Activated);
        assert_eq!(event.rule_id(), RuleId::new(8));
        assert_eq!(event.rule().application_name, "svc-b");
        assert_eq!(event.rule().match_fields.key(), Some("X-Token"));
    }

    #[test]
    fn test_event_json_schema() {
        let event = RuleChangeEvent::deactivated(header_rule(), "svc-b");
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "RuleDeactivated");
        assert_eq!(json["id"], 8);
        assert_eq!(json["applicationId"], 2);
        assert_eq!(json["applicationName"], "svc-b");
        assert_eq!(json["matchObject"], "HEADER");
        assert_eq!(json["matchKey"], "X-Token");
        assert_eq!(json["matchMethod"], "EQUALS");
        assert_eq!(json["matchRule"], "abc");

        let decoded: RuleChangeEvent = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, event);
    }
}
