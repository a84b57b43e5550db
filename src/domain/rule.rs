//! Route rule domain types
//!
//! A route rule binds an application and instance version to optional match
//! criteria. Two shapes are legal:
//!
//! - `DEFAULT` match object: matches all traffic for the application, and the
//!   key/method/rule triple is absent.
//! - keyed match object (`HEADER`, `QUERY`): all three of key, method and rule
//!   are present and non-empty.
//!
//! [`MatchFields::all_present`] and [`MatchFields::all_absent`] are the only
//! predicates used to decide which shape a rule has.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::{Validate, ValidationError};

use super::id::{ApplicationId, RuleId};
use crate::errors::MissingFields;

/// What part of a request a rule inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchObject {
    /// Match every request for the application
    #[default]
    Default,
    /// Match on a request header
    Header,
    /// Match on a query parameter
    Query,
}

impl MatchObject {
    /// Convert to database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchObject::Default => "DEFAULT",
            MatchObject::Header => "HEADER",
            MatchObject::Query => "QUERY",
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, MatchObject::Default)
    }
}

impl fmt::Display for MatchObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchObject {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DEFAULT" => Ok(MatchObject::Default),
            "HEADER" => Ok(MatchObject::Header),
            "QUERY" => Ok(MatchObject::Query),
            _ => Err(format!("Invalid match object: {}", s)),
        }
    }
}

/// How the match key's value is compared against the match rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchMethod {
    Equals,
    Regex,
    Prefix,
    Contains,
}

impl MatchMethod {
    /// Convert to database string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMethod::Equals => "EQUALS",
            MatchMethod::Regex => "REGEX",
            MatchMethod::Prefix => "PREFIX",
            MatchMethod::Contains => "CONTAINS",
        }
    }

    /// Human-readable form used in match descriptors
    pub fn description(&self) -> &'static str {
        match self {
            MatchMethod::Equals => "equals",
            MatchMethod::Regex => "matches",
            MatchMethod::Prefix => "starts with",
            MatchMethod::Contains => "contains",
        }
    }
}

impl fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "EQUALS" => Ok(MatchMethod::Equals),
            "REGEX" => Ok(MatchMethod::Regex),
            "PREFIX" => Ok(MatchMethod::Prefix),
            "CONTAINS" => Ok(MatchMethod::Contains),
            _ => Err(format!("Invalid match method: {}", s)),
        }
    }
}

/// The key/method/rule triple of a keyed match.
///
/// Empty strings are treated the same as absent values.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MatchFields {
    #[serde(rename = "matchKey", default)]
    pub key: Option<String>,
    #[serde(rename = "matchMethod", default)]
    pub method: Option<MatchMethod>,
    #[serde(rename = "matchRule", default)]
    pub rule: Option<String>,
}

impl MatchFields {
    pub fn new(key: impl Into<String>, method: MatchMethod, rule: impl Into<String>) -> Self {
        Self { key: Some(key.into()), method: Some(method), rule: Some(rule.into()) }
    }

    /// Match key, if present and non-empty
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref().filter(|key| !key.is_empty())
    }

    /// Match rule, if present and non-empty
    pub fn rule(&self) -> Option<&str> {
        self.rule.as_deref().filter(|rule| !rule.is_empty())
    }

    /// Which of the three fields are absent or empty
    pub fn missing(&self) -> MissingFields {
        MissingFields {
            key: self.key().is_none(),
            method: self.method.is_none(),
            rule: self.rule().is_none(),
        }
    }

    /// Key, method and rule are all present and non-empty
    pub fn all_present(&self) -> bool {
        !self.missing().any()
    }

    /// Key, method and rule are all absent or empty
    pub fn all_absent(&self) -> bool {
        let missing = self.missing();
        missing.key && missing.method && missing.rule
    }

    /// Drop all three fields
    pub fn clear(&mut self) {
        self.key = None;
        self.method = None;
        self.rule = None;
    }
}

/// Render the human-readable match descriptor for a rule.
///
/// `DEFAULT` renders as its label, keyed matches as `[<key>] <method> [<rule>]`.
pub fn match_descriptor(match_object: MatchObject, fields: &MatchFields) -> String {
    if match_object.is_default() {
        return match_object.as_str().to_string();
    }

    format!(
        "[{}] {} [{}]",
        fields.key().unwrap_or_default(),
        fields.method.map(|method| method.description()).unwrap_or_default(),
        fields.rule().unwrap_or_default()
    )
}

fn validate_application_id(id: &ApplicationId) -> Result<(), ValidationError> {
    if id.is_valid() {
        Ok(())
    } else {
        let mut error = ValidationError::new("application_id");
        error.message = Some("Application ID must be a positive integer".into());
        Err(error)
    }
}

/// A proposed rule as submitted by an administrator.
///
/// Validation may rewrite the match fields (see `services::rule_validator`), so
/// callers must treat the input as mutated once it has been validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RuleInput {
    #[validate(length(min = 1, max = 64, message = "Rule name must be 1-64 characters"))]
    pub name: String,

    #[validate(custom(function = "validate_application_id"))]
    pub application_id: ApplicationId,

    #[validate(length(min = 1, max = 64, message = "Version must be 1-64 characters"))]
    pub version: String,

    pub enabled: bool,

    #[serde(default)]
    pub match_object: MatchObject,

    #[serde(flatten)]
    pub match_fields: MatchFields,
}

impl RuleInput {
    /// An input matching all traffic for the application
    pub fn new_default(
        name: impl Into<String>,
        application_id: ApplicationId,
        version: impl Into<String>,
        enabled: bool,
    ) -> Self {
        Self {
            name: name.into(),
            application_id,
            version: version.into(),
            enabled,
            match_object: MatchObject::Default,
            match_fields: MatchFields::default(),
        }
    }

    /// Builder-style helper to turn the input into a keyed match
    pub fn with_match(mut self, match_object: MatchObject, fields: MatchFields) -> Self {
        self.match_object = match_object;
        self.match_fields = fields;
        self
    }

    /// Map the input onto the record to persist, stamping its creation time.
    pub fn into_new_rule(self, created_at: DateTime<Utc>) -> NewRouteRule {
        NewRouteRule {
            name: self.name,
            application_id: self.application_id,
            version: self.version,
            enabled: self.enabled,
            match_object: self.match_object,
            match_fields: self.match_fields,
            created_at,
        }
    }
}

/// A validated rule ready to be inserted; the store assigns its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRouteRule {
    pub name: String,
    pub application_id: ApplicationId,
    pub version: String,
    pub enabled: bool,
    pub match_object: MatchObject,
    pub match_fields: MatchFields,
    pub created_at: DateTime<Utc>,
}

impl NewRouteRule {
    /// Attach the store-assigned id
    pub fn with_id(self, id: RuleId) -> RouteRule {
        RouteRule {
            id,
            name: self.name,
            application_id: self.application_id,
            version: self.version,
            enabled: self.enabled,
            match_object: self.match_object,
            match_fields: self.match_fields,
            created_at: self.created_at,
        }
    }
}

/// A persisted route rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRule {
    pub id: RuleId,
    pub name: String,
    pub application_id: ApplicationId,
    pub version: String,
    pub enabled: bool,
    pub match_object: MatchObject,
    #[serde(flatten)]
    pub match_fields: MatchFields,
    pub created_at: DateTime<Utc>,
}

impl RouteRule {
    pub fn match_descriptor(&self) -> String {
        match_descriptor(self.match_object, &self.match_fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_match_object_round_trip() {
        for object in [MatchObject::Default, MatchObject::Header, MatchObject::Query] {
            assert_eq!(object.as_str().parse::<MatchObject>().unwrap(), object);
        }
        assert_eq!("header".parse::<MatchObject>().unwrap(), MatchObject::Header);
        assert!("cookie".parse::<MatchObject>().is_err());
    }

    #[test]
    fn test_match_method_parse() {
        assert_eq!("equals".parse::<MatchMethod>().unwrap(), MatchMethod::Equals);
        assert_eq!("REGEX".parse::<MatchMethod>().unwrap(), MatchMethod::Regex);
        assert!("between".parse::<MatchMethod>().is_err());
    }

    #[test]
    fn test_default_descriptor_is_label() {
        let fields = MatchFields::new("X-Token", MatchMethod::Equals, "abc");
        assert_eq!(match_descriptor(MatchObject::Default, &fields), "DEFAULT");
    }

    #[test]
    fn test_keyed_descriptor() {
        let fields = MatchFields::new("X-Token", MatchMethod::Equals, "abc");
        assert_eq!(match_descriptor(MatchObject::Header, &fields), "[X-Token] equals [abc]");

        let fields = MatchFields::new("region", MatchMethod::Prefix, "eu-");
        assert_eq!(match_descriptor(MatchObject::Query, &fields), "[region] starts with [eu-]");
    }

    #[test]
    fn test_empty_strings_count_as_absent() {
        let fields = MatchFields {
            key: Some(String::new()),
            method: Some(MatchMethod::Equals),
            rule: Some("abc".to_string()),
        };
        assert!(!fields.all_present());
        assert!(!fields.all_absent());
        assert_eq!(fields.missing(), MissingFields { key: true, method: false, rule: false });
    }

    #[test]
    fn test_clear() {
        let mut fields = MatchFields::new("X-Token", MatchMethod::Equals, "abc");
        fields.clear();
        assert!(fields.all_absent());
        assert_eq!(fields, MatchFields::default());
    }

    #[test]
    fn test_input_validation() {
        let input = RuleInput::new_default("", ApplicationId::new(1), "v1", true);
        assert!(input.validate().is_err());

        let input = RuleInput::new_default("r1", ApplicationId::new(0), "v1", true);
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("application_id"));

        let input = RuleInput::new_default("r1", ApplicationId::new(1), "v1", true);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_input_maps_onto_persisted_rule() {
        let created_at = Utc::now();
        let input = RuleInput::new_default("r1", ApplicationId::new(3), "v1", false).with_match(
            MatchObject::Header,
            MatchFields::new("X-Token", MatchMethod::Equals, "abc"),
        );

        let rule = input.clone().into_new_rule(created_at).with_id(RuleId::new(11));
        assert_eq!(rule.id, RuleId::new(11));
        assert_eq!(rule.name, input.name);
        assert_eq!(rule.application_id, input.application_id);
        assert_eq!(rule.match_fields, input.match_fields);
        assert_eq!(rule.created_at, created_at);
        assert!(!rule.enabled);
    }

    #[test]
    fn test_rule_json_shape() {
        let rule = RuleInput::new_default("r1", ApplicationId::new(1), "v1", true)
            .into_new_rule(Utc::now())
            .with_id(RuleId::new(5));
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["applicationId"], 1);
        assert_eq!(json["matchObject"], "DEFAULT");
        assert!(json["matchKey"].is_null());
    }

    fn arb_field() -> impl Strategy<Value = Option<String>> {
        prop_oneof![Just(None), Just(Some(String::new())), "[a-zA-Z0-9-]{1,12}".prop_map(Some)]
    }

    fn arb_method() -> impl Strategy<Value = Option<MatchMethod>> {
        prop_oneof![
            Just(None),
            Just(Some(MatchMethod::Equals)),
            Just(Some(MatchMethod::Regex)),
            Just(Some(MatchMethod::Contains)),
        ]
    }

    proptest! {
        #[test]
        fn prop_present_and_absent_are_exclusive(
            key in arb_field(),
            method in arb_method(),
            rule in arb_field(),
        ) {
            let fields = MatchFields { key, method, rule };
            prop_assert!(!(fields.all_present() && fields.all_absent()));
            prop_assert_eq!(fields.all_present(), !fields.missing().any());
        }
    }
}
