//! # Services
//!
//! Business logic for the route rule lifecycle: validation, the mutation
//! state machine with its change events, and the read queries.

pub mod rule_service;
pub mod rule_validator;
pub mod rule_view;

pub use rule_service::RuleService;
pub use rule_validator::{normalize_match_fields, validate_rule};
pub use rule_view::RuleView;
