//! Domain layer
//!
//! Plain domain entities for the route-rule lifecycle with no dependency on the
//! storage engine or any transport.
//!
//! ## Module Organization
//!
//! - `id`: Type-safe identifiers with the NewType pattern
//! - `application`: Read-only application registry records
//! - `rule`: Route rules, match vocabulary and match-shape predicates

pub mod application;
pub mod id;
pub mod rule;

pub use application::{Application, ApplicationInstance};
pub use id::{ApplicationId, RuleId};
pub use rule::{
    match_descriptor, MatchFields, MatchMethod, MatchObject, NewRouteRule, RouteRule, RuleInput,
};
