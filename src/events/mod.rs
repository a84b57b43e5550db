//! # Rule Change Events
//!
//! Typed activation/deactivation notifications that keep a downstream route
//! cache in step with the durable rule store.

pub mod channel;
pub mod types;

pub use channel::{RuleEventBroadcaster, RuleEventPublisher, DEFAULT_EVENT_BUFFER_SIZE};
pub use types::{RuleChangeEvent, RuleEventKind, RuleWithAppName};
