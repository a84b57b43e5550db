//! Change event channel
//!
//! The lifecycle service publishes through the [`RuleEventPublisher`] seam. The
//! stock implementation, [`RuleEventBroadcaster`], fans events out over a
//! single `tokio::sync::broadcast` channel. Every subscriber sees events in
//! publish order, so an `Activated` event for a rule is never observed after a
//! `Deactivated` event that was published later.
//!
//! Publishing is synchronous and never blocks: `send` only enqueues. A
//! subscriber that falls more than the buffer size behind receives
//! `RecvError::Lagged` and is expected to reload the enabled-rule snapshot.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

use super::types::RuleChangeEvent;
use crate::config::EventChannelConfig;
use crate::observability::metrics;

/// Default buffer size for the broadcast channel
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 1024;

/// Sink for rule change events.
pub trait RuleEventPublisher: Send + Sync {
    /// Deliver `event` to current subscribers, returning how many received it.
    ///
    /// Having no subscribers is not an error.
    fn publish(&self, event: RuleChangeEvent) -> usize;
}

/// Broadcast-backed publisher shared by the service and its subscribers.
#[derive(Clone)]
pub struct RuleEventBroadcaster {
    sender: broadcast::Sender<RuleChangeEvent>,
}

impl RuleEventBroadcaster {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Create a broadcaster with a custom buffer size (minimum 1)
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn from_config(config: &EventChannelConfig) -> Self {
        Self::with_capacity(config.buffer_size)
    }

    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Subscribe to events published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<RuleChangeEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for RuleEventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RuleEventBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleEventBroadcaster")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

impl RuleEventPublisher for RuleEventBroadcaster {
    fn publish(&self, event: RuleChangeEvent) -> usize {
        let kind = event.kind();
        let rule_id = event.rule_id();
        let delivered = self.sender.send(event).unwrap_or_default();

        metrics::record_event_published(kind);
        debug!(
            rule_id = %rule_id,
            kind = %kind,
            subscribers = delivered,
            "Published rule change event"
        );

        delivered
    }
}
