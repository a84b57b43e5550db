//! # Metrics
//!
//! Rule lifecycle counters recorded through the `metrics` facade. They are
//! no-ops unless the embedding process installs a recorder.

use metrics::{counter, describe_counter, Unit};

use crate::events::RuleEventKind;

/// Register metric descriptions with the installed recorder
pub fn describe_rule_metrics() {
    describe_counter!(
        "rule_mutations_total",
        Unit::Count,
        "Route rule mutations by operation and outcome"
    );
    describe_counter!(
        "rule_events_published_total",
        Unit::Count,
        "Rule change events published by kind"
    );
}

/// Record the outcome of a mutating rule operation
pub fn record_rule_mutation(operation: &'static str, success: bool) {
    let outcome = if success { "success" } else { "error" };
    counter!("rule_mutations_total", "operation" => operation, "outcome" => outcome).increment(1);
}

/// Record a published change event
pub fn record_event_published(kind: RuleEventKind) {
    counter!("rule_events_published_total", "kind" => kind.as_str()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder() {
        describe_rule_metrics();
        record_rule_mutation("add", true);
        record_rule_mutation("delete", false);
        record_event_published(RuleEventKind::Activated);
    }
}
