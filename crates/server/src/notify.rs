use fieldgate_core::activity::{ActivityEvent, ActivityNotifier};
use tracing::info;

/// Activity sink that forwards events to the host platform's activity feed
/// as structured tracing records. Emission cannot fail; if a downstream
/// subscriber drops the event, the decision that produced it is unaffected.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingActivityNotifier;

impl ActivityNotifier for TracingActivityNotifier {
    fn notify(&self, event: ActivityEvent) {
        info!(
            event_name = "activity.notified",
            entity_kind = %event.entity_kind,
            entity_id = %event.entity_id,
            label = %event.label,
            from_status = event.from_status.map(|status| status.as_str()).unwrap_or("-"),
            to_status = event.to_status.map(|status| status.as_str()).unwrap_or("-"),
            "activity event emitted"
        );
    }
}
