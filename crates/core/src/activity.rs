use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::entity::EntityType;
use crate::domain::request::FinalStatus;

/// Entity kind reported for every event this engine emits.
pub const ENTITY_KIND_APPROVAL_REQUEST: &str = "approval_request";

/// Fire-and-forget notification payload. Emitted once on request creation
/// (no statuses) and once per decision (with the status movement).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityEvent {
    pub event_id: String,
    pub entity_kind: String,
    pub entity_id: String,
    pub label: String,
    pub from_status: Option<FinalStatus>,
    pub to_status: Option<FinalStatus>,
    pub occurred_at: DateTime<Utc>,
}

impl ActivityEvent {
    pub fn created(entity_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            entity_kind: ENTITY_KIND_APPROVAL_REQUEST.to_string(),
            entity_id: entity_id.into(),
            label: label.into(),
            from_status: None,
            to_status: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn status_changed(
        entity_id: impl Into<String>,
        label: impl Into<String>,
        from_status: FinalStatus,
        to_status: FinalStatus,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            entity_kind: ENTITY_KIND_APPROVAL_REQUEST.to_string(),
            entity_id: entity_id.into(),
            label: label.into(),
            from_status: Some(from_status),
            to_status: Some(to_status),
            occurred_at: Utc::now(),
        }
    }
}

/// Sink for activity events. Implementations must absorb their own
/// failures: the engine never waits on, retries, or branches on a
/// notification outcome, and a failed notification must not roll back the
/// decision that produced it.
pub trait ActivityNotifier: Send + Sync {
    fn notify(&self, event: ActivityEvent);
}

#[derive(Clone, Default)]
pub struct InMemoryActivityNotifier {
    events: Arc<Mutex<Vec<ActivityEvent>>>,
}

impl InMemoryActivityNotifier {
    pub fn events(&self) -> Vec<ActivityEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ActivityNotifier for InMemoryActivityNotifier {
    fn notify(&self, event: ActivityEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

/// Human-readable label rendering for activity events.
///
/// Built once at startup; hosts can override the noun used for an entity
/// type without touching the core.
#[derive(Clone, Debug, Default)]
pub struct LabelCatalog {
    nouns: HashMap<String, String>,
}

impl LabelCatalog {
    pub fn with_noun(mut self, entity_type: EntityType, noun: impl Into<String>) -> Self {
        self.nouns.insert(entity_type.as_str().to_string(), noun.into());
        self
    }

    pub fn label(&self, entity_type: &EntityType, entity_id: &str, amount: Decimal) -> String {
        let noun = self
            .nouns
            .get(entity_type.as_str())
            .map(String::as_str)
            .unwrap_or_else(|| entity_type.as_str());
        format!("{noun} {entity_id} ({amount})")
    }
}
