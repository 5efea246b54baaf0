use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::room::RoomId;
use crate::errors::StoreError;

/// Where an audited request was stopped or applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditCategory {
    /// Turned away at the auth gate; no listing was looked at.
    Ingress,
    Listing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditOutcome {
    Success,
    Rejected,
    Failed,
}

/// A listing mutation that went through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListingChange {
    Added,
    Edited,
    Deleted,
}

impl ListingChange {
    pub fn event_type(self) -> &'static str {
        match self {
            Self::Added => "room.added",
            Self::Edited => "room.edited",
            Self::Deleted => "room.deleted",
        }
    }
}

/// One entry in the listing trail. `actor` is the caller identity, or `unknown` when a
/// rejected request never named one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: String,
    pub room_id: Option<RoomId>,
    pub correlation_id: String,
    pub event_type: String,
    pub category: AuditCategory,
    pub actor: String,
    pub outcome: AuditOutcome,
    pub metadata: BTreeMap<String, String>,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEvent {
    /// A room was added, edited or deleted through `tool_intent`.
    pub fn listing_changed(
        change: ListingChange,
        room_id: RoomId,
        actor: impl Into<String>,
        correlation_id: impl Into<String>,
        tool_intent: &str,
    ) -> Self {
        Self::recorded(change.event_type(), AuditCategory::Listing, actor, correlation_id)
            .for_room(Some(room_id))
            .with_metadata("tool_intent", tool_intent)
    }

    /// The store turned a request down. Refusals the caller can fix are `Rejected`; an
    /// unreachable store is `Failed`. A forbidden room keeps its id on the event.
    pub fn listing_refused(
        tool_intent: &str,
        failure: &StoreError,
        actor: impl Into<String>,
        correlation_id: impl Into<String>,
    ) -> Self {
        let room_id = match failure {
            StoreError::Forbidden { id } => Some(*id),
            _ => None,
        };
        let outcome =
            if failure.is_caller_fault() { AuditOutcome::Rejected } else { AuditOutcome::Failed };

        let mut event = Self::recorded(
            format!("{tool_intent}.failed"),
            AuditCategory::Listing,
            actor,
            correlation_id,
        )
        .for_room(room_id)
        .with_metadata("error", failure.to_string());
        event.outcome = outcome;
        event
    }

    pub fn auth_rejected(
        tool: &str,
        claimed_identity: Option<&str>,
        correlation_id: impl Into<String>,
    ) -> Self {
        let mut event = Self::recorded(
            "mcp.auth.rejected",
            AuditCategory::Ingress,
            claimed_identity.unwrap_or("unknown"),
            correlation_id,
        )
        .with_metadata("tool", tool);
        event.outcome = AuditOutcome::Rejected;
        event
    }

    fn recorded(
        event_type: impl Into<String>,
        category: AuditCategory,
        actor: impl Into<String>,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            room_id: None,
            correlation_id: correlation_id.into(),
            event_type: event_type.into(),
            category,
            actor: actor.into(),
            outcome: AuditOutcome::Success,
            metadata: BTreeMap::new(),
            occurred_at: Utc::now(),
        }
    }

    fn for_room(mut self, room_id: Option<RoomId>) -> Self {
        self.room_id = room_id;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

pub trait AuditSink: Send + Sync {
    fn emit(&self, event: AuditEvent);
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn emit(&self, _event: AuditEvent) {}
}

/// Keeps events in memory, in emission order.
#[derive(Clone, Default)]
pub struct InMemoryAuditSink {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl InMemoryAuditSink {
    pub fn events(&self) -> Vec<AuditEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn event_types(&self) -> Vec<String> {
        self.events().into_iter().map(|event| event.event_type).collect()
    }

    /// Events that touched `room_id`, oldest first.
    pub fn trail_for(&self, room_id: RoomId) -> Vec<AuditEvent> {
        self.events().into_iter().filter(|event| event.room_id == Some(room_id)).collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn emit(&self, event: AuditEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
