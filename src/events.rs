//! Audit events for committed mutations.
//!
//! The engine collects events while an operation runs and hands them to the
//! sink only after the transaction commits, so a failed operation emits
//! nothing.

use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::models::EntityKind;

/// Anything an audit event can be about.
///
/// Wider than [`EntityKind`]: projects and rules change too, but carry no
/// status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AuditEntity {
    Project,
    Rule,
    WorkItem,
    Task,
}

impl AuditEntity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Project => "project",
            Self::Rule => "rule",
            Self::WorkItem => "work_item",
            Self::Task => "task",
        }
    }
}

impl From<EntityKind> for AuditEntity {
    fn from(kind: EntityKind) -> Self {
        match kind {
            EntityKind::WorkItem => Self::WorkItem,
            EntityKind::Task => Self::Task,
        }
    }
}

impl fmt::Display for AuditEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One change on one entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEvent {
    pub entity_kind: AuditEntity,
    pub entity_id: Uuid,
    /// `status`, `phase`, `created`, `fields`, `enabled`, `dependency`, ...
    pub field: String,
    pub from: Value,
    pub to: Value,
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    pub fn new(
        entity_kind: impl Into<AuditEntity>,
        entity_id: Uuid,
        field: &str,
        from: impl Into<Value>,
        to: impl Into<Value>,
    ) -> Self {
        Self {
            entity_kind: entity_kind.into(),
            entity_id,
            field: field.to_string(),
            from: from.into(),
            to: to.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Receives audit events after commit.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &AuditEvent);
}

/// Logs every event at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &AuditEvent) {
        tracing::info!(
            target: "workgate::audit",
            kind = %event.entity_kind,
            id = %event.entity_id,
            field = %event.field,
            from = %event.from,
            to = %event.to,
            "{} {} {} changed",
            event.entity_kind,
            event.entity_id,
            event.field
        );
    }
}

/// Keeps events in memory. Clones share the same buffer.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().expect("event buffer poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().expect("event buffer poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.events.lock().expect("event buffer poisoned").clear();
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: &AuditEvent) {
        self.events
            .lock()
            .expect("event buffer poisoned")
            .push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_clones_share_buffer() {
        let sink = MemorySink::new();
        let handle = sink.clone();
        let id = Uuid::new_v4();

        handle.emit(&AuditEvent::new(EntityKind::Task, id, "status", "draft", "ready"));

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].field, "status");
        assert_eq!(events[0].to, Value::from("ready"));

        sink.clear();
        assert!(handle.is_empty());
    }

    #[test]
    fn test_event_serializes_with_snake_case_kind() {
        let event = AuditEvent::new(EntityKind::WorkItem, Uuid::nil(), "phase", Value::Null, "D1_DISCOVERY");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["entity_kind"], "work_item");
        assert_eq!(json["from"], Value::Null);

        let event = AuditEvent::new(AuditEntity::Rule, Uuid::nil(), "enabled", true, false);
        assert_eq!(serde_json::to_value(&event).unwrap()["entity_kind"], "rule");
    }
}
