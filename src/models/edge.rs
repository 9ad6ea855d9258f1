use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::EntityKind;

/// An ordering constraint: `entity_id` cannot start until `depends_on_id` is done.
///
/// Both ends are always of the same kind. The set of dependency edges per kind
/// is kept acyclic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dependency {
    pub entity_kind: EntityKind,
    pub entity_id: Uuid,
    pub depends_on_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// A blocking relationship: `entity_id` is blocked by `blocker_id`.
///
/// Blockers are removed only by an explicit resolve; the blocker's own status
/// never clears them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Blocker {
    pub entity_kind: EntityKind,
    pub entity_id: Uuid,
    pub blocker_id: Uuid,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Whether an entity may start, and what holds it back if not.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StartReadiness {
    /// Dependencies that have not reached `Done`.
    pub pending_dependencies: Vec<Uuid>,
    /// Blockers that have not been resolved.
    pub open_blockers: Vec<Uuid>,
}

impl StartReadiness {
    pub fn is_ready(&self) -> bool {
        self.pending_dependencies.is_empty() && self.open_blockers.is_empty()
    }
}
