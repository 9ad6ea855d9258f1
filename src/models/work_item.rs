use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::{Priority, Status};

/// A deliverable tracked through two independent axes: `status` and `phase`.
///
/// Status moves through the state machine; phase moves only through explicit
/// phase-advance requests. A phase that is too early blocks status changes,
/// but no status change ever moves the phase (unless auto-advance is switched
/// on in the engine configuration).
///
/// # Lifecycle
/// Work items are created in `Draft` with no phase. Continuous types
/// (see [`WorkItemType::is_continuous`]) never reach `Done`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: Uuid,
    pub project_id: Uuid,
    /// Parent work item for hierarchies. `None` for top-level items.
    pub parent_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub item_type: WorkItemType,
    pub status: Status,
    pub phase: Option<Phase>,
    pub priority: Priority,
    /// Estimated effort in hours.
    pub effort_estimate: Option<f64>,
    /// Free-form metadata. Keys are exposed to rules as `work_item.metadata.<key>`.
    pub metadata: serde_json::Value,
    /// Optimistic concurrency counter, bumped on every write.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkItem {
    pub fn is_continuous(&self) -> bool {
        self.item_type.is_continuous()
    }
}

/// The kind of deliverable a work item represents.
///
/// The type selects the phase sequence, the required task types and which
/// rules apply.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WorkItemType {
    Feature,
    Enhancement,
    Bugfix,
    Research,
    Planning,
    Refactoring,
    Maintenance,
    Monitoring,
    Documentation,
    Security,
    FixBacklog,
}

impl WorkItemType {
    pub const ALL: [WorkItemType; 11] = [
        WorkItemType::Feature,
        WorkItemType::Enhancement,
        WorkItemType::Bugfix,
        WorkItemType::Research,
        WorkItemType::Planning,
        WorkItemType::Refactoring,
        WorkItemType::Maintenance,
        WorkItemType::Monitoring,
        WorkItemType::Documentation,
        WorkItemType::Security,
        WorkItemType::FixBacklog,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Feature => "feature",
            Self::Enhancement => "enhancement",
            Self::Bugfix => "bugfix",
            Self::Research => "research",
            Self::Planning => "planning",
            Self::Refactoring => "refactoring",
            Self::Maintenance => "maintenance",
            Self::Monitoring => "monitoring",
            Self::Documentation => "documentation",
            Self::Security => "security",
            Self::FixBacklog => "fix_backlog",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "feature" => Some(Self::Feature),
            "enhancement" => Some(Self::Enhancement),
            "bugfix" => Some(Self::Bugfix),
            "research" => Some(Self::Research),
            "planning" => Some(Self::Planning),
            "refactoring" => Some(Self::Refactoring),
            "maintenance" => Some(Self::Maintenance),
            "monitoring" => Some(Self::Monitoring),
            "documentation" => Some(Self::Documentation),
            "security" => Some(Self::Security),
            "fix_backlog" => Some(Self::FixBacklog),
            _ => None,
        }
    }

    /// Continuous work is an ongoing backlog and is never completed.
    pub fn is_continuous(&self) -> bool {
        matches!(
            self,
            Self::Maintenance
                | Self::Monitoring
                | Self::Documentation
                | Self::Security
                | Self::FixBacklog
        )
    }
}

impl fmt::Display for WorkItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The secondary lifecycle axis used for routing and gating.
///
/// Variants are declared in canonical order; [`Phase::level`] is the position
/// in that order and is what the gate compares against.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    D1Discovery,
    P1Plan,
    I1Implementation,
    R1Review,
    O1Operations,
    E1Evolution,
}

impl Phase {
    pub const ALL: [Phase; 6] = [
        Phase::D1Discovery,
        Phase::P1Plan,
        Phase::I1Implementation,
        Phase::R1Review,
        Phase::O1Operations,
        Phase::E1Evolution,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::D1Discovery => "D1_DISCOVERY",
            Self::P1Plan => "P1_PLAN",
            Self::I1Implementation => "I1_IMPLEMENTATION",
            Self::R1Review => "R1_REVIEW",
            Self::O1Operations => "O1_OPERATIONS",
            Self::E1Evolution => "E1_EVOLUTION",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "D1_DISCOVERY" => Some(Self::D1Discovery),
            "P1_PLAN" => Some(Self::P1Plan),
            "I1_IMPLEMENTATION" => Some(Self::I1Implementation),
            "R1_REVIEW" => Some(Self::R1Review),
            "O1_OPERATIONS" => Some(Self::O1Operations),
            "E1_EVOLUTION" => Some(Self::E1Evolution),
            _ => None,
        }
    }

    pub fn level(&self) -> u8 {
        *self as u8
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input for creating a new work item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWorkItemInput {
    /// Parent work item for nesting. Must belong to the same project.
    pub parent_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub item_type: WorkItemType,
    /// Defaults to `Medium` if not specified.
    pub priority: Option<Priority>,
    pub effort_estimate: Option<f64>,
    /// Defaults to an empty object.
    pub metadata: Option<serde_json::Value>,
}

/// Input for updating a work item's descriptive fields.
///
/// Status and phase are deliberately absent: they only change through the
/// engine's transition and phase-advance requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateWorkItemInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub effort_estimate: Option<f64>,
    pub metadata: Option<serde_json::Value>,
}
