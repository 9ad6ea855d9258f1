use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::{Priority, Status};

/// An atomic unit of work belonging to exactly one work item.
///
/// A task's status is tracked independently of its work item. The worker role
/// is filled in by auto-assignment when the task is created, based on its type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub work_item_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub task_type: TaskType,
    pub status: Status,
    /// Estimated effort in hours. Time-boxing rules cap this per task type.
    pub effort_hours: Option<f64>,
    pub priority: Priority,
    /// Worker role responsible for the task, if one could be resolved.
    pub assigned_role: Option<String>,
    /// Why the task is on hold. Only set while `status` is `Blocked`.
    pub blocked_reason: Option<String>,
    /// Optimistic concurrency counter, bumped on every write.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The kind of work a task represents.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Design,
    Implementation,
    Testing,
    Bugfix,
    Hotfix,
    Documentation,
    Review,
    Deployment,
    Analysis,
    Research,
    Refactoring,
    Simple,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Design => "design",
            Self::Implementation => "implementation",
            Self::Testing => "testing",
            Self::Bugfix => "bugfix",
            Self::Hotfix => "hotfix",
            Self::Documentation => "documentation",
            Self::Review => "review",
            Self::Deployment => "deployment",
            Self::Analysis => "analysis",
            Self::Research => "research",
            Self::Refactoring => "refactoring",
            Self::Simple => "simple",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "design" => Some(Self::Design),
            "implementation" => Some(Self::Implementation),
            "testing" => Some(Self::Testing),
            "bugfix" => Some(Self::Bugfix),
            "hotfix" => Some(Self::Hotfix),
            "documentation" => Some(Self::Documentation),
            "review" => Some(Self::Review),
            "deployment" => Some(Self::Deployment),
            "analysis" => Some(Self::Analysis),
            "research" => Some(Self::Research),
            "refactoring" => Some(Self::Refactoring),
            "simple" => Some(Self::Simple),
            _ => None,
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input for creating a new task within a work item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskInput {
    pub title: String,
    pub description: Option<String>,
    pub task_type: TaskType,
    pub effort_hours: Option<f64>,
    /// Defaults to `Medium` if not specified.
    pub priority: Option<Priority>,
    /// Explicit worker role. When `None`, auto-assignment picks one by type.
    pub assigned_role: Option<String>,
}

/// Input for updating a task's descriptive fields.
///
/// Status is changed only through transition requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTaskInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub effort_hours: Option<f64>,
    pub priority: Option<Priority>,
    pub assigned_role: Option<String>,
}
