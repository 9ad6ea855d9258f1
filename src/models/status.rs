use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of entity that carries a status.
///
/// Work items and tasks share the status vocabulary but each kind owns its own
/// transition table and its own dependency/blocker edges.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    WorkItem,
    Task,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WorkItem => "work_item",
            Self::Task => "task",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "work_item" => Some(Self::WorkItem),
            "task" => Some(Self::Task),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle status shared by work items and tasks.
///
/// - `Draft`: Created, not yet ready for work
/// - `Ready`: Defined well enough to start
/// - `Active`: Work in progress
/// - `Review`: Work finished, awaiting review
/// - `Done`: Accepted
/// - `Blocked`: Administrative hold, waiting on something external
/// - `Cancelled`: Abandoned
/// - `Archived`: Retained for audit only
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Draft,
    Ready,
    Active,
    Review,
    Done,
    Blocked,
    Cancelled,
    Archived,
}

impl Status {
    pub const ALL: [Status; 8] = [
        Status::Draft,
        Status::Ready,
        Status::Active,
        Status::Review,
        Status::Done,
        Status::Blocked,
        Status::Cancelled,
        Status::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Ready => "ready",
            Self::Active => "active",
            Self::Review => "review",
            Self::Done => "done",
            Self::Blocked => "blocked",
            Self::Cancelled => "cancelled",
            Self::Archived => "archived",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "ready" => Some(Self::Ready),
            "active" => Some(Self::Active),
            "review" => Some(Self::Review),
            "done" => Some(Self::Done),
            "blocked" => Some(Self::Blocked),
            "cancelled" => Some(Self::Cancelled),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Relative urgency of a work item or task.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "critical" => Some(Self::Critical),
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}
