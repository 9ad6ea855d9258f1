use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rules::Preset;

/// A project containing work items and the rules that govern them.
///
/// Projects are the top-level organizational unit. Each project is seeded with
/// a rule set from one of the catalog presets when it is initialized; after
/// that its rules live in the store and can be toggled individually.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// The preset the project's rules were seeded from.
    pub rule_preset: Preset,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProjectInput {
    pub name: String,
    pub description: Option<String>,
    /// Rule preset to seed. Defaults to [`Preset::Standard`].
    #[serde(default)]
    pub rule_preset: Option<Preset>,
}

/// Input for updating an existing project. All fields are optional for partial updates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProjectInput {
    pub name: Option<String>,
    pub description: Option<String>,
}
