use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rules::RuleLogic;

/// A declarative constraint, stored per project.
///
/// Rules are data: their check is an expression tree in `validation_logic`,
/// and thresholds and scope filters live in `config`. They are seeded from a
/// catalog preset when the project is initialized and afterwards are only read
/// from the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: Uuid,
    pub project_id: Uuid,
    /// Stable catalog identifier (e.g. `TIME-001`), unique within a project.
    pub code: String,
    pub name: String,
    pub description: String,
    /// Grouping label (e.g. `time_boxing`, `workflow`, `quality`).
    pub category: String,
    pub enforcement: Enforcement,
    pub enabled: bool,
    pub validation_logic: RuleLogic,
    /// Thresholds plus the optional scope keys `entity`, `types` and `on_status`.
    pub config: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// How a rule violation affects the operation that triggered it.
///
/// - `Block`: Hard stop, the operation is refused
/// - `Limit`: Warning, the operation proceeds
/// - `Guide`: Advisory
/// - `Enhance`: Contextual enrichment only
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Enforcement {
    Block,
    Limit,
    Guide,
    Enhance,
}

impl Enforcement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::Limit => "limit",
            Self::Guide => "guide",
            Self::Enhance => "enhance",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "block" => Some(Self::Block),
            "limit" => Some(Self::Limit),
            "guide" => Some(Self::Guide),
            "enhance" => Some(Self::Enhance),
            _ => None,
        }
    }

    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::Block)
    }
}

impl fmt::Display for Enforcement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single rule outcome reported by the gate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleViolation {
    pub rule_code: String,
    pub rule_name: String,
    pub category: String,
    pub enforcement: Enforcement,
    pub message: String,
    /// Evaluated `detail` expression, if the rule declares one.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub detail: serde_json::Value,
}

impl RuleViolation {
    pub fn is_blocking(&self) -> bool {
        self.enforcement.is_blocking()
    }
}

impl fmt::Display for RuleViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({}): {}",
            self.enforcement, self.rule_code, self.rule_name, self.message
        )
    }
}
