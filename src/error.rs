//! Error types for the engine.
//!
//! Every refusal is a variant with enough structure for a caller to explain it,
//! and each variant has a stable code for programmatic handling.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::{GateBlock, PhaseRejection};
use crate::models::{EntityKind, Phase, RuleViolation, Status, WorkItemType};

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Library-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid {kind} transition: {from} -> {to}")]
    InvalidTransition {
        kind: EntityKind,
        from: Status,
        to: Status,
    },

    #[error("{kind} is already {status}")]
    NoOpTransition { kind: EntityKind, status: Status },

    /// Structural refusals carry every block and rule violation the gate
    /// found, not only the one that decides the error code.
    #[error("Phase incomplete: {to} requires phase {required}, current phase is {}", display_phase(.current))]
    PhaseIncomplete {
        to: Status,
        required: Phase,
        current: Option<Phase>,
        blocks: Vec<GateBlock>,
        violations: Vec<RuleViolation>,
    },

    #[error("Invalid phase progression for {item_type} from {} to {requested}: {reason}", display_phase(.current))]
    InvalidPhaseProgression {
        item_type: WorkItemType,
        current: Option<Phase>,
        requested: Phase,
        reason: PhaseRejection,
    },

    #[error("Continuous work item {id} can never reach done")]
    ContinuousCompletion {
        id: Uuid,
        blocks: Vec<GateBlock>,
        violations: Vec<RuleViolation>,
    },

    #[error(
        "{kind} {id} cannot start: {} pending dependencies, {} open blockers",
        .pending_dependencies.len(),
        .open_blockers.len()
    )]
    DependenciesUnmet {
        kind: EntityKind,
        id: Uuid,
        pending_dependencies: Vec<Uuid>,
        open_blockers: Vec<Uuid>,
        blocks: Vec<GateBlock>,
        violations: Vec<RuleViolation>,
    },

    #[error("Blocked by {} rule violation(s): {}", count_blocking(.0), summarize(.0))]
    RuleViolationBlocking(Vec<RuleViolation>),

    #[error("Adding dependency {from} -> {to} would create a cycle")]
    CyclicDependency { from: Uuid, to: Uuid },

    #[error("Concurrent modification of {0}, retry the operation")]
    ConcurrentModification(String),

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get the error code for this error type
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidTransition { .. } => "INVALID_TRANSITION",
            Error::NoOpTransition { .. } => "NO_OP_TRANSITION",
            Error::PhaseIncomplete { .. } => "PHASE_INCOMPLETE",
            Error::InvalidPhaseProgression { .. } => "INVALID_PHASE_PROGRESSION",
            Error::ContinuousCompletion { .. } => "CONTINUOUS_COMPLETION",
            Error::DependenciesUnmet { .. } => "DEPENDENCIES_UNMET",
            Error::RuleViolationBlocking(_) => "RULE_VIOLATION_BLOCKING",
            Error::CyclicDependency { .. } => "CYCLIC_DEPENDENCY",
            Error::ConcurrentModification(_) => "CONCURRENT_MODIFICATION",
            Error::NotFound(_) => "NOT_FOUND",
            Error::InvalidInput(_) => "INVALID_INPUT",
            Error::Database(_) => "DATABASE_ERROR",
            Error::Json(_) => "JSON_ERROR",
            Error::Io(_) => "IO_ERROR",
        }
    }

    /// Whether the caller may simply retry the same request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::ConcurrentModification(_))
    }

    /// Rule outcomes carried by the error, if any.
    pub fn violations(&self) -> &[RuleViolation] {
        match self {
            Error::RuleViolationBlocking(violations)
            | Error::PhaseIncomplete { violations, .. }
            | Error::ContinuousCompletion { violations, .. }
            | Error::DependenciesUnmet { violations, .. } => violations,
            _ => &[],
        }
    }

    /// Structural gate blocks carried by the error, if any.
    pub fn blocks(&self) -> &[GateBlock] {
        match self {
            Error::PhaseIncomplete { blocks, .. }
            | Error::ContinuousCompletion { blocks, .. }
            | Error::DependenciesUnmet { blocks, .. } => blocks,
            _ => &[],
        }
    }

    pub(crate) fn not_found(kind: impl std::fmt::Display, id: Uuid) -> Self {
        Error::NotFound(format!("{} {}", kind, id))
    }

    pub(crate) fn conflict(kind: EntityKind, id: Uuid) -> Self {
        Error::ConcurrentModification(format!("{} {}", kind, id))
    }
}

fn display_phase(phase: &Option<Phase>) -> String {
    phase
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "none".to_string())
}

fn count_blocking(violations: &[RuleViolation]) -> usize {
    violations.iter().filter(|v| v.is_blocking()).count()
}

fn summarize(violations: &[RuleViolation]) -> String {
    violations
        .iter()
        .filter(|v| v.is_blocking())
        .map(|v| format!("{} {}", v.rule_code, v.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Structured result handed back to the command surface.
///
/// Successful operations may still carry advisory (non-blocking) violations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<GateBlock>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<RuleViolation>,
}

impl OperationOutcome {
    pub fn succeeded(violations: Vec<RuleViolation>) -> Self {
        Self {
            success: true,
            code: None,
            reason: None,
            blocks: Vec::new(),
            violations,
        }
    }

    pub fn failed(error: &Error) -> Self {
        Self {
            success: false,
            code: Some(error.code().to_string()),
            reason: Some(error.to_string()),
            blocks: error.blocks().to_vec(),
            violations: error.violations().to_vec(),
        }
    }

    /// Build an outcome from any engine result whose success value exposes advisories.
    pub fn from_result<T: HasAdvisories>(result: &Result<T>) -> Self {
        match result {
            Ok(value) => Self::succeeded(value.advisories().to_vec()),
            Err(e) => Self::failed(e),
        }
    }
}

/// Success values that may carry non-blocking rule violations.
pub trait HasAdvisories {
    fn advisories(&self) -> &[RuleViolation] {
        &[]
    }
}

impl HasAdvisories for () {}
impl HasAdvisories for bool {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Enforcement;

    fn violation(code: &str, enforcement: Enforcement) -> RuleViolation {
        RuleViolation {
            rule_code: code.to_string(),
            rule_name: "test".to_string(),
            category: "test".to_string(),
            enforcement,
            message: format!("{} failed", code),
            detail: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_error_codes() {
        let id = Uuid::new_v4();
        assert_eq!(
            Error::InvalidTransition {
                kind: EntityKind::Task,
                from: Status::Draft,
                to: Status::Done
            }
            .code(),
            "INVALID_TRANSITION"
        );
        assert_eq!(
            Error::NoOpTransition {
                kind: EntityKind::Task,
                status: Status::Draft
            }
            .code(),
            "NO_OP_TRANSITION"
        );
        assert_eq!(
            Error::ContinuousCompletion {
                id,
                blocks: vec![GateBlock::ContinuousCompletion],
                violations: vec![],
            }
            .code(),
            "CONTINUOUS_COMPLETION"
        );
        assert_eq!(
            Error::CyclicDependency { from: id, to: id }.code(),
            "CYCLIC_DEPENDENCY"
        );
        assert_eq!(Error::NotFound("x".into()).code(), "NOT_FOUND");
    }

    #[test]
    fn test_only_concurrent_modification_is_retryable() {
        assert!(Error::ConcurrentModification("task 1".into()).is_retryable());
        assert!(!Error::NotFound("x".into()).is_retryable());
    }

    #[test]
    fn test_phase_incomplete_message_names_phases() {
        let err = Error::PhaseIncomplete {
            to: Status::Active,
            required: Phase::P1Plan,
            current: Some(Phase::D1Discovery),
            blocks: vec![],
            violations: vec![],
        };
        let msg = err.to_string();
        assert!(msg.contains("P1_PLAN"));
        assert!(msg.contains("D1_DISCOVERY"));

        let err = Error::PhaseIncomplete {
            to: Status::Ready,
            required: Phase::D1Discovery,
            current: None,
            blocks: vec![],
            violations: vec![],
        };
        assert!(err.to_string().contains("none"));
    }

    #[test]
    fn test_blocking_message_lists_only_blocking_rules() {
        let err = Error::RuleViolationBlocking(vec![
            violation("TIME-001", Enforcement::Block),
            violation("DOC-001", Enforcement::Limit),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("1 rule violation"));
        assert!(msg.contains("TIME-001"));
        assert!(!msg.contains("DOC-001"));
        assert_eq!(err.violations().len(), 2);
    }

    #[test]
    fn test_outcome_from_failure_carries_violations() {
        let err = Error::RuleViolationBlocking(vec![violation("WF-001", Enforcement::Block)]);
        let outcome = OperationOutcome::failed(&err);
        assert!(!outcome.success);
        assert_eq!(outcome.code.as_deref(), Some("RULE_VIOLATION_BLOCKING"));
        assert_eq!(outcome.violations.len(), 1);
    }

    #[test]
    fn test_structural_failure_reports_rule_violations_too() {
        let block = GateBlock::PhaseIncomplete {
            required: Phase::P1Plan,
            current: Some(Phase::D1Discovery),
        };
        let err = Error::PhaseIncomplete {
            to: Status::Active,
            required: Phase::P1Plan,
            current: Some(Phase::D1Discovery),
            blocks: vec![block.clone()],
            violations: vec![violation("WF-001", Enforcement::Block)],
        };

        let outcome = OperationOutcome::failed(&err);
        assert_eq!(outcome.code.as_deref(), Some("PHASE_INCOMPLETE"));
        assert_eq!(outcome.blocks, vec![block]);
        assert_eq!(outcome.violations[0].rule_code, "WF-001");

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["blocks"][0]["kind"], "phase_incomplete");
    }

    #[test]
    fn test_outcome_from_success() {
        let result: Result<()> = Ok(());
        let outcome = OperationOutcome::from_result(&result);
        assert!(outcome.success);
        assert!(outcome.reason.is_none());

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json, serde_json::json!({ "success": true }));
    }
}
