//! Cross-checks a requested status against phase, dependencies and rules.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{EntityKind, Phase, RuleViolation, StartReadiness, Status, Task, WorkItem};
use crate::rules::{Facts, RuleSet};

/// The entity a gate check runs against, with the context its rules need.
#[derive(Debug, Clone, Copy)]
pub enum Subject<'a> {
    WorkItem {
        item: &'a WorkItem,
        tasks: &'a [Task],
    },
    Task {
        task: &'a Task,
        work_item: &'a WorkItem,
    },
}

impl Subject<'_> {
    pub fn kind(&self) -> EntityKind {
        match self {
            Subject::WorkItem { .. } => EntityKind::WorkItem,
            Subject::Task { .. } => EntityKind::Task,
        }
    }

    pub fn id(&self) -> uuid::Uuid {
        match self {
            Subject::WorkItem { item, .. } => item.id,
            Subject::Task { task, .. } => task.id,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Subject::WorkItem { item, .. } => item.item_type.as_str(),
            Subject::Task { task, .. } => task.task_type.as_str(),
        }
    }

    /// Attribute values rules can reference.
    ///
    /// A task's facts include its work item's top-level attributes.
    pub fn facts(&self) -> Facts {
        match self {
            Subject::WorkItem { item, tasks } => work_item_facts(item, tasks),
            Subject::Task { task, work_item } => {
                let mut facts = work_item_facts(work_item, &[]);
                facts.insert("task.type", task.task_type.as_str());
                facts.insert("task.title", task.title.as_str());
                facts.insert("task.description", task.description.clone());
                facts.insert("task.status", task.status.as_str());
                facts.insert("task.priority", task.priority.as_str());
                facts.insert("task.effort_hours", task.effort_hours);
                facts.insert("task.assigned_role", task.assigned_role.clone());
                facts
            }
        }
    }
}

fn work_item_facts(item: &WorkItem, tasks: &[Task]) -> Facts {
    let live: Vec<&Task> = tasks
        .iter()
        .filter(|t| !matches!(t.status, Status::Cancelled | Status::Archived))
        .collect();

    let mut task_types: Vec<&str> = live.iter().map(|t| t.task_type.as_str()).collect();
    task_types.sort_unstable();
    task_types.dedup();

    let open = live.iter().filter(|t| t.status != Status::Done).count();

    let mut facts = Facts::new()
        .with("work_item.type", item.item_type.as_str())
        .with("work_item.title", item.title.as_str())
        .with("work_item.description", item.description.clone())
        .with("work_item.status", item.status.as_str())
        .with("work_item.phase", item.phase.map(|p| p.as_str()))
        .with("work_item.priority", item.priority.as_str())
        .with("work_item.effort_estimate", item.effort_estimate)
        .with("work_item.task_types", task_types)
        .with("work_item.task_count", live.len())
        .with("work_item.open_task_count", open);
    facts.insert("work_item.metadata", item.metadata.clone());
    facts.insert_object("work_item.metadata", &item.metadata);
    facts
}

/// A structural refusal, independent of rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GateBlock {
    ContinuousCompletion,
    PhaseIncomplete {
        required: Phase,
        current: Option<Phase>,
    },
    DependenciesUnmet(StartReadiness),
}

/// Outcome of one gate check.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GateResult {
    pub allowed: bool,
    pub blocks: Vec<GateBlock>,
    /// Every rule violation, blocking ones first.
    pub violations: Vec<RuleViolation>,
}

impl GateResult {
    pub fn blocking_violations(&self) -> impl Iterator<Item = &RuleViolation> {
        self.violations.iter().filter(|v| v.is_blocking())
    }

    /// Turn the result into the error the caller sees, or the advisories on success.
    ///
    /// Structural blocks pick the error code: continuous completion, then
    /// phase, then dependencies, then blocking rules. Whichever wins, the error
    /// carries every block and every rule violation found.
    pub fn into_result(self, subject: &Subject<'_>, target: Status) -> Result<Vec<RuleViolation>> {
        let GateResult {
            allowed,
            blocks,
            violations,
        } = self;
        if allowed {
            return Ok(violations);
        }

        if blocks.contains(&GateBlock::ContinuousCompletion) {
            return Err(Error::ContinuousCompletion {
                id: subject.id(),
                blocks,
                violations,
            });
        }

        let phase = blocks.iter().find_map(|block| match block {
            GateBlock::PhaseIncomplete { required, current } => Some((*required, *current)),
            _ => None,
        });
        if let Some((required, current)) = phase {
            return Err(Error::PhaseIncomplete {
                to: target,
                required,
                current,
                blocks,
                violations,
            });
        }

        let readiness = blocks.iter().find_map(|block| match block {
            GateBlock::DependenciesUnmet(readiness) => Some(readiness.clone()),
            _ => None,
        });
        if let Some(readiness) = readiness {
            return Err(Error::DependenciesUnmet {
                kind: subject.kind(),
                id: subject.id(),
                pending_dependencies: readiness.pending_dependencies,
                open_blockers: readiness.open_blockers,
                blocks,
                violations,
            });
        }

        Err(Error::RuleViolationBlocking(violations))
    }
}

/// Lowest phase a work item must have reached before entering `target`.
pub fn required_phase(target: Status) -> Option<Phase> {
    match target {
        Status::Ready => Some(Phase::D1Discovery),
        Status::Active => Some(Phase::P1Plan),
        Status::Review => Some(Phase::I1Implementation),
        Status::Done => Some(Phase::R1Review),
        _ => None,
    }
}

/// Whether `current` satisfies the minimum phase for `target`.
pub fn phase_sufficient(target: Status, current: Option<Phase>) -> bool {
    match required_phase(target) {
        None => true,
        Some(required) => current.is_some_and(|p| p.level() >= required.level()),
    }
}

/// Evaluate every check for moving `subject` to `target`.
///
/// All checks run; nothing short-circuits, so the result lists every reason
/// the request would fail.
pub fn validate_gate(
    subject: &Subject<'_>,
    target: Status,
    readiness: &StartReadiness,
    rules: &RuleSet,
) -> GateResult {
    let mut blocks = Vec::new();

    if let Subject::WorkItem { item, .. } = subject {
        if item.is_continuous() && target == Status::Done {
            blocks.push(GateBlock::ContinuousCompletion);
        }
        if !phase_sufficient(target, item.phase) {
            if let Some(required) = required_phase(target) {
                blocks.push(GateBlock::PhaseIncomplete {
                    required,
                    current: item.phase,
                });
            }
        }
    }

    if target == Status::Active && !readiness.is_ready() {
        blocks.push(GateBlock::DependenciesUnmet(readiness.clone()));
    }

    let facts = subject.facts();
    let violations = rules.evaluate(subject.kind(), subject.type_name(), target, &facts);
    let allowed = blocks.is_empty() && !violations.iter().any(|v| v.is_blocking());

    tracing::debug!(
        kind = %subject.kind(),
        id = %subject.id(),
        target = %target,
        allowed,
        blocks = blocks.len(),
        violations = violations.len(),
        "Gate evaluated"
    );

    GateResult {
        allowed,
        blocks,
        violations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Enforcement, Priority, Rule, TaskType, WorkItemType};
    use crate::rules::{preset_rules, Preset, RuleDefinition};
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn work_item(item_type: WorkItemType, phase: Option<Phase>) -> WorkItem {
        WorkItem {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            parent_id: None,
            title: "Item".into(),
            description: Some("Something".into()),
            item_type,
            status: Status::Draft,
            phase,
            priority: Priority::Medium,
            effort_estimate: Some(10.0),
            metadata: json!({}),
            version: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn task(task_type: TaskType, hours: Option<f64>) -> Task {
        Task {
            id: Uuid::new_v4(),
            work_item_id: Uuid::new_v4(),
            title: "Task".into(),
            description: None,
            task_type,
            status: Status::Draft,
            effort_hours: hours,
            priority: Priority::Medium,
            assigned_role: None,
            blocked_reason: None,
            version: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn rules(preset: Preset) -> RuleSet {
        let to_rule = |def: &RuleDefinition| Rule {
            id: Uuid::new_v4(),
            project_id: Uuid::nil(),
            code: def.code.to_string(),
            name: def.name.to_string(),
            description: def.description.to_string(),
            category: def.category.to_string(),
            enforcement: def.enforcement,
            enabled: true,
            validation_logic: def.logic.clone(),
            config: def.config.clone(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        RuleSet::new(preset_rules(preset).iter().map(to_rule).collect())
    }

    #[test]
    fn test_phase_sufficiency_table() {
        assert!(!phase_sufficient(Status::Ready, None));
        assert!(phase_sufficient(Status::Ready, Some(Phase::D1Discovery)));
        assert!(!phase_sufficient(Status::Active, Some(Phase::D1Discovery)));
        assert!(phase_sufficient(Status::Active, Some(Phase::R1Review)));
        assert!(!phase_sufficient(Status::Done, Some(Phase::I1Implementation)));
        assert!(phase_sufficient(Status::Blocked, None));
        assert!(phase_sufficient(Status::Cancelled, None));
    }

    #[test]
    fn test_phase_shortfall_blocks_regardless_of_rules() {
        let item = work_item(WorkItemType::Feature, Some(Phase::D1Discovery));
        let subject = Subject::WorkItem {
            item: &item,
            tasks: &[],
        };

        let result = validate_gate(&subject, Status::Active, &StartReadiness::default(), &RuleSet::default());
        assert!(!result.allowed);
        let err = result.into_result(&subject, Status::Active).unwrap_err();
        assert_eq!(err.code(), "PHASE_INCOMPLETE");
    }

    #[test]
    fn test_phase_error_keeps_rule_violations() {
        let item = work_item(WorkItemType::Feature, Some(Phase::D1Discovery));
        let subject = Subject::WorkItem {
            item: &item,
            tasks: &[],
        };

        let result = validate_gate(&subject, Status::Active, &StartReadiness::default(), &rules(Preset::Minimal));
        let err = result.into_result(&subject, Status::Active).unwrap_err();

        assert_eq!(err.code(), "PHASE_INCOMPLETE");
        assert_eq!(err.blocks().len(), 1);
        assert_eq!(err.violations()[0].rule_code, "WF-001");
    }

    #[test]
    fn test_every_block_is_reported() {
        let t = task(TaskType::Implementation, Some(6.0));
        let item = work_item(WorkItemType::Feature, Some(Phase::P1Plan));
        let subject = Subject::Task {
            task: &t,
            work_item: &item,
        };
        let readiness = StartReadiness {
            pending_dependencies: vec![],
            open_blockers: vec![Uuid::new_v4()],
        };

        let err = validate_gate(&subject, Status::Active, &readiness, &rules(Preset::Minimal))
            .into_result(&subject, Status::Active)
            .unwrap_err();

        assert_eq!(err.code(), "DEPENDENCIES_UNMET");
        assert!(matches!(err.blocks()[0], GateBlock::DependenciesUnmet(_)));
        assert_eq!(err.violations()[0].rule_code, "TIME-001");
    }

    #[test]
    fn test_continuous_completion_takes_precedence() {
        let item = work_item(WorkItemType::Maintenance, Some(Phase::D1Discovery));
        let subject = Subject::WorkItem {
            item: &item,
            tasks: &[],
        };

        let result = validate_gate(&subject, Status::Done, &StartReadiness::default(), &RuleSet::default());
        assert_eq!(result.blocks.len(), 2);
        let err = result.into_result(&subject, Status::Done).unwrap_err();
        assert_eq!(err.code(), "CONTINUOUS_COMPLETION");
        assert_eq!(err.blocks().len(), 2);
    }

    #[test]
    fn test_unmet_dependencies_block_start() {
        let t = task(TaskType::Implementation, Some(2.0));
        let item = work_item(WorkItemType::Feature, Some(Phase::P1Plan));
        let subject = Subject::Task {
            task: &t,
            work_item: &item,
        };
        let readiness = StartReadiness {
            pending_dependencies: vec![Uuid::new_v4()],
            open_blockers: vec![],
        };

        let result = validate_gate(&subject, Status::Active, &readiness, &rules(Preset::Minimal));
        let err = result.into_result(&subject, Status::Active).unwrap_err();
        assert_eq!(err.code(), "DEPENDENCIES_UNMET");

        // Readiness only matters when starting
        let result = validate_gate(&subject, Status::Ready, &readiness, &rules(Preset::Minimal));
        assert!(result.allowed);
    }

    #[test]
    fn test_time_box_violation_blocks() {
        let t = task(TaskType::Implementation, Some(5.0));
        let item = work_item(WorkItemType::Feature, None);
        let subject = Subject::Task {
            task: &t,
            work_item: &item,
        };

        let result = validate_gate(&subject, Status::Ready, &StartReadiness::default(), &rules(Preset::Minimal));
        assert!(!result.allowed);
        assert_eq!(result.blocking_violations().count(), 1);
        assert_eq!(result.violations[0].rule_code, "TIME-001");
    }

    #[test]
    fn test_advisory_violations_do_not_block() {
        let t = task(TaskType::Implementation, None);
        let item = work_item(WorkItemType::Feature, None);
        let subject = Subject::Task {
            task: &t,
            work_item: &item,
        };

        let result = validate_gate(&subject, Status::Active, &StartReadiness::default(), &rules(Preset::Standard));
        assert!(result.allowed);
        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.violations[0].rule_code, "WF-004");
        assert_eq!(result.violations[0].enforcement, Enforcement::Limit);

        let advisories = result.into_result(&subject, Status::Active).unwrap();
        assert_eq!(advisories.len(), 1);
    }

    #[test]
    fn test_work_item_facts_skip_cancelled_tasks() {
        let item = work_item(WorkItemType::Feature, Some(Phase::P1Plan));
        let mut cancelled = task(TaskType::Design, None);
        cancelled.status = Status::Cancelled;
        let mut done = task(TaskType::Testing, None);
        done.status = Status::Done;
        let tasks = vec![
            task(TaskType::Implementation, None),
            task(TaskType::Implementation, None),
            cancelled,
            done,
        ];

        let facts = Subject::WorkItem {
            item: &item,
            tasks: &tasks,
        }
        .facts();

        assert_eq!(
            facts.get("work_item.task_types"),
            Some(&json!(["implementation", "testing"]))
        );
        assert_eq!(facts.get("work_item.task_count"), Some(&json!(3)));
        assert_eq!(facts.get("work_item.open_task_count"), Some(&json!(2)));
    }

    #[test]
    fn test_metadata_is_flattened_into_facts() {
        let mut item = work_item(WorkItemType::Feature, None);
        item.metadata = json!({ "test_coverage": 72.5 });
        let facts = Subject::WorkItem {
            item: &item,
            tasks: &[],
        }
        .facts();

        assert_eq!(facts.get("work_item.metadata.test_coverage"), Some(&json!(72.5)));
        assert!(facts.get("work_item.metadata.owner").is_none());
    }
}
