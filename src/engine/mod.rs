//! Workflow engine.
//!
//! [`Engine`] is the single entry point for anything that changes state. Each
//! public operation runs in one store transaction: load, validate through the
//! state machine, phase sequencer, graph and gate, then write. Audit events go
//! to the configured [`EventSink`] only after the transaction commits.

pub mod gate;
pub mod graph;
pub mod phase;
pub mod routing;
pub mod state_machine;

pub use gate::{validate_gate, GateBlock, GateResult, Subject};
pub use graph::DependencyGraph;
pub use phase::{validate_phase_progression, PhaseRejection};
pub use routing::{AssignmentResolver, Router};
pub use state_machine::validate_transition;

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::db::{Database, Store};
use crate::error::{Error, HasAdvisories, Result};
use crate::events::{AuditEntity, AuditEvent, EventSink, TracingSink};
use crate::models::*;
use crate::rules::{Preset, RuleScope, RuleSet};

/// Result of an accepted status transition.
#[derive(Debug, Clone, Serialize)]
pub struct TransitionOutcome {
    pub kind: EntityKind,
    pub id: Uuid,
    pub from: Status,
    pub to: Status,
    /// Phase after the transition. Only differs from before with auto-advance on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    pub version: i64,
    /// Non-blocking rule violations raised by the gate.
    pub violations: Vec<RuleViolation>,
}

impl HasAdvisories for TransitionOutcome {
    fn advisories(&self) -> &[RuleViolation] {
        &self.violations
    }
}

/// Result of an accepted phase advance.
#[derive(Debug, Clone, Serialize)]
pub struct PhaseOutcome {
    pub id: Uuid,
    pub from: Option<Phase>,
    pub to: Phase,
    pub version: i64,
    /// Orchestrator that owns the item in its new phase.
    pub route: Option<String>,
}

impl HasAdvisories for PhaseOutcome {}
impl HasAdvisories for Project {}
impl HasAdvisories for WorkItem {}
impl HasAdvisories for Task {}
impl HasAdvisories for Rule {}
impl HasAdvisories for Dependency {}
impl HasAdvisories for Blocker {}
impl HasAdvisories for StartReadiness {}
impl HasAdvisories for Option<String> {}

/// Phase a work item moves to when auto-advance is on and it enters `status`.
fn auto_phase_for(status: Status) -> Option<Phase> {
    match status {
        Status::Active => Some(Phase::I1Implementation),
        Status::Review => Some(Phase::R1Review),
        Status::Done => Some(Phase::O1Operations),
        _ => None,
    }
}

fn load_work_item(store: &Store<'_>, id: Uuid) -> Result<WorkItem> {
    store
        .get_work_item(id)?
        .ok_or_else(|| Error::not_found(EntityKind::WorkItem, id))
}

fn load_task(store: &Store<'_>, id: Uuid) -> Result<Task> {
    store
        .get_task(id)?
        .ok_or_else(|| Error::not_found(EntityKind::Task, id))
}

/// Readiness only matters when starting work.
fn start_readiness(store: &Store<'_>, kind: EntityKind, id: Uuid, target: Status) -> Result<StartReadiness> {
    if target == Status::Active {
        DependencyGraph::new(store).readiness(kind, id)
    } else {
        Ok(StartReadiness::default())
    }
}

fn require_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::InvalidInput("Title must not be empty".into()));
    }
    Ok(())
}

fn require_hours(field: &str, hours: Option<f64>) -> Result<()> {
    match hours {
        Some(h) if !h.is_finite() || h < 0.0 => Err(Error::InvalidInput(format!(
            "{} must be a non-negative number of hours",
            field
        ))),
        _ => Ok(()),
    }
}

fn require_object(metadata: &Value) -> Result<()> {
    if !metadata.is_object() {
        return Err(Error::InvalidInput("Metadata must be a JSON object".into()));
    }
    Ok(())
}

pub struct Engine {
    db: Database,
    config: EngineConfig,
    router: Router,
    resolver: AssignmentResolver,
    sink: Arc<dyn EventSink>,
}

impl Engine {
    pub fn new(db: Database, config: EngineConfig) -> Self {
        let router = Router::with_overrides(&config.routing);
        let resolver = AssignmentResolver::with_overrides(&config.assignments);
        Self {
            db,
            config,
            router,
            resolver,
            sink: Arc::new(TracingSink),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run `op` in one transaction and emit its events after commit.
    fn unit_of_work<T>(
        &self,
        op: &str,
        f: impl FnOnce(&Store<'_>, &mut Vec<AuditEvent>) -> Result<T>,
    ) -> Result<T> {
        let mut events = Vec::new();
        let result = self.db.transaction(|store| f(store, &mut events));

        match &result {
            Ok(_) => {
                for event in &events {
                    self.sink.emit(event);
                }
            }
            Err(e) => tracing::warn!(op, code = e.code(), "Operation refused: {}", e),
        }
        result
    }

    // ============================================================
    // Projects and rules
    // ============================================================

    /// Create a project and seed its rules from `preset` (or the configured default).
    pub fn init_project(
        &self,
        name: &str,
        description: Option<String>,
        preset: Option<Preset>,
    ) -> Result<Project> {
        let preset = preset.unwrap_or(self.config.default_preset);
        let project = self.unit_of_work("init_project", |store, events| {
            let project = store.create_project(CreateProjectInput {
                name: name.to_string(),
                description,
                rule_preset: Some(preset),
            })?;
            events.push(AuditEvent::new(
                AuditEntity::Project,
                project.id,
                "created",
                Value::Null,
                preset.as_str(),
            ));
            Ok(project)
        })?;
        tracing::info!("Initialized project {} ({}) with {} rules", project.name, project.id, preset);
        Ok(project)
    }

    pub fn rules(&self, project_id: Uuid) -> Result<Vec<Rule>> {
        self.db.read(|store| {
            store
                .get_project(project_id)?
                .ok_or_else(|| Error::not_found("project", project_id))?;
            store.get_rules(project_id)
        })
    }

    /// Load a rule, let `apply` change it and persist the change.
    ///
    /// `apply` returns the field's old and new values; when they are equal
    /// nothing is written and no event is emitted.
    fn change_rule(
        &self,
        op: &str,
        project_id: Uuid,
        code: &str,
        field: &str,
        apply: impl FnOnce(&mut Rule) -> Result<(Value, Value)>,
    ) -> Result<Rule> {
        self.unit_of_work(op, |store, events| {
            let mut rule = store
                .get_rule(project_id, code)?
                .ok_or_else(|| Error::NotFound(format!("rule {} in project {}", code, project_id)))?;
            let (from, to) = apply(&mut rule)?;
            if from == to {
                return Ok(rule);
            }

            rule.updated_at = Utc::now();
            store.update_rule(&rule)?;
            events.push(AuditEvent::new(AuditEntity::Rule, rule.id, field, from, to));
            Ok(rule)
        })
    }

    /// Toggle one rule for one project. Takes effect on the next operation.
    pub fn set_rule_enabled(&self, project_id: Uuid, code: &str, enabled: bool) -> Result<Rule> {
        let rule = self.change_rule("set_rule_enabled", project_id, code, "enabled", |rule| {
            let before = rule.enabled;
            rule.enabled = enabled;
            Ok((before.into(), enabled.into()))
        })?;
        tracing::info!("Rule {} {} for project {}", code, if enabled { "enabled" } else { "disabled" }, project_id);
        Ok(rule)
    }

    /// Change a rule's enforcement level.
    pub fn set_rule_enforcement(
        &self,
        project_id: Uuid,
        code: &str,
        enforcement: Enforcement,
    ) -> Result<Rule> {
        let rule = self.change_rule("set_rule_enforcement", project_id, code, "enforcement", |rule| {
            let before = rule.enforcement;
            rule.enforcement = enforcement;
            Ok((before.as_str().into(), enforcement.as_str().into()))
        })?;
        tracing::info!("Rule {} set to {} for project {}", code, enforcement, project_id);
        Ok(rule)
    }

    /// Merge `patch` into a rule's config: thresholds, message or scope keys.
    ///
    /// A `null` value removes the key. The merged config must still carry a
    /// readable scope, so a typo cannot silently widen or disable the rule.
    pub fn set_rule_config(&self, project_id: Uuid, code: &str, patch: Value) -> Result<Rule> {
        let Value::Object(patch) = patch else {
            return Err(Error::InvalidInput("Rule config must be a JSON object".into()));
        };

        let rule = self.change_rule("set_rule_config", project_id, code, "config", |rule| {
            let before = rule.config.clone();
            let mut config = match &before {
                Value::Object(map) => map.clone(),
                _ => Default::default(),
            };
            for (key, value) in patch {
                if value.is_null() {
                    config.remove(&key);
                } else {
                    config.insert(key, value);
                }
            }
            let config = Value::Object(config);

            RuleScope::from_config(&config)
                .map_err(|e| Error::InvalidInput(format!("Invalid scope for rule {}: {}", code, e)))?;
            rule.config = config.clone();
            Ok((before, config))
        })?;
        tracing::info!("Rule {} reconfigured for project {}", code, project_id);
        Ok(rule)
    }

    // ============================================================
    // Work items
    // ============================================================

    pub fn create_work_item(&self, project_id: Uuid, input: CreateWorkItemInput) -> Result<WorkItem> {
        require_title(&input.title)?;
        require_hours("effort_estimate", input.effort_estimate)?;
        let metadata = input.metadata.unwrap_or_else(|| Value::Object(Default::default()));
        require_object(&metadata)?;

        self.unit_of_work("create_work_item", |store, events| {
            store
                .get_project(project_id)?
                .ok_or_else(|| Error::not_found("project", project_id))?;

            if let Some(parent_id) = input.parent_id {
                let parent = load_work_item(store, parent_id)?;
                if parent.project_id != project_id {
                    return Err(Error::InvalidInput(format!(
                        "Parent {} belongs to another project",
                        parent_id
                    )));
                }
            }

            let now = Utc::now();
            let item = WorkItem {
                id: Uuid::new_v4(),
                project_id,
                parent_id: input.parent_id,
                title: input.title,
                description: input.description,
                item_type: input.item_type,
                status: Status::Draft,
                phase: None,
                priority: input.priority.unwrap_or_default(),
                effort_estimate: input.effort_estimate,
                metadata,
                version: 1,
                created_at: now,
                updated_at: now,
            };
            store.insert_work_item(&item)?;

            events.push(AuditEvent::new(
                EntityKind::WorkItem,
                item.id,
                "created",
                Value::Null,
                item.status.as_str(),
            ));
            Ok(item)
        })
    }

    /// Update descriptive fields. Status and phase have their own requests.
    pub fn update_work_item(&self, id: Uuid, input: UpdateWorkItemInput) -> Result<WorkItem> {
        if let Some(title) = &input.title {
            require_title(title)?;
        }
        require_hours("effort_estimate", input.effort_estimate)?;
        if let Some(metadata) = &input.metadata {
            require_object(metadata)?;
        }

        self.unit_of_work("update_work_item", |store, events| {
            let mut item = load_work_item(store, id)?;
            let mut changed = Vec::new();
            if let Some(title) = input.title {
                item.title = title;
                changed.push("title");
            }
            if input.description.is_some() {
                item.description = input.description;
                changed.push("description");
            }
            if let Some(priority) = input.priority {
                item.priority = priority;
                changed.push("priority");
            }
            if input.effort_estimate.is_some() {
                item.effort_estimate = input.effort_estimate;
                changed.push("effort_estimate");
            }
            if let Some(metadata) = input.metadata {
                item.metadata = metadata;
                changed.push("metadata");
            }
            if changed.is_empty() {
                return Ok(item);
            }

            item.updated_at = Utc::now();
            item.version = store.update_work_item(&item)?;

            events.push(AuditEvent::new(EntityKind::WorkItem, id, "fields", Value::Null, changed));
            Ok(item)
        })
    }

    pub fn delete_work_item(&self, id: Uuid) -> Result<()> {
        self.unit_of_work("delete_work_item", |store, events| {
            let item = load_work_item(store, id)?;
            store.delete_work_item(id)?;
            events.push(AuditEvent::new(
                EntityKind::WorkItem,
                id,
                "deleted",
                item.status.as_str(),
                Value::Null,
            ));
            Ok(())
        })
    }

    // ============================================================
    // Tasks
    // ============================================================

    /// Create a task in DRAFT. Without an explicit role the resolver picks one by type.
    pub fn create_task(&self, work_item_id: Uuid, input: CreateTaskInput) -> Result<Task> {
        require_title(&input.title)?;
        require_hours("effort_hours", input.effort_hours)?;

        let assigned_role = input
            .assigned_role
            .filter(|r| !r.trim().is_empty())
            .or_else(|| self.resolver.resolve_assignee(input.task_type).map(str::to_string));

        self.unit_of_work("create_task", |store, events| {
            let item = load_work_item(store, work_item_id)?;
            if matches!(item.status, Status::Done | Status::Cancelled | Status::Archived) {
                return Err(Error::InvalidInput(format!(
                    "Cannot add tasks to a {} work item",
                    item.status
                )));
            }

            let now = Utc::now();
            let task = Task {
                id: Uuid::new_v4(),
                work_item_id,
                title: input.title,
                description: input.description,
                task_type: input.task_type,
                status: Status::Draft,
                effort_hours: input.effort_hours,
                priority: input.priority.unwrap_or_default(),
                assigned_role,
                blocked_reason: None,
                version: 1,
                created_at: now,
                updated_at: now,
            };
            store.insert_task(&task)?;

            events.push(AuditEvent::new(
                EntityKind::Task,
                task.id,
                "created",
                Value::Null,
                task.status.as_str(),
            ));
            Ok(task)
        })
    }

    /// Update descriptive fields of a task.
    ///
    /// A task already READY or ACTIVE is re-checked against the rules for its
    /// current status, so an edit cannot sneak past a time-box.
    pub fn update_task(&self, id: Uuid, input: UpdateTaskInput) -> Result<Task> {
        if let Some(title) = &input.title {
            require_title(title)?;
        }
        require_hours("effort_hours", input.effort_hours)?;

        self.unit_of_work("update_task", |store, events| {
            let mut task = load_task(store, id)?;
            let mut changed = Vec::new();

            if let Some(title) = input.title {
                task.title = title;
                changed.push("title");
            }
            if input.description.is_some() {
                task.description = input.description;
                changed.push("description");
            }
            if input.effort_hours.is_some() {
                task.effort_hours = input.effort_hours;
                changed.push("effort_hours");
            }
            if let Some(priority) = input.priority {
                task.priority = priority;
                changed.push("priority");
            }
            if input.assigned_role.is_some() {
                task.assigned_role = input.assigned_role;
                changed.push("assigned_role");
            }
            if changed.is_empty() {
                return Ok(task);
            }

            if matches!(task.status, Status::Ready | Status::Active) {
                let item = load_work_item(store, task.work_item_id)?;
                let rules = RuleSet::load(store, item.project_id)?;
                let subject = Subject::Task {
                    task: &task,
                    work_item: &item,
                };
                let violations = rules.evaluate(
                    EntityKind::Task,
                    subject.type_name(),
                    task.status,
                    &subject.facts(),
                );
                if violations.iter().any(|v| v.is_blocking()) {
                    return Err(Error::RuleViolationBlocking(violations));
                }
            }

            task.updated_at = Utc::now();
            task.version = store.update_task(&task)?;

            events.push(AuditEvent::new(EntityKind::Task, id, "fields", Value::Null, changed));
            Ok(task)
        })
    }

    pub fn delete_task(&self, id: Uuid) -> Result<()> {
        self.unit_of_work("delete_task", |store, events| {
            let task = load_task(store, id)?;
            store.delete_task(id)?;
            events.push(AuditEvent::new(
                EntityKind::Task,
                id,
                "deleted",
                task.status.as_str(),
                Value::Null,
            ));
            Ok(())
        })
    }

    // ============================================================
    // Transitions
    // ============================================================

    /// Evaluate the gate for a transition without changing anything.
    pub fn check_transition(&self, kind: EntityKind, id: Uuid, target: Status) -> Result<GateResult> {
        self.db.read(|store| {
            let current = store
                .get_status(kind, id)?
                .ok_or_else(|| Error::not_found(kind, id))?;
            validate_transition(kind, current, target)?;
            self.gate(store, kind, id, target)
        })
    }

    fn gate(&self, store: &Store<'_>, kind: EntityKind, id: Uuid, target: Status) -> Result<GateResult> {
        let readiness = start_readiness(store, kind, id, target)?;

        match kind {
            EntityKind::WorkItem => {
                let item = load_work_item(store, id)?;
                let tasks = store.get_tasks_by_work_item(id)?;
                let rules = RuleSet::load(store, item.project_id)?;
                let subject = Subject::WorkItem {
                    item: &item,
                    tasks: &tasks,
                };
                Ok(validate_gate(&subject, target, &readiness, &rules))
            }
            EntityKind::Task => {
                let task = load_task(store, id)?;
                let item = load_work_item(store, task.work_item_id)?;
                let rules = RuleSet::load(store, item.project_id)?;
                let subject = Subject::Task {
                    task: &task,
                    work_item: &item,
                };
                Ok(validate_gate(&subject, target, &readiness, &rules))
            }
        }
    }

    /// Move a work item or task to `target`.
    ///
    /// `reason` is recorded as the task's blocked reason when `target` is
    /// BLOCKED. Nothing is written if any check fails.
    pub fn request_status_transition(
        &self,
        kind: EntityKind,
        id: Uuid,
        target: Status,
        reason: Option<String>,
    ) -> Result<TransitionOutcome> {
        let outcome = self.unit_of_work("request_status_transition", |store, events| {
            let current = store
                .get_status(kind, id)?
                .ok_or_else(|| Error::not_found(kind, id))?;
            validate_transition(kind, current, target)?;
            let readiness = start_readiness(store, kind, id, target)?;

            match kind {
                EntityKind::WorkItem => {
                    let mut item = load_work_item(store, id)?;
                    let tasks = store.get_tasks_by_work_item(id)?;
                    let rules = RuleSet::load(store, item.project_id)?;
                    let subject = Subject::WorkItem {
                        item: &item,
                        tasks: &tasks,
                    };
                    let violations = validate_gate(&subject, target, &readiness, &rules)
                        .into_result(&subject, target)?;

                    let phase_before = item.phase;
                    item.status = target;
                    if self.config.auto_advance_phase {
                        if let Some(next) = auto_phase_for(target) {
                            if phase::next_phase(item.item_type, item.phase) == Some(next) {
                                item.phase = Some(next);
                            }
                        }
                    }
                    item.updated_at = Utc::now();
                    let version = store.update_work_item(&item)?;

                    events.push(AuditEvent::new(kind, id, "status", current.as_str(), target.as_str()));
                    if item.phase != phase_before {
                        events.push(AuditEvent::new(
                            kind,
                            id,
                            "phase",
                            phase_before.map(|p| p.as_str()),
                            item.phase.map(|p| p.as_str()),
                        ));
                    }

                    Ok(TransitionOutcome {
                        kind,
                        id,
                        from: current,
                        to: target,
                        phase: item.phase,
                        version,
                        violations,
                    })
                }
                EntityKind::Task => {
                    let mut task = load_task(store, id)?;
                    let item = load_work_item(store, task.work_item_id)?;
                    let rules = RuleSet::load(store, item.project_id)?;
                    let subject = Subject::Task {
                        task: &task,
                        work_item: &item,
                    };
                    let violations = validate_gate(&subject, target, &readiness, &rules)
                        .into_result(&subject, target)?;

                    task.status = target;
                    task.blocked_reason = if target == Status::Blocked { reason } else { None };
                    task.updated_at = Utc::now();
                    let version = store.update_task(&task)?;

                    events.push(AuditEvent::new(kind, id, "status", current.as_str(), target.as_str()));

                    Ok(TransitionOutcome {
                        kind,
                        id,
                        from: current,
                        to: target,
                        phase: None,
                        version,
                        violations,
                    })
                }
            }
        })?;

        tracing::info!(
            "{} {} moved {} -> {} ({} advisories)",
            outcome.kind,
            outcome.id,
            outcome.from,
            outcome.to,
            outcome.violations.len()
        );
        Ok(outcome)
    }

    /// Advance a work item's phase by exactly one step in its type's sequence.
    ///
    /// Never changes status.
    pub fn request_phase_advance(&self, id: Uuid, requested: Phase) -> Result<PhaseOutcome> {
        let outcome = self.unit_of_work("request_phase_advance", |store, events| {
            let mut item = load_work_item(store, id)?;

            if matches!(item.status, Status::Cancelled | Status::Archived) {
                return Err(Error::InvalidPhaseProgression {
                    item_type: item.item_type,
                    current: item.phase,
                    requested,
                    reason: PhaseRejection::Frozen(item.status),
                });
            }
            validate_phase_progression(item.item_type, item.phase, requested)?;

            let from = item.phase;
            item.phase = Some(requested);
            item.updated_at = Utc::now();
            let version = store.update_work_item(&item)?;

            events.push(AuditEvent::new(
                EntityKind::WorkItem,
                id,
                "phase",
                from.map(|p| p.as_str()),
                requested.as_str(),
            ));

            Ok(PhaseOutcome {
                id,
                from,
                to: requested,
                version,
                route: self.router.role_for(requested).map(str::to_string),
            })
        })?;

        tracing::info!("Work item {} advanced to {}", id, requested);
        Ok(outcome)
    }

    // ============================================================
    // Dependency graph
    // ============================================================

    pub fn add_dependency(&self, kind: EntityKind, from: Uuid, to: Uuid) -> Result<Dependency> {
        self.unit_of_work("add_dependency", |store, events| {
            let edge = DependencyGraph::new(store).add_dependency(kind, from, to)?;
            events.push(AuditEvent::new(kind, from, "dependency", Value::Null, to.to_string()));
            Ok(edge)
        })
    }

    pub fn remove_dependency(&self, kind: EntityKind, from: Uuid, to: Uuid) -> Result<()> {
        self.unit_of_work("remove_dependency", |store, events| {
            DependencyGraph::new(store).remove_dependency(kind, from, to)?;
            events.push(AuditEvent::new(kind, from, "dependency", to.to_string(), Value::Null));
            Ok(())
        })
    }

    pub fn add_blocker(
        &self,
        kind: EntityKind,
        entity: Uuid,
        blocker: Uuid,
        reason: Option<String>,
    ) -> Result<Blocker> {
        self.unit_of_work("add_blocker", |store, events| {
            let edge = DependencyGraph::new(store).add_blocker(kind, entity, blocker, reason)?;
            events.push(AuditEvent::new(kind, entity, "blocker", Value::Null, blocker.to_string()));
            Ok(edge)
        })
    }

    pub fn resolve_blocker(&self, kind: EntityKind, entity: Uuid, blocker: Uuid) -> Result<()> {
        self.unit_of_work("resolve_blocker", |store, events| {
            DependencyGraph::new(store).resolve_blocker(kind, entity, blocker)?;
            events.push(AuditEvent::new(kind, entity, "blocker", blocker.to_string(), Value::Null));
            Ok(())
        })
    }

    pub fn readiness(&self, kind: EntityKind, id: Uuid) -> Result<StartReadiness> {
        self.db.read(|store| DependencyGraph::new(store).readiness(kind, id))
    }

    pub fn can_start(&self, kind: EntityKind, id: Uuid) -> Result<bool> {
        self.db.read(|store| DependencyGraph::new(store).can_start(kind, id))
    }

    // ============================================================
    // Routing
    // ============================================================

    /// Orchestrator role for a work item's current phase.
    pub fn route(&self, work_item_id: Uuid) -> Result<Option<String>> {
        let item = self
            .db
            .get_work_item(work_item_id)?
            .ok_or_else(|| Error::not_found(EntityKind::WorkItem, work_item_id))?;
        Ok(self.router.route(&item).map(str::to_string))
    }

    pub fn resolve_assignee(&self, task_type: TaskType) -> Option<&str> {
        self.resolver.resolve_assignee(task_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MemorySink;

    fn engine(config: EngineConfig) -> (Engine, MemorySink) {
        let db = Database::open_memory().unwrap();
        db.migrate().unwrap();
        let sink = MemorySink::new();
        let engine = Engine::new(db, config).with_sink(Arc::new(sink.clone()));
        (engine, sink)
    }

    fn item_input(item_type: WorkItemType) -> CreateWorkItemInput {
        CreateWorkItemInput {
            parent_id: None,
            title: "Checkout".into(),
            description: Some("New checkout flow".into()),
            item_type,
            priority: None,
            effort_estimate: Some(12.0),
            metadata: None,
        }
    }

    #[test]
    fn test_auto_phase_table() {
        assert_eq!(auto_phase_for(Status::Active), Some(Phase::I1Implementation));
        assert_eq!(auto_phase_for(Status::Done), Some(Phase::O1Operations));
        assert_eq!(auto_phase_for(Status::Ready), None);
    }

    #[test]
    fn test_failed_operation_emits_nothing() {
        let (engine, sink) = engine(EngineConfig::default());
        let project = engine.init_project("P", None, Some(Preset::Minimal)).unwrap();
        let item = engine.create_work_item(project.id, item_input(WorkItemType::Feature)).unwrap();
        sink.clear();

        let err = engine
            .request_status_transition(EntityKind::WorkItem, item.id, Status::Ready, None)
            .unwrap_err();
        assert_eq!(err.code(), "PHASE_INCOMPLETE");
        assert!(sink.is_empty());
    }

    #[test]
    fn test_auto_advance_moves_phase_one_step() {
        let config = EngineConfig {
            auto_advance_phase: true,
            ..Default::default()
        };
        let (engine, sink) = engine(config);
        let project = engine.init_project("P", None, Some(Preset::Minimal)).unwrap();
        let item = engine.create_work_item(project.id, item_input(WorkItemType::Refactoring)).unwrap();
        for task_type in [TaskType::Implementation, TaskType::Testing] {
            engine
                .create_task(
                    item.id,
                    CreateTaskInput {
                        title: format!("{} task", task_type),
                        description: None,
                        task_type,
                        effort_hours: Some(2.0),
                        priority: None,
                        assigned_role: None,
                    },
                )
                .unwrap();
        }

        engine.request_phase_advance(item.id, Phase::D1Discovery).unwrap();
        engine.request_phase_advance(item.id, Phase::P1Plan).unwrap();
        engine
            .request_status_transition(EntityKind::WorkItem, item.id, Status::Ready, None)
            .unwrap();
        sink.clear();

        let outcome = engine
            .request_status_transition(EntityKind::WorkItem, item.id, Status::Active, None)
            .unwrap();
        assert_eq!(outcome.phase, Some(Phase::I1Implementation));

        let fields: Vec<_> = sink.events().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["status", "phase"]);
    }

    #[test]
    fn test_frozen_phase_after_cancel() {
        let (engine, _) = engine(EngineConfig::default());
        let project = engine.init_project("P", None, None).unwrap();
        let item = engine.create_work_item(project.id, item_input(WorkItemType::Bugfix)).unwrap();
        engine
            .request_status_transition(EntityKind::WorkItem, item.id, Status::Cancelled, None)
            .unwrap();

        let err = engine.request_phase_advance(item.id, Phase::D1Discovery).unwrap_err();
        match err {
            Error::InvalidPhaseProgression { reason, .. } => {
                assert_eq!(reason, PhaseRejection::Frozen(Status::Cancelled))
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_check_transition_does_not_write() {
        let (engine, _) = engine(EngineConfig::default());
        let project = engine.init_project("P", None, None).unwrap();
        let item = engine.create_work_item(project.id, item_input(WorkItemType::Feature)).unwrap();

        let gate = engine
            .check_transition(EntityKind::WorkItem, item.id, Status::Ready)
            .unwrap();
        assert!(!gate.allowed);

        let stored = engine.database().get_work_item(item.id).unwrap().unwrap();
        assert_eq!(stored.version, item.version);
    }
}
