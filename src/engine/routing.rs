//! Phase-based orchestrator routing and task-type auto-assignment.
//!
//! Both lookups are plain tables. Defaults can be replaced entry by entry from
//! [`EngineConfig`](crate::config::EngineConfig); an override of `null`
//! removes the mapping.

use std::collections::HashMap;

use crate::models::{Phase, TaskType, WorkItem};

/// Maps a work item's phase to the orchestrator role that owns it.
#[derive(Debug, Clone)]
pub struct Router {
    roles: HashMap<Phase, String>,
}

impl Default for Router {
    fn default() -> Self {
        let roles = [
            (Phase::D1Discovery, "discovery-orch"),
            (Phase::P1Plan, "planning-orch"),
            (Phase::I1Implementation, "implementation-orch"),
            (Phase::R1Review, "review-orch"),
            (Phase::O1Operations, "operations-orch"),
            (Phase::E1Evolution, "evolution-orch"),
        ]
        .into_iter()
        .map(|(phase, role)| (phase, role.to_string()))
        .collect();
        Self { roles }
    }
}

impl Router {
    pub fn with_overrides(overrides: &HashMap<Phase, Option<String>>) -> Self {
        let mut router = Self::default();
        apply_overrides(&mut router.roles, overrides);
        router
    }

    pub fn role_for(&self, phase: Phase) -> Option<&str> {
        self.roles.get(&phase).map(String::as_str)
    }

    /// The orchestrator for `item`, or `None` while it has no phase.
    pub fn route(&self, item: &WorkItem) -> Option<&str> {
        item.phase.and_then(|phase| self.role_for(phase))
    }
}

/// Picks a worker role for a new task from its type.
#[derive(Debug, Clone)]
pub struct AssignmentResolver {
    roles: HashMap<TaskType, String>,
}

impl Default for AssignmentResolver {
    fn default() -> Self {
        let roles = [
            (TaskType::Design, "design-architect"),
            (TaskType::Implementation, "code-implementer"),
            (TaskType::Testing, "test-runner"),
            (TaskType::Bugfix, "debugger"),
            (TaskType::Hotfix, "debugger"),
            (TaskType::Documentation, "doc-writer"),
            (TaskType::Review, "code-reviewer"),
            (TaskType::Deployment, "deploy-manager"),
            (TaskType::Analysis, "researcher"),
            (TaskType::Research, "researcher"),
            (TaskType::Refactoring, "code-implementer"),
        ]
        .into_iter()
        .map(|(task_type, role)| (task_type, role.to_string()))
        .collect();
        Self { roles }
    }
}

impl AssignmentResolver {
    pub fn with_overrides(overrides: &HashMap<TaskType, Option<String>>) -> Self {
        let mut resolver = Self::default();
        apply_overrides(&mut resolver.roles, overrides);
        resolver
    }

    pub fn resolve_assignee(&self, task_type: TaskType) -> Option<&str> {
        self.roles.get(&task_type).map(String::as_str)
    }
}

fn apply_overrides<K>(roles: &mut HashMap<K, String>, overrides: &HashMap<K, Option<String>>)
where
    K: std::hash::Hash + Eq + Copy,
{
    for (key, role) in overrides {
        match role {
            Some(role) if !role.trim().is_empty() => {
                roles.insert(*key, role.clone());
            }
            _ => {
                roles.remove(key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_phase_has_a_default_route() {
        let router = Router::default();
        for phase in Phase::ALL {
            assert!(router.role_for(phase).is_some(), "{} unrouted", phase);
        }
        assert_eq!(router.role_for(Phase::R1Review), Some("review-orch"));
    }

    #[test]
    fn test_default_assignments() {
        let resolver = AssignmentResolver::default();
        assert_eq!(resolver.resolve_assignee(TaskType::Testing), Some("test-runner"));
        assert_eq!(resolver.resolve_assignee(TaskType::Hotfix), Some("debugger"));
        assert_eq!(resolver.resolve_assignee(TaskType::Research), Some("researcher"));
        assert_eq!(resolver.resolve_assignee(TaskType::Simple), None);
    }

    #[test]
    fn test_overrides_replace_and_remove() {
        let overrides = HashMap::from([
            (TaskType::Testing, Some("qa-bot".to_string())),
            (TaskType::Review, None),
            (TaskType::Simple, Some("generalist".to_string())),
        ]);
        let resolver = AssignmentResolver::with_overrides(&overrides);

        assert_eq!(resolver.resolve_assignee(TaskType::Testing), Some("qa-bot"));
        assert_eq!(resolver.resolve_assignee(TaskType::Review), None);
        assert_eq!(resolver.resolve_assignee(TaskType::Simple), Some("generalist"));
        assert_eq!(resolver.resolve_assignee(TaskType::Design), Some("design-architect"));
    }

    #[test]
    fn test_router_overrides() {
        let overrides = HashMap::from([(Phase::O1Operations, Some("sre-orch".to_string()))]);
        let router = Router::with_overrides(&overrides);
        assert_eq!(router.role_for(Phase::O1Operations), Some("sre-orch"));
        assert_eq!(router.role_for(Phase::D1Discovery), Some("discovery-orch"));
    }
}
