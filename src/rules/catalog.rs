//! Built-in rule catalog and preset tiers.
//!
//! The catalog is only consulted when a project is initialized: the rules of
//! the chosen preset are copied into the project's `rules` table, and from then
//! on the store is the only source of truth.
//!
//! Most of the catalog is generated from tables. A family is one check
//! (a time-box, a required metadata artefact, an estimate ceiling) stamped out
//! once per task or work item type, so each type gets its own rule that can be
//! toggled and tuned independently.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::expr::{CmpOp, Expr, RuleLogic};
use crate::models::Enforcement;

/// Rule preset tiers. Each tier includes every rule of the tiers below it.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    Minimal,
    #[default]
    Standard,
    Professional,
    Enterprise,
}

impl Preset {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Standard => "standard",
            Self::Professional => "professional",
            Self::Enterprise => "enterprise",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "minimal" => Some(Self::Minimal),
            "standard" => Some(Self::Standard),
            "professional" => Some(Self::Professional),
            "enterprise" => Some(Self::Enterprise),
            _ => None,
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A catalog entry, copied into a project's rule table at initialization.
#[derive(Debug, Clone)]
pub struct RuleDefinition {
    pub code: String,
    pub name: String,
    pub description: String,
    pub category: &'static str,
    pub enforcement: Enforcement,
    /// Lowest preset that includes this rule.
    pub tier: Preset,
    pub logic: RuleLogic,
    pub config: Value,
}

/// Rules included in `preset`, in catalog order.
pub fn preset_rules(preset: Preset) -> Vec<RuleDefinition> {
    catalog()
        .into_iter()
        .filter(|rule| rule.tier <= preset)
        .collect()
}

/// Every rule the catalog knows about.
pub fn catalog() -> Vec<RuleDefinition> {
    let mut rules = time_boxing_rules();
    rules.extend(workflow_rules());
    rules.extend(quality_rules());
    rules.extend(enhancement_rules());
    rules.extend(estimate_ceilings());
    rules.extend(task_rules());
    rules.extend(ARTEFACTS.iter().flat_map(Artefact::rules));
    rules.extend(priority_rationale_rules());
    rules
}

/// Task types with their hard time-box in hours.
const TIME_BOXES: &[(&str, &str, f64)] = &[
    ("TIME-001", "implementation", 4.0),
    ("TIME-002", "testing", 6.0),
    ("TIME-003", "design", 8.0),
    ("TIME-004", "documentation", 4.0),
    ("TIME-005", "deployment", 2.0),
    ("TIME-006", "hotfix", 2.0),
    ("TIME-007", "analysis", 4.0),
    ("TIME-008", "research", 8.0),
    ("TIME-009", "review", 2.0),
    ("TIME-010", "bugfix", 4.0),
    ("TIME-011", "refactoring", 4.0),
    ("TIME-012", "simple", 1.0),
];

const ALL_ITEM_TYPES: &[&str] = &[
    "feature",
    "enhancement",
    "bugfix",
    "research",
    "planning",
    "refactoring",
    "maintenance",
    "monitoring",
    "documentation",
    "security",
    "fix_backlog",
];

/// Item types that ship code.
const DELIVERY: &[&str] = &["feature", "enhancement", "bugfix", "refactoring"];

/// Item types that can reach done.
const FINITE: &[&str] = &["feature", "enhancement", "bugfix", "refactoring", "research", "planning"];

fn time_boxing_rules() -> Vec<RuleDefinition> {
    TIME_BOXES
        .iter()
        .map(|&(code, task_type, max_hours)| RuleDefinition {
            code: code.to_string(),
            name: format!("Time-box: {}", task_type),
            description: "Task effort must fit within the time-box for its type".to_string(),
            category: "time_boxing",
            enforcement: Enforcement::Block,
            tier: Preset::Minimal,
            logic: RuleLogic::new(Expr::gt(
                Expr::field("task.effort_hours"),
                Expr::config("max_hours"),
            )),
            config: json!({
                "entity": "task",
                "types": [task_type],
                "on_status": ["ready", "active"],
                "max_hours": max_hours,
                "message": "{task.type} task effort {task.effort_hours}h exceeds the {max_hours}h time-box"
            }),
        })
        .collect()
}

fn workflow_rules() -> Vec<RuleDefinition> {
    let required = Expr::lookup(Expr::config("required"), Expr::field("work_item.type"));
    let missing = Expr::missing(required, Expr::field("work_item.task_types"));

    vec![
        RuleDefinition {
            code: "WF-001".into(),
            name: "Required task types".into(),
            description: "A work item must have tasks covering its type's required task types before it starts".into(),
            category: "workflow",
            enforcement: Enforcement::Block,
            tier: Preset::Minimal,
            logic: RuleLogic::new(Expr::not(Expr::is_empty(missing.clone()))).with_detail(missing),
            config: json!({
                "entity": "work_item",
                "on_status": ["active"],
                "required": {
                    "feature": ["design", "implementation", "testing", "documentation"],
                    "enhancement": ["design", "implementation", "testing"],
                    "bugfix": ["analysis", "implementation", "testing"],
                    "refactoring": ["implementation", "testing"],
                    "research": ["research", "documentation"],
                    "planning": ["design", "documentation"]
                },
                "message": "Missing required task types: {detail}"
            }),
        },
        RuleDefinition {
            code: "WF-007".into(),
            name: "Hotfix priority".into(),
            description: "Hotfix tasks only start at high or critical priority".into(),
            category: "workflow",
            enforcement: Enforcement::Block,
            tier: Preset::Minimal,
            logic: RuleLogic::new(Expr::contains(
                Expr::config("low_priorities"),
                Expr::field("task.priority"),
            )),
            config: json!({
                "entity": "task",
                "types": ["hotfix"],
                "on_status": ["active"],
                "low_priorities": ["medium", "low"],
                "message": "Hotfix task has {task.priority} priority, raise it before starting"
            }),
        },
        RuleDefinition {
            code: "EST-001".into(),
            name: "Estimate ceiling".into(),
            description: "Work items estimated above the ceiling must be split".into(),
            category: "estimation",
            enforcement: Enforcement::Block,
            tier: Preset::Minimal,
            logic: RuleLogic::new(Expr::gt(
                Expr::field("work_item.effort_estimate"),
                Expr::config("max_estimate"),
            )),
            config: json!({
                "entity": "work_item",
                "on_status": ["ready", "active"],
                "max_estimate": 400.0,
                "message": "Estimate {work_item.effort_estimate}h exceeds the {max_estimate}h ceiling, split the work item"
            }),
        },
        RuleDefinition {
            code: "WF-002".into(),
            name: "Effort estimate before start".into(),
            description: "Work items should carry an effort estimate before work starts".into(),
            category: "workflow",
            enforcement: Enforcement::Guide,
            tier: Preset::Standard,
            logic: RuleLogic::new(Expr::is_empty(Expr::field("work_item.effort_estimate"))),
            config: json!({
                "entity": "work_item",
                "on_status": ["active"],
                "message": "No effort estimate recorded for this {work_item.type}"
            }),
        },
        RuleDefinition {
            code: "WF-003".into(),
            name: "Description before ready".into(),
            description: "Work items need a description before they leave draft".into(),
            category: "workflow",
            enforcement: Enforcement::Limit,
            tier: Preset::Standard,
            logic: RuleLogic::new(Expr::is_empty(Expr::field("work_item.description"))),
            config: json!({
                "entity": "work_item",
                "on_status": ["ready"],
                "message": "Work item has no description"
            }),
        },
        RuleDefinition {
            code: "WF-004".into(),
            name: "Task effort before start".into(),
            description: "Tasks should be estimated before they become active".into(),
            category: "workflow",
            enforcement: Enforcement::Limit,
            tier: Preset::Standard,
            logic: RuleLogic::new(Expr::is_empty(Expr::field("task.effort_hours"))),
            config: json!({
                "entity": "task",
                "on_status": ["active"],
                "message": "Task has no effort estimate"
            }),
        },
        RuleDefinition {
            code: "WF-005".into(),
            name: "Open tasks before done".into(),
            description: "Every task must be finished or cancelled before the work item is done".into(),
            category: "workflow",
            enforcement: Enforcement::Block,
            tier: Preset::Professional,
            logic: RuleLogic::new(Expr::gt(
                Expr::field("work_item.open_task_count"),
                Expr::literal(0),
            ))
            .with_detail(Expr::field("work_item.open_task_count")),
            config: json!({
                "entity": "work_item",
                "on_status": ["done"],
                "message": "{detail} task(s) still open"
            }),
        },
    ]
}

fn quality_rules() -> Vec<RuleDefinition> {
    let missing_security_tasks = Expr::missing(
        Expr::config("required"),
        Expr::field("work_item.task_types"),
    );

    vec![
        RuleDefinition {
            code: "QA-001".into(),
            name: "Test coverage threshold".into(),
            description: "Recorded test coverage should meet the project threshold before completion".into(),
            category: "quality",
            enforcement: Enforcement::Limit,
            tier: Preset::Standard,
            logic: RuleLogic::new(Expr::lt(
                Expr::field("work_item.metadata.test_coverage"),
                Expr::config("min_coverage"),
            )),
            config: json!({
                "entity": "work_item",
                "on_status": ["done"],
                "min_coverage": 80.0,
                "message": "Test coverage {work_item.metadata.test_coverage}% is below {min_coverage}%"
            }),
        },
        RuleDefinition {
            code: "QA-002".into(),
            name: "Review task for features".into(),
            description: "Features and enhancements should include a review task before review".into(),
            category: "quality",
            enforcement: Enforcement::Limit,
            tier: Preset::Professional,
            logic: RuleLogic::new(Expr::not(Expr::contains(
                Expr::field("work_item.task_types"),
                Expr::literal("review"),
            ))),
            config: json!({
                "entity": "work_item",
                "types": ["feature", "enhancement"],
                "on_status": ["review"],
                "message": "No review task planned"
            }),
        },
        RuleDefinition {
            code: "QA-003".into(),
            name: "Strict coverage gate".into(),
            description: "Enterprise projects require the coverage threshold to be met before completion".into(),
            category: "quality",
            enforcement: Enforcement::Block,
            tier: Preset::Enterprise,
            logic: RuleLogic::new(Expr::lt(
                Expr::field("work_item.metadata.test_coverage"),
                Expr::config("min_coverage"),
            )),
            config: json!({
                "entity": "work_item",
                "types": DELIVERY,
                "on_status": ["done"],
                "min_coverage": 90.0,
                "message": "Test coverage {work_item.metadata.test_coverage}% is below the required {min_coverage}%"
            }),
        },
        RuleDefinition {
            code: "SEC-001".into(),
            name: "Security review coverage".into(),
            description: "Security work should include review and testing tasks".into(),
            category: "security",
            enforcement: Enforcement::Limit,
            tier: Preset::Enterprise,
            logic: RuleLogic::new(Expr::not(Expr::is_empty(missing_security_tasks.clone())))
                .with_detail(missing_security_tasks),
            config: json!({
                "entity": "work_item",
                "types": ["security"],
                "on_status": ["review"],
                "required": ["review", "testing"],
                "message": "Security work is missing: {detail}"
            }),
        },
    ]
}

fn enhancement_rules() -> Vec<RuleDefinition> {
    vec![
        RuleDefinition {
            code: "ENH-001".into(),
            name: "Batch tiny tasks".into(),
            description: "Very small tasks can often be batched together".into(),
            category: "enhancement",
            enforcement: Enforcement::Enhance,
            tier: Preset::Enterprise,
            logic: RuleLogic::new(Expr::lt(
                Expr::field("task.effort_hours"),
                Expr::config("min_hours"),
            )),
            config: json!({
                "entity": "task",
                "on_status": ["ready"],
                "min_hours": 0.5,
                "message": "Task is under {min_hours}h, consider batching it with related work"
            }),
        },
        RuleDefinition {
            code: "ENH-002".into(),
            name: "Decision log".into(),
            description: "Research and planning outcomes are easier to reuse with a decision log".into(),
            category: "enhancement",
            enforcement: Enforcement::Enhance,
            tier: Preset::Enterprise,
            logic: RuleLogic::new(Expr::is_empty(Expr::field("work_item.metadata.decision_log"))),
            config: json!({
                "entity": "work_item",
                "types": ["research", "planning"],
                "on_status": ["review"],
                "message": "Consider recording a decision log in metadata"
            }),
        },
    ]
}

/// Per-type estimate ceilings, softer than `EST-001`.
fn estimate_ceilings() -> Vec<RuleDefinition> {
    const CEILINGS: &[(&str, f64)] = &[
        ("feature", 80.0),
        ("enhancement", 40.0),
        ("bugfix", 16.0),
        ("research", 24.0),
        ("planning", 16.0),
        ("refactoring", 40.0),
        ("maintenance", 160.0),
        ("monitoring", 160.0),
        ("documentation", 40.0),
        ("security", 80.0),
        ("fix_backlog", 160.0),
    ];

    CEILINGS
        .iter()
        .enumerate()
        .map(|(i, &(item_type, max_estimate))| RuleDefinition {
            code: format!("EST-{}", 101 + i),
            name: format!("Estimate ceiling: {}", item_type),
            description: format!("{} work items above {}h are usually worth splitting", item_type, max_estimate),
            category: "estimation",
            enforcement: Enforcement::Limit,
            tier: Preset::Standard,
            logic: RuleLogic::new(Expr::gt(
                Expr::field("work_item.effort_estimate"),
                Expr::config("max_estimate"),
            )),
            config: json!({
                "entity": "work_item",
                "types": [item_type],
                "on_status": ["ready", "active"],
                "max_estimate": max_estimate,
                "message": "Estimate {work_item.effort_estimate}h exceeds {max_estimate}h for a {work_item.type}"
            }),
        })
        .collect()
}

/// Task-scoped families, one rule per task type.
fn task_rules() -> Vec<RuleDefinition> {
    let mut rules = Vec::new();

    for (i, &(_, task_type, max_hours)) in TIME_BOXES.iter().enumerate() {
        rules.push(RuleDefinition {
            code: format!("DOC-{}", 201 + i),
            name: format!("Task description: {}", task_type),
            description: "Tasks should describe the work before it starts".to_string(),
            category: "documentation",
            enforcement: Enforcement::Guide,
            tier: Preset::Professional,
            logic: RuleLogic::new(Expr::is_empty(Expr::field("task.description"))),
            config: json!({
                "entity": "task",
                "types": [task_type],
                "on_status": ["active"],
                "message": "{task.type} task has no description"
            }),
        });

        rules.push(RuleDefinition {
            code: format!("EST-{}", 201 + i),
            name: format!("Task estimate before ready: {}", task_type),
            description: "Tasks should be estimated before they are marked ready".to_string(),
            category: "estimation",
            enforcement: Enforcement::Guide,
            tier: Preset::Professional,
            logic: RuleLogic::new(Expr::is_empty(Expr::field("task.effort_hours"))),
            config: json!({
                "entity": "task",
                "types": [task_type],
                "on_status": ["ready"],
                "message": "{task.type} task has no effort estimate"
            }),
        });

        rules.push(RuleDefinition {
            code: format!("TIME-{}", 301 + i),
            name: format!("Critical time-box: {}", task_type),
            description: "Critical tasks get half the usual time-box".to_string(),
            category: "time_boxing",
            enforcement: Enforcement::Limit,
            tier: Preset::Enterprise,
            logic: RuleLogic::new(Expr::all(vec![
                Expr::compare(CmpOp::Eq, Expr::field("task.priority"), Expr::literal("critical")),
                Expr::gt(Expr::field("task.effort_hours"), Expr::config("max_hours")),
            ])),
            config: json!({
                "entity": "task",
                "types": [task_type],
                "on_status": ["ready", "active"],
                "max_hours": max_hours / 2.0,
                "message": "Critical {task.type} task effort {task.effort_hours}h exceeds {max_hours}h"
            }),
        });

        rules.push(RuleDefinition {
            code: format!("ENH-{}", 301 + i),
            name: format!("Pairing suggestion: {}", task_type),
            description: "Long tasks go faster with a second pair of eyes".to_string(),
            category: "enhancement",
            enforcement: Enforcement::Enhance,
            tier: Preset::Enterprise,
            logic: RuleLogic::new(Expr::compare(
                CmpOp::Ge,
                Expr::field("task.effort_hours"),
                Expr::config("pair_hours"),
            )),
            config: json!({
                "entity": "task",
                "types": [task_type],
                "on_status": ["active"],
                "pair_hours": max_hours * 0.75,
                "message": "{task.type} task of {task.effort_hours}h, consider pairing"
            }),
        });
    }

    rules
}

/// A metadata key some work item types are expected to record before a status.
struct Artefact {
    prefix: &'static str,
    first: usize,
    key: &'static str,
    label: &'static str,
    category: &'static str,
    types: &'static [&'static str],
    on_status: &'static [&'static str],
    enforcement: Enforcement,
    tier: Preset,
}

impl Artefact {
    fn rules(&self) -> Vec<RuleDefinition> {
        let field = format!("work_item.metadata.{}", self.key);
        self.types
            .iter()
            .enumerate()
            .map(|(i, item_type)| RuleDefinition {
                code: format!("{}-{}", self.prefix, self.first + i),
                name: format!("{}: {}", self.label, item_type),
                description: format!(
                    "{} work items record {} in metadata `{}` before {}",
                    item_type,
                    self.label.to_lowercase(),
                    self.key,
                    self.on_status.join(" or ")
                ),
                category: self.category,
                enforcement: self.enforcement,
                tier: self.tier,
                logic: RuleLogic::new(Expr::is_empty(Expr::field(field.clone()))),
                config: json!({
                    "entity": "work_item",
                    "types": [item_type],
                    "on_status": self.on_status,
                    "message": format!("{} missing, set metadata `{}`", self.label, self.key)
                }),
            })
            .collect()
    }
}

const ARTEFACTS: &[Artefact] = &[
    // Standard
    Artefact {
        prefix: "QA",
        first: 101,
        key: "acceptance_criteria",
        label: "Acceptance criteria",
        category: "quality",
        types: FINITE,
        on_status: &["review"],
        enforcement: Enforcement::Guide,
        tier: Preset::Standard,
    },
    Artefact {
        prefix: "DOC",
        first: 101,
        key: "changelog_entry",
        label: "Changelog entry",
        category: "documentation",
        types: &["feature", "enhancement", "bugfix"],
        on_status: &["done"],
        enforcement: Enforcement::Guide,
        tier: Preset::Standard,
    },
    Artefact {
        prefix: "WF",
        first: 101,
        key: "owner",
        label: "Owner",
        category: "workflow",
        types: ALL_ITEM_TYPES,
        on_status: &["active"],
        enforcement: Enforcement::Guide,
        tier: Preset::Standard,
    },
    // Professional
    Artefact {
        prefix: "QA",
        first: 201,
        key: "test_plan",
        label: "Test plan",
        category: "quality",
        types: &["feature", "enhancement", "bugfix", "refactoring", "security"],
        on_status: &["active"],
        enforcement: Enforcement::Limit,
        tier: Preset::Professional,
    },
    Artefact {
        prefix: "OPS",
        first: 201,
        key: "rollback_plan",
        label: "Rollback plan",
        category: "operations",
        types: &["feature", "enhancement", "bugfix", "refactoring", "security", "maintenance"],
        on_status: &["review"],
        enforcement: Enforcement::Limit,
        tier: Preset::Professional,
    },
    Artefact {
        prefix: "OPS",
        first: 211,
        key: "release_notes",
        label: "Release notes",
        category: "operations",
        types: &["feature", "enhancement", "bugfix"],
        on_status: &["done"],
        enforcement: Enforcement::Guide,
        tier: Preset::Professional,
    },
    Artefact {
        prefix: "SEC",
        first: 201,
        key: "security_impact",
        label: "Security impact assessment",
        category: "security",
        types: &["feature", "enhancement", "bugfix", "refactoring", "maintenance"],
        on_status: &["review"],
        enforcement: Enforcement::Limit,
        tier: Preset::Professional,
    },
    Artefact {
        prefix: "RISK",
        first: 201,
        key: "risk_assessment",
        label: "Risk assessment",
        category: "risk",
        types: ALL_ITEM_TYPES,
        on_status: &["active"],
        enforcement: Enforcement::Guide,
        tier: Preset::Professional,
    },
    Artefact {
        prefix: "DOC",
        first: 221,
        key: "design_doc",
        label: "Design document",
        category: "documentation",
        types: &["feature", "enhancement", "refactoring", "security", "planning"],
        on_status: &["active"],
        enforcement: Enforcement::Limit,
        tier: Preset::Professional,
    },
    // Enterprise
    Artefact {
        prefix: "SEC",
        first: 301,
        key: "threat_model",
        label: "Threat model",
        category: "security",
        types: &["feature", "enhancement", "refactoring", "security"],
        on_status: &["active"],
        enforcement: Enforcement::Limit,
        tier: Preset::Enterprise,
    },
    Artefact {
        prefix: "SEC",
        first: 311,
        key: "security_signoff",
        label: "Security sign-off",
        category: "security",
        types: DELIVERY,
        on_status: &["done"],
        enforcement: Enforcement::Block,
        tier: Preset::Enterprise,
    },
    Artefact {
        prefix: "SEC",
        first: 321,
        key: "dependency_scan",
        label: "Dependency scan",
        category: "security",
        types: &["feature", "enhancement", "bugfix", "refactoring", "security", "maintenance"],
        on_status: &["review"],
        enforcement: Enforcement::Limit,
        tier: Preset::Enterprise,
    },
    Artefact {
        prefix: "COMP",
        first: 301,
        key: "compliance_review",
        label: "Compliance review",
        category: "compliance",
        types: ALL_ITEM_TYPES,
        on_status: &["review"],
        enforcement: Enforcement::Limit,
        tier: Preset::Enterprise,
    },
    Artefact {
        prefix: "OPS",
        first: 301,
        key: "runbook",
        label: "Runbook",
        category: "operations",
        types: ALL_ITEM_TYPES,
        on_status: &["review"],
        enforcement: Enforcement::Limit,
        tier: Preset::Enterprise,
    },
    Artefact {
        prefix: "OPS",
        first: 321,
        key: "monitoring_plan",
        label: "Monitoring plan",
        category: "operations",
        types: &["feature", "enhancement", "bugfix", "refactoring", "monitoring", "maintenance"],
        on_status: &["review"],
        enforcement: Enforcement::Limit,
        tier: Preset::Enterprise,
    },
    Artefact {
        prefix: "OPS",
        first: 331,
        key: "sla",
        label: "Service level target",
        category: "operations",
        types: &["maintenance", "monitoring", "fix_backlog", "security"],
        on_status: &["active"],
        enforcement: Enforcement::Guide,
        tier: Preset::Enterprise,
    },
    Artefact {
        prefix: "QA",
        first: 301,
        key: "performance_baseline",
        label: "Performance baseline",
        category: "quality",
        types: &["feature", "enhancement", "refactoring"],
        on_status: &["review"],
        enforcement: Enforcement::Guide,
        tier: Preset::Enterprise,
    },
    Artefact {
        prefix: "QA",
        first: 311,
        key: "regression_test",
        label: "Regression test",
        category: "quality",
        types: &["bugfix", "fix_backlog", "refactoring"],
        on_status: &["review"],
        enforcement: Enforcement::Limit,
        tier: Preset::Enterprise,
    },
    Artefact {
        prefix: "AUD",
        first: 301,
        key: "approver",
        label: "Approver",
        category: "audit",
        types: FINITE,
        on_status: &["done"],
        enforcement: Enforcement::Limit,
        tier: Preset::Enterprise,
    },
    Artefact {
        prefix: "AUD",
        first: 311,
        key: "audit_trail",
        label: "Audit trail",
        category: "audit",
        types: ALL_ITEM_TYPES,
        on_status: &["review"],
        enforcement: Enforcement::Guide,
        tier: Preset::Enterprise,
    },
    Artefact {
        prefix: "DOC",
        first: 301,
        key: "api_docs",
        label: "API documentation",
        category: "documentation",
        types: &["feature", "enhancement"],
        on_status: &["review"],
        enforcement: Enforcement::Limit,
        tier: Preset::Enterprise,
    },
    Artefact {
        prefix: "DOC",
        first: 311,
        key: "architecture_decision",
        label: "Architecture decision record",
        category: "documentation",
        types: &["feature", "refactoring", "planning", "research", "security"],
        on_status: &["review"],
        enforcement: Enforcement::Guide,
        tier: Preset::Enterprise,
    },
    Artefact {
        prefix: "DOC",
        first: 321,
        key: "user_guide",
        label: "User guide",
        category: "documentation",
        types: &["feature", "enhancement"],
        on_status: &["done"],
        enforcement: Enforcement::Guide,
        tier: Preset::Enterprise,
    },
    Artefact {
        prefix: "EST",
        first: 301,
        key: "actual_hours",
        label: "Actual hours",
        category: "estimation",
        types: FINITE,
        on_status: &["done"],
        enforcement: Enforcement::Guide,
        tier: Preset::Enterprise,
    },
    Artefact {
        prefix: "WF",
        first: 301,
        key: "stakeholder",
        label: "Stakeholder",
        category: "workflow",
        types: ALL_ITEM_TYPES,
        on_status: &["ready"],
        enforcement: Enforcement::Guide,
        tier: Preset::Enterprise,
    },
];

/// Critical work items explain why they are critical before they start.
fn priority_rationale_rules() -> Vec<RuleDefinition> {
    ALL_ITEM_TYPES
        .iter()
        .enumerate()
        .map(|(i, item_type)| RuleDefinition {
            code: format!("WF-{}", 321 + i),
            name: format!("Priority rationale: {}", item_type),
            description: "Critical work items record why they are critical".to_string(),
            category: "workflow",
            enforcement: Enforcement::Limit,
            tier: Preset::Enterprise,
            logic: RuleLogic::new(Expr::all(vec![
                Expr::compare(CmpOp::Eq, Expr::field("work_item.priority"), Expr::literal("critical")),
                Expr::is_empty(Expr::field("work_item.metadata.priority_rationale")),
            ])),
            config: json!({
                "entity": "work_item",
                "types": [item_type],
                "on_status": ["active"],
                "message": "Critical {work_item.type} has no priority rationale"
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::RuleScope;
    use std::collections::HashSet;

    fn count(preset: Preset) -> usize {
        preset_rules(preset).len()
    }

    #[test]
    fn test_codes_are_unique() {
        let rules = catalog();
        let codes: HashSet<_> = rules.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes.len(), rules.len());
    }

    #[test]
    fn test_presets_are_nested() {
        assert!(count(Preset::Minimal) < count(Preset::Standard));
        assert!(count(Preset::Standard) < count(Preset::Professional));
        assert!(count(Preset::Professional) < count(Preset::Enterprise));
        assert_eq!(count(Preset::Enterprise), catalog().len());
    }

    #[test]
    fn test_tier_sizes() {
        assert_eq!(count(Preset::Minimal), 15);
        assert_eq!(count(Preset::Standard), 50);
        assert_eq!(count(Preset::Professional), 111);
        assert_eq!(count(Preset::Enterprise), 245);
    }

    #[test]
    fn test_every_scope_is_readable() {
        for rule in catalog() {
            assert!(
                RuleScope::from_config(&rule.config).is_ok(),
                "{} has an unreadable scope",
                rule.code
            );
        }
    }

    #[test]
    fn test_minimal_contains_core_gates() {
        let rules = preset_rules(Preset::Minimal);
        let codes: Vec<_> = rules.iter().map(|r| r.code.as_str()).collect();
        assert!(codes.contains(&"TIME-001"));
        assert!(codes.contains(&"WF-001"));
        assert!(!codes.contains(&"QA-001"));
        assert!(rules.iter().all(|r| r.enforcement == Enforcement::Block));
    }

    #[test]
    fn test_time_box_defaults() {
        let rules = catalog();
        let max_for = |code: &str| {
            rules
                .iter()
                .find(|r| r.code == code)
                .and_then(|r| r.config["max_hours"].as_f64())
        };
        assert_eq!(max_for("TIME-001"), Some(4.0));
        assert_eq!(max_for("TIME-002"), Some(6.0));
        assert_eq!(max_for("TIME-003"), Some(8.0));
        assert_eq!(max_for("TIME-004"), Some(4.0));
        assert_eq!(max_for("TIME-005"), Some(2.0));
        assert_eq!(max_for("TIME-006"), Some(2.0));
        assert_eq!(max_for("TIME-301"), Some(2.0));
    }

    #[test]
    fn test_artefact_rules_are_scoped_per_type() {
        let rules = catalog();
        let signoff: Vec<_> = rules
            .iter()
            .filter(|r| r.code.starts_with("SEC-31"))
            .collect();

        assert_eq!(signoff.len(), DELIVERY.len());
        assert_eq!(signoff[0].code, "SEC-311");
        assert_eq!(signoff[0].config["types"], json!(["feature"]));
        assert_eq!(signoff[0].enforcement, Enforcement::Block);
    }

    #[test]
    fn test_preset_parsing() {
        assert_eq!(Preset::from_str("enterprise"), Some(Preset::Enterprise));
        assert_eq!(Preset::from_str("huge"), None);
        assert_eq!(Preset::default(), Preset::Standard);
    }
}
