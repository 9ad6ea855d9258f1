//! Rule catalog, loader and evaluator.
//!
//! - [`catalog`]: built-in rule definitions grouped into preset tiers
//! - [`expr`]: the expression language rules are written in
//! - [`RuleSet`]: a project's enabled rules, loaded from the store for one operation

pub mod catalog;
pub mod expr;

pub use catalog::{preset_rules, Preset, RuleDefinition};
pub use expr::{CmpOp, Expr, Facts, RuleLogic};

use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::db::Store;
use crate::error::Result;
use crate::models::{EntityKind, Rule, RuleViolation, Status};

/// Scope filters read from a rule's config payload.
///
/// Empty filters match everything.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RuleScope {
    #[serde(default)]
    pub entity: Option<EntityKind>,
    /// Work item or task type names (`feature`, `implementation`, ...).
    #[serde(default)]
    pub types: Vec<String>,
    /// Target statuses that trigger the rule.
    #[serde(default)]
    pub on_status: Vec<Status>,
}

impl RuleScope {
    /// Read the scope keys of a rule config. Other keys are ignored.
    pub fn from_config(config: &Value) -> serde_json::Result<Self> {
        serde_json::from_value(config.clone())
    }

    pub fn matches(&self, kind: EntityKind, type_name: &str, target: Status) -> bool {
        self.entity.is_none_or(|entity| entity == kind)
            && (self.types.is_empty() || self.types.iter().any(|t| t == type_name))
            && (self.on_status.is_empty() || self.on_status.contains(&target))
    }
}

/// The enabled rules of one project.
///
/// Loaded fresh inside each operation so toggles take effect immediately.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<(Rule, RuleScope)>,
}

impl RuleSet {
    /// Keep the enabled rules. A rule whose scope cannot be read is left out
    /// rather than applied everywhere.
    pub fn new(rules: Vec<Rule>) -> Self {
        let rules = rules
            .into_iter()
            .filter(|rule| rule.enabled)
            .filter_map(|rule| match RuleScope::from_config(&rule.config) {
                Ok(scope) => Some((rule, scope)),
                Err(e) => {
                    tracing::warn!(rule = %rule.code, "Skipping rule with malformed scope: {}", e);
                    None
                }
            })
            .collect();
        Self { rules }
    }

    pub fn load(store: &Store<'_>, project_id: Uuid) -> Result<Self> {
        Ok(Self::new(store.get_enabled_rules(project_id)?))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules whose scope covers this entity and target status.
    pub fn applicable<'a>(
        &'a self,
        kind: EntityKind,
        type_name: &'a str,
        target: Status,
    ) -> impl Iterator<Item = &'a Rule> + 'a {
        self.rules
            .iter()
            .filter(move |(_, scope)| scope.matches(kind, type_name, target))
            .map(|(rule, _)| rule)
    }

    /// Evaluate every applicable rule and collect all violations.
    ///
    /// Blocking violations come first; order is otherwise catalog order.
    pub fn evaluate(
        &self,
        kind: EntityKind,
        type_name: &str,
        target: Status,
        facts: &Facts,
    ) -> Vec<RuleViolation> {
        let mut violations: Vec<RuleViolation> = self
            .applicable(kind, type_name, target)
            .filter_map(|rule| check_rule(rule, facts))
            .collect();

        violations.sort_by_key(|v| !v.is_blocking());
        violations
    }
}

/// Evaluate one rule, returning a violation if its check holds.
pub fn check_rule(rule: &Rule, facts: &Facts) -> Option<RuleViolation> {
    if !rule.validation_logic.violation.holds(facts, &rule.config) {
        return None;
    }

    let detail = rule
        .validation_logic
        .detail
        .as_ref()
        .map(|d| d.eval(facts, &rule.config))
        .unwrap_or(Value::Null);

    let message = match rule.config.get("message").and_then(Value::as_str) {
        Some(template) => expr::render_template(template, facts, &rule.config, &detail),
        None => rule.description.clone(),
    };

    tracing::debug!(
        rule = %rule.code,
        enforcement = %rule.enforcement,
        "Rule violated: {}",
        message
    );

    Some(RuleViolation {
        rule_code: rule.code.clone(),
        rule_name: rule.name.clone(),
        category: rule.category.clone(),
        enforcement: rule.enforcement,
        message,
        detail,
    })
}
