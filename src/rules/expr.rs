//! Rule expression language.
//!
//! A rule's check is a small tree of tagged nodes, stored as JSON alongside the
//! rule. One interpreter walks the tree over a [`Facts`] map and the rule's
//! config payload. Evaluation is total: missing facts evaluate to `null`, and a
//! comparison involving `null` is false, so a rule whose inputs are absent is
//! simply not violated.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The check attached to a rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleLogic {
    /// Truthy result means the rule is violated.
    pub violation: Expr,
    /// Optional value describing the violation, rendered into `{detail}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Expr>,
}

impl RuleLogic {
    pub fn new(violation: Expr) -> Self {
        Self {
            violation,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: Expr) -> Self {
        self.detail = Some(detail);
        self
    }
}

/// A node in a rule expression.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Expr {
    /// An attribute of the entity under evaluation, e.g. `task.effort_hours`.
    Field { name: String },
    /// A dotted path into the rule's config payload, e.g. `max_hours`.
    Config { key: String },
    Literal { value: Value },
    /// `map[key]` where `map` is an object and `key` evaluates to a string.
    Lookup { map: Box<Expr>, key: Box<Expr> },
    Compare {
        cmp: CmpOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    All { of: Vec<Expr> },
    Any { of: Vec<Expr> },
    Not { expr: Box<Expr> },
    /// Elements of `required` that do not appear in `present`.
    Missing {
        required: Box<Expr>,
        present: Box<Expr>,
    },
    /// True for null, empty strings, empty arrays and empty objects.
    IsEmpty { expr: Box<Expr> },
    Len { expr: Box<Expr> },
    Contains { list: Box<Expr>, item: Box<Expr> },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CmpOp {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    Ne,
}

impl Expr {
    pub fn field(name: impl Into<String>) -> Self {
        Expr::Field { name: name.into() }
    }

    pub fn config(key: impl Into<String>) -> Self {
        Expr::Config { key: key.into() }
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal {
            value: value.into(),
        }
    }

    pub fn lookup(map: Expr, key: Expr) -> Self {
        Expr::Lookup {
            map: Box::new(map),
            key: Box::new(key),
        }
    }

    pub fn compare(cmp: CmpOp, left: Expr, right: Expr) -> Self {
        Expr::Compare {
            cmp,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn gt(left: Expr, right: Expr) -> Self {
        Self::compare(CmpOp::Gt, left, right)
    }

    pub fn lt(left: Expr, right: Expr) -> Self {
        Self::compare(CmpOp::Lt, left, right)
    }

    pub fn all(of: Vec<Expr>) -> Self {
        Expr::All { of }
    }

    pub fn any(of: Vec<Expr>) -> Self {
        Expr::Any { of }
    }

    pub fn not(expr: Expr) -> Self {
        Expr::Not {
            expr: Box::new(expr),
        }
    }

    pub fn missing(required: Expr, present: Expr) -> Self {
        Expr::Missing {
            required: Box::new(required),
            present: Box::new(present),
        }
    }

    pub fn is_empty(expr: Expr) -> Self {
        Expr::IsEmpty {
            expr: Box::new(expr),
        }
    }

    pub fn len(expr: Expr) -> Self {
        Expr::Len {
            expr: Box::new(expr),
        }
    }

    pub fn contains(list: Expr, item: Expr) -> Self {
        Expr::Contains {
            list: Box::new(list),
            item: Box::new(item),
        }
    }

    /// Evaluate this expression against an entity's facts and a rule config.
    pub fn eval(&self, facts: &Facts, config: &Value) -> Value {
        match self {
            Expr::Field { name } => facts.get(name).cloned().unwrap_or(Value::Null),
            Expr::Config { key } => config_path(config, key).cloned().unwrap_or(Value::Null),
            Expr::Literal { value } => value.clone(),
            Expr::Lookup { map, key } => {
                let map = map.eval(facts, config);
                let key = key.eval(facts, config);
                match (map, key) {
                    (Value::Object(obj), Value::String(k)) => {
                        obj.get(&k).cloned().unwrap_or(Value::Null)
                    }
                    _ => Value::Null,
                }
            }
            Expr::Compare { cmp, left, right } => {
                let l = left.eval(facts, config);
                let r = right.eval(facts, config);
                Value::Bool(compare(*cmp, &l, &r))
            }
            Expr::All { of } => Value::Bool(of.iter().all(|e| truthy(&e.eval(facts, config)))),
            Expr::Any { of } => Value::Bool(of.iter().any(|e| truthy(&e.eval(facts, config)))),
            Expr::Not { expr } => Value::Bool(!truthy(&expr.eval(facts, config))),
            Expr::Missing { required, present } => {
                let required = required.eval(facts, config);
                let present = present.eval(facts, config);
                let present = present.as_array().map(Vec::as_slice).unwrap_or(&[]);
                let missing = required
                    .as_array()
                    .map(|req| {
                        req.iter()
                            .filter(|r| !present.contains(r))
                            .cloned()
                            .collect::<Vec<_>>()
                    })
                    .unwrap_or_default();
                Value::Array(missing)
            }
            Expr::IsEmpty { expr } => Value::Bool(is_empty_value(&expr.eval(facts, config))),
            Expr::Len { expr } => match expr.eval(facts, config) {
                Value::Array(a) => Value::from(a.len()),
                Value::String(s) => Value::from(s.chars().count()),
                Value::Object(o) => Value::from(o.len()),
                _ => Value::Null,
            },
            Expr::Contains { list, item } => {
                let list = list.eval(facts, config);
                let item = item.eval(facts, config);
                Value::Bool(list.as_array().is_some_and(|a| a.contains(&item)))
            }
        }
    }

    /// Evaluate and collapse the result to a boolean.
    pub fn holds(&self, facts: &Facts, config: &Value) -> bool {
        truthy(&self.eval(facts, config))
    }
}

/// Attribute values of the entity a rule is evaluated against.
///
/// Keys are dotted names such as `task.type` or `work_item.metadata.owner`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Facts {
    values: BTreeMap<String, Value>,
}

impl Facts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Flatten a JSON object's top-level keys under `prefix`.
    pub fn insert_object(&mut self, prefix: &str, object: &Value) {
        if let Value::Object(map) = object {
            for (key, value) in map {
                self.values
                    .insert(format!("{}.{}", prefix, key), value.clone());
            }
        }
    }
}

/// Render `{name}` placeholders from facts, then config, then the `detail` value.
pub fn render_template(template: &str, facts: &Facts, config: &Value, detail: &Value) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };

        let name = &after[..end];
        let value = if name == "detail" {
            Some(detail)
        } else {
            facts.get(name).or_else(|| config_path(config, name))
        };

        match value {
            Some(v) => out.push_str(&display_value(v)),
            None => {
                out.push('{');
                out.push_str(name);
                out.push('}');
            }
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

/// Human-readable form of a value: strings unquoted, arrays comma-joined.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "none".to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(display_value)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

fn config_path<'a>(config: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(config, |current, segment| current.get(segment))
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

fn compare(cmp: CmpOp, left: &Value, right: &Value) -> bool {
    use std::cmp::Ordering;

    if left.is_null() || right.is_null() {
        return false;
    }

    let ordering = match (left, right) {
        (Value::Number(l), Value::Number(r)) => match (l.as_f64(), r.as_f64()) {
            (Some(l), Some(r)) => l.partial_cmp(&r),
            _ => None,
        },
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        _ => None,
    };

    match (cmp, ordering) {
        (CmpOp::Gt, Some(o)) => o == Ordering::Greater,
        (CmpOp::Ge, Some(o)) => o != Ordering::Less,
        (CmpOp::Lt, Some(o)) => o == Ordering::Less,
        (CmpOp::Le, Some(o)) => o != Ordering::Greater,
        (CmpOp::Eq, Some(o)) => o == Ordering::Equal,
        (CmpOp::Ne, Some(o)) => o != Ordering::Equal,
        (CmpOp::Eq, None) => left == right,
        (CmpOp::Ne, None) => left != right,
        _ => false,
    }
}
