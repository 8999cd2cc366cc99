// crates/aegisflux-correlator/src/rules/predicate.rs
// ============================================================================
// Module: Rule Predicates
// Description: Compiled field predicates over enriched-event JSON.
// Purpose: Parse `where` mappings once and evaluate them cheaply per event.
// Dependencies: aegisflux-core, serde_json
// ============================================================================

//! ## Overview
//! A rule's `where` mapping pairs dotted event paths with matchers. A bare
//! JSON scalar means equality; an object selects operators (`eq`, `ne`,
//! `gt`, `gte`, `lt`, `lte`, `contains`, `prefix`, `in`, `exists`). All
//! checks AND together. Compilation rejects unknown operators so a typo in a
//! rule file fails the load instead of silently matching nothing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use aegisflux_core::CoreError;
use serde_json::Value;

// ============================================================================
// SECTION: Match Operators
// ============================================================================

/// One compiled field check.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOp {
    /// Field equals the value.
    Eq(Value),
    /// Field differs from the value.
    Ne(Value),
    /// Numeric field is strictly greater.
    Gt(f64),
    /// Numeric field is greater or equal.
    Gte(f64),
    /// Numeric field is strictly less.
    Lt(f64),
    /// Numeric field is less or equal.
    Lte(f64),
    /// String field contains the needle.
    Contains(String),
    /// String field starts with the prefix.
    Prefix(String),
    /// Field equals one of the listed values.
    In(Vec<Value>),
    /// Field presence matches the flag.
    Exists(bool),
}

impl MatchOp {
    /// Evaluates the operator against a resolved field value.
    #[must_use]
    fn eval(&self, field: Option<&Value>) -> bool {
        match self {
            Self::Exists(expected) => field.is_some() == *expected,
            Self::Eq(expected) => field == Some(expected),
            Self::Ne(expected) => field != Some(expected),
            Self::Gt(bound) => number(field).is_some_and(|value| value > *bound),
            Self::Gte(bound) => number(field).is_some_and(|value| value >= *bound),
            Self::Lt(bound) => number(field).is_some_and(|value| value < *bound),
            Self::Lte(bound) => number(field).is_some_and(|value| value <= *bound),
            Self::Contains(needle) => {
                field.and_then(Value::as_str).is_some_and(|value| value.contains(needle))
            }
            Self::Prefix(prefix) => {
                field.and_then(Value::as_str).is_some_and(|value| value.starts_with(prefix))
            }
            Self::In(allowed) => field.is_some_and(|value| allowed.contains(value)),
        }
    }
}

/// Extracts a float from a JSON number field.
fn number(field: Option<&Value>) -> Option<f64> {
    field.and_then(Value::as_f64)
}

// ============================================================================
// SECTION: Compiled Predicate
// ============================================================================

/// One field check bound to its dotted path.
#[derive(Debug, Clone, PartialEq)]
struct FieldCheck {
    /// Path segments into the event JSON.
    path: Vec<String>,
    /// Operator applied to the resolved value.
    op: MatchOp,
}

/// A compiled conjunction of field checks.
///
/// # Invariants
/// - Checks are evaluated in declaration order and AND together.
/// - An empty predicate matches every event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledPredicate {
    /// Compiled checks in declaration order.
    checks: Vec<FieldCheck>,
}

impl CompiledPredicate {
    /// Compiles a `where` mapping.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidInput`] for unknown operators or
    /// non-numeric bounds on comparison operators.
    pub fn compile(where_clause: &BTreeMap<String, Value>) -> Result<Self, CoreError> {
        let mut checks = Vec::with_capacity(where_clause.len());
        for (path, matcher) in where_clause {
            let segments: Vec<String> = path.split('.').map(ToString::to_string).collect();
            match matcher {
                Value::Object(ops) => {
                    for (op_name, operand) in ops {
                        checks.push(FieldCheck {
                            path: segments.clone(),
                            op: compile_op(path, op_name, operand)?,
                        });
                    }
                }
                literal => checks.push(FieldCheck {
                    path: segments,
                    op: MatchOp::Eq(literal.clone()),
                }),
            }
        }
        Ok(Self {
            checks,
        })
    }

    /// Evaluates the predicate against an event rendered as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidInput`] when the event value is not an
    /// object; the evaluator counts this as an invalid event rather than
    /// halting the pipeline.
    pub fn eval(&self, event: &Value) -> Result<bool, CoreError> {
        if !event.is_object() {
            return Err(CoreError::InvalidInput("event did not render as an object".to_string()));
        }
        Ok(self.checks.iter().all(|check| check.op.eval(resolve(event, &check.path))))
    }

    /// Returns the number of compiled checks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.checks.len()
    }

    /// Returns true when the predicate has no checks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

/// Compiles one operator object entry.
fn compile_op(path: &str, op_name: &str, operand: &Value) -> Result<MatchOp, CoreError> {
    let numeric = |operand: &Value| {
        operand.as_f64().ok_or_else(|| {
            CoreError::InvalidInput(format!("predicate {path}: {op_name} requires a number"))
        })
    };
    match op_name {
        "eq" => Ok(MatchOp::Eq(operand.clone())),
        "ne" => Ok(MatchOp::Ne(operand.clone())),
        "gt" => Ok(MatchOp::Gt(numeric(operand)?)),
        "gte" => Ok(MatchOp::Gte(numeric(operand)?)),
        "lt" => Ok(MatchOp::Lt(numeric(operand)?)),
        "lte" => Ok(MatchOp::Lte(numeric(operand)?)),
        "contains" => operand
            .as_str()
            .map(|needle| MatchOp::Contains(needle.to_string()))
            .ok_or_else(|| {
                CoreError::InvalidInput(format!("predicate {path}: contains requires a string"))
            }),
        "prefix" => operand
            .as_str()
            .map(|prefix| MatchOp::Prefix(prefix.to_string()))
            .ok_or_else(|| {
                CoreError::InvalidInput(format!("predicate {path}: prefix requires a string"))
            }),
        "in" => operand
            .as_array()
            .map(|allowed| MatchOp::In(allowed.clone()))
            .ok_or_else(|| {
                CoreError::InvalidInput(format!("predicate {path}: in requires an array"))
            }),
        "exists" => operand
            .as_bool()
            .map(MatchOp::Exists)
            .ok_or_else(|| {
                CoreError::InvalidInput(format!("predicate {path}: exists requires a boolean"))
            }),
        other => {
            Err(CoreError::InvalidInput(format!("predicate {path}: unknown operator {other}")))
        }
    }
}

/// Resolves a dotted path inside an event JSON object.
fn resolve<'a>(event: &'a Value, path: &[String]) -> Option<&'a Value> {
    let mut current = event;
    for segment in path {
        current = current.get(segment)?;
    }
    Some(current)
}
