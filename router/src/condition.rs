use crate::ast::{Expr, Literal};
use crate::parser::parse;
use eventbridge_common::{Error, Result};
use serde_json::Value;

/// A compiled predicate over an effective event object. Immutable once
/// constructed; compiling never suspends and evaluating never suspends
/// (§5: "The router and the condition evaluator MUST NOT suspend").
#[derive(Debug, Clone)]
pub struct RoutingCondition {
    source: String,
    expr: Expr,
}

impl RoutingCondition {
    /// Compiles `source` into an AST. Fails with `InvalidRoutingCondition`
    /// at configure time, never at evaluation time.
    pub fn compile(source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let expr = parse(&source).map_err(|err| {
            Error::InvalidRoutingCondition(format!("{source:?}: {err}"))
        })?;
        Ok(Self { source, expr })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Evaluates the condition against `event`, a JSON object (typically the
    /// event envelope augmented with a synthetic `source` field, per §4.6).
    pub fn matches(&self, event: &Value) -> bool {
        eval(&self.expr, event)
    }
}

fn resolve_path<'a>(value: &'a Value, path: &[String]) -> Option<&'a Value> {
    let mut current = value;
    for segment in path {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn is_null(value: Option<&Value>) -> bool {
    matches!(value, None) || matches!(value, Some(Value::Null))
}

fn scalar_eq(value: &Value, literal: &Literal) -> bool {
    match literal {
        Literal::Str(s) => value.as_str() == Some(s.as_str()),
        Literal::Int(n) => value.as_i64() == Some(*n),
        Literal::Bool(b) => value.as_bool() == Some(*b),
        Literal::Null => unreachable!("null is handled by `is_null` before reaching scalar_eq"),
    }
}

/// Equality of a resolved path value against a literal, honoring the
/// `== null` / `!= null` special case (§4.5).
fn equals(resolved: Option<&Value>, literal: &Literal) -> bool {
    match literal {
        Literal::Null => is_null(resolved),
        _ => !is_null(resolved) && scalar_eq(resolved.unwrap(), literal),
    }
}

/// Comparison result for `==` (`negate = false`) or `!=` (`negate = true`),
/// applying "comparisons with null yield false except for explicit
/// `== null` / `!= null`" to both directions.
fn compare(resolved: Option<&Value>, literal: &Literal, negate: bool) -> bool {
    if is_null(resolved) && !matches!(literal, Literal::Null) {
        return false;
    }
    let eq = equals(resolved, literal);
    if negate {
        !eq
    } else {
        eq
    }
}

fn eval(expr: &Expr, event: &Value) -> bool {
    match expr {
        Expr::Eq(path, literal) => compare(resolve_path(event, path), literal, false),
        Expr::Neq(path, literal) => compare(resolve_path(event, path), literal, true),
        Expr::In(path, literals) => {
            let resolved = resolve_path(event, path);
            literals.iter().any(|literal| compare(resolved, literal, false))
        }
        Expr::And(lhs, rhs) => eval(lhs, event) && eval(rhs, event),
        Expr::Or(lhs, rhs) => eval(lhs, event) || eval(rhs, event),
        Expr::Not(inner) => !eval(inner, event),
    }
}
