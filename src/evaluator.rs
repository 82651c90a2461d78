//! Operation Evaluator and Result Combiner
//!
//! Operands of the wrong type make a comparison false, never an error.
//! Errors only come from resolving operands.

use serde_json::Value;

use crate::condition::{Comparator, Connective, Operation};
use crate::context::{Context, EntityKind, EvaluationEvent};
use crate::engine::EngineError;
use crate::placeholder::resolve;

/// Everything a comparison may look at besides its operands.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationScope<'a> {
    pub context: &'a Context,
    pub event: Option<EvaluationEvent>,
    pub entity: Option<EntityKind>,
}

impl EvaluationScope<'_> {
    /// Change detection only applies to ticket modifications.
    pub fn tracks_changes(&self) -> bool {
        self.event == Some(EvaluationEvent::Modification) && self.entity == Some(EntityKind::Ticket)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationResult {
    pub verdict: bool,
    pub connective: Option<Connective>,
}

pub fn evaluate(operation: &Operation, scope: &EvaluationScope) -> Result<OperationResult, EngineError> {
    let result = |verdict| OperationResult {
        verdict,
        connective: operation.connective,
    };

    if operation.comparator.is_change_detection() && !scope.tracks_changes() {
        return Ok(result(false));
    }

    let left = resolve(&operation.left, scope.context)?;
    let right = resolve(&operation.right, scope.context)?;
    let verdict = compare(&left, operation.comparator, &right, scope)?;

    Ok(result(verdict))
}

fn compare(
    left: &Value,
    comparator: Comparator,
    right: &Value,
    scope: &EvaluationScope,
) -> Result<bool, EngineError> {
    let verdict = match comparator {
        Comparator::Equal => strict_eq(left, right),
        Comparator::NotEqual => !strict_eq(left, right),
        Comparator::ChangedTo => {
            // Membership is tested against every field of the previous
            // snapshot, not only the field being compared.
            let previous = scope
                .context
                .previous_ticket()
                .ok_or(EngineError::MissingPreviousSnapshot)?;
            strict_eq(left, right) && !previous.values().any(|v| strict_eq(v, right))
        }
        Comparator::ChangedIs => {
            let previous = scope
                .context
                .previous_ticket()
                .ok_or(EngineError::MissingPreviousSnapshot)?;
            let was_present = previous.values().any(|v| strict_eq(v, left));
            matches!(right, Value::Bool(expected) if *expected == !was_present)
        }
        Comparator::BlankIs => match (left, right) {
            (Value::String(s), Value::Bool(expected)) => s.is_empty() == *expected,
            _ => false,
        },
        Comparator::Contains => str_pair(left, right).is_some_and(|(l, r)| l.contains(r)),
        Comparator::StartsWith => str_pair(left, right).is_some_and(|(l, r)| l.starts_with(r)),
        Comparator::EndsWith => str_pair(left, right).is_some_and(|(l, r)| l.ends_with(r)),
    };
    Ok(verdict)
}

fn str_pair<'v>(left: &'v Value, right: &'v Value) -> Option<(&'v str, &'v str)> {
    Some((left.as_str()?, right.as_str()?))
}

/// Type-strict equality. Numbers compare by value, so `2` equals `2.0`.
pub fn strict_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => match (l.as_f64(), r.as_f64()) {
            (Some(l), Some(r)) => l == r,
            _ => l == r,
        },
        _ => left == right,
    }
}

/// Fold results left to right. Each result joins the accumulated value
/// through its own connective.
pub fn combine(results: &[OperationResult]) -> Result<bool, EngineError> {
    let (first, rest) = results.split_first().ok_or(EngineError::EmptyCondition)?;

    Ok(rest.iter().fold(first.verdict, |acc, result| match result.connective {
        Some(Connective::Or) => acc || result.verdict,
        Some(Connective::And) | None => acc && result.verdict,
    }))
}

/// Evaluate every operation, then combine. Operations are not
/// short-circuited, so a bad reference anywhere fails the condition.
pub fn evaluate_condition(operations: &[Operation], scope: &EvaluationScope) -> Result<bool, EngineError> {
    let results = operations
        .iter()
        .map(|operation| evaluate(operation, scope))
        .collect::<Result<Vec<_>, _>>()?;
    combine(&results)
}
