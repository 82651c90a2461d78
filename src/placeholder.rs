//! Placeholder Resolver
//!
//! `{{ expr }}` resolves to a literal or to a dotted path into the
//! context. There are no default values: an unresolved reference is an
//! error for the whole render.

use regex::{Captures, Regex};
use serde_json::{Number, Value};
use std::sync::LazyLock;
use thiserror::Error;

use crate::context::{Context, ContextRoot};

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{\{\s*(.*?)\s*\}\}").unwrap());

pub const TRUE_LITERAL: &str = "VERDADERO";
pub const FALSE_LITERAL: &str = "FALSO";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("Empty placeholder expression")]
    EmptyExpression,

    #[error("Unknown context root '{0}'")]
    UnknownRoot(String),

    #[error("Context root '{0}' was not supplied")]
    MissingRoot(ContextRoot),

    #[error("Property '{segment}' is undefined in path '{path}'")]
    MissingProperty { path: String, segment: String },
}

/// Interpret a literal expression: quoted text, a number, or one of the
/// two boolean keywords. Returns `None` for anything else.
pub fn parse_literal(expr: &str) -> Option<Value> {
    let expr = expr.trim();

    if let Some(text) = unquote(expr) {
        return Some(Value::String(text.to_string()));
    }
    if expr.eq_ignore_ascii_case(TRUE_LITERAL) {
        return Some(Value::Bool(true));
    }
    if expr.eq_ignore_ascii_case(FALSE_LITERAL) {
        return Some(Value::Bool(false));
    }
    parse_number(expr).map(Value::Number)
}

fn unquote(expr: &str) -> Option<&str> {
    ['\'', '"'].into_iter().find_map(|quote| {
        if expr.len() >= 2 && expr.starts_with(quote) && expr.ends_with(quote) {
            Some(&expr[1..expr.len() - 1])
        } else {
            None
        }
    })
}

fn parse_number(expr: &str) -> Option<Number> {
    // Keeps "inf", "NaN" and friends out.
    let digits = expr.strip_prefix('-').unwrap_or(expr);
    if !digits.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    if let Ok(int) = expr.parse::<i64>() {
        return Some(Number::from(int));
    }
    expr.parse::<f64>().ok().and_then(Number::from_f64)
}

/// Resolve the inside of a placeholder token against the context.
pub fn resolve(expr: &str, context: &Context) -> Result<Value, ResolutionError> {
    let expr = expr.trim();
    if expr.is_empty() {
        return Err(ResolutionError::EmptyExpression);
    }
    if let Some(literal) = parse_literal(expr) {
        return Ok(literal);
    }
    resolve_path(expr, context).cloned()
}

fn resolve_path<'c>(path: &str, context: &'c Context) -> Result<&'c Value, ResolutionError> {
    let mut segments = path.split('.');
    let first = segments.next().unwrap_or_default();

    let root = ContextRoot::from_segment(first)
        .ok_or_else(|| ResolutionError::UnknownRoot(first.to_string()))?;
    let mut current = context
        .get(root)
        .ok_or(ResolutionError::MissingRoot(root))?;

    for segment in segments {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        current = next.ok_or_else(|| ResolutionError::MissingProperty {
            path: path.to_string(),
            segment: segment.to_string(),
        })?;
    }

    Ok(current)
}

/// Replace every `{{ expr }}` in `body` with its resolved text.
pub fn substitute(body: &str, context: &Context) -> Result<String, ResolutionError> {
    let mut failure = None;
    let rendered = PLACEHOLDER_RE.replace_all(body, |caps: &Captures| {
        if failure.is_some() {
            return String::new();
        }
        match resolve(&caps[1], context) {
            Ok(value) => display_value(&value),
            Err(e) => {
                failure = Some(e);
                String::new()
            }
        }
    });

    match failure {
        Some(e) => Err(e),
        None => Ok(rendered.into_owned()),
    }
}

/// Text form of a resolved value as it appears in a rendered message.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => display_number(n),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn display_number(n: &Number) -> String {
    match n.as_f64() {
        // 3.0 prints as 3
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        _ => n.to_string(),
    }
}
