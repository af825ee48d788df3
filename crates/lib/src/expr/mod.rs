//! Interpolation expressions for component configuration.
//!
//! Component environment values may embed `${ ... }` expressions that refer to
//! scope variables (see [`crate::scope`]) and call a small set of built-in
//! functions. Evaluation produces a tagged [`Value`]; environment values must
//! evaluate to [`Value::String`].
//!
//! # Typing
//!
//! A template consisting of exactly one interpolation evaluates to that
//! expression's value unchanged, so `${5}` is an `Int`. Any template that mixes
//! literal text with interpolations renders every part and is a `String`.

mod functions;
mod parse;
mod value;

use std::collections::BTreeMap;

use thiserror::Error;

pub use functions::BUILTINS;
pub use parse::{Expr, Segment, parse};
pub use value::{Value, ValueKind};

/// Errors raised while parsing or evaluating an expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
  #[error("unclosed interpolation at position {0}")]
  Unclosed(usize),

  #[error("empty interpolation at position {0}")]
  EmptyInterpolation(usize),

  #[error("unterminated string literal")]
  UnterminatedString,

  #[error("unexpected character '{0}'")]
  UnexpectedChar(char),

  #[error("unexpected end of expression")]
  UnexpectedEnd,

  #[error("expected {expected}, found {found}")]
  UnexpectedToken { expected: String, found: String },

  #[error("invalid number: {0}")]
  InvalidNumber(String),

  #[error("unknown variable: {0}")]
  UnknownVariable(String),

  #[error("unknown function: {0}")]
  UnknownFunction(String),

  #[error("{function}() takes {expected} argument(s), got {got}")]
  Arity {
    function: String,
    expected: String,
    got: usize,
  },

  #[error("{function}() expects a {expected} argument, got {got}")]
  ArgumentType {
    function: String,
    expected: ValueKind,
    got: ValueKind,
  },

  #[error("type mismatch: expected {expected}, got {got}")]
  TypeMismatch { expected: ValueKind, got: ValueKind },
}

/// Source of variable values during evaluation.
pub trait VariableSource {
  fn lookup(&self, name: &str) -> Option<&Value>;
}

impl VariableSource for BTreeMap<String, Value> {
  fn lookup(&self, name: &str) -> Option<&Value> {
    self.get(name)
  }
}

/// Parse and evaluate a template against the given variables.
pub fn evaluate(input: &str, vars: &impl VariableSource) -> Result<Value, EvalError> {
  let segments = parse(input)?;
  evaluate_segments(&segments, vars)
}

/// Evaluate a template that must produce a string.
///
/// Fails with [`EvalError::TypeMismatch`] when the result is any other kind.
pub fn evaluate_string(input: &str, vars: &impl VariableSource) -> Result<String, EvalError> {
  evaluate(input, vars)?
    .into_string()
    .map_err(|other| EvalError::TypeMismatch {
      expected: ValueKind::String,
      got: other.kind(),
    })
}

/// Evaluate pre-parsed segments.
pub fn evaluate_segments(segments: &[Segment], vars: &impl VariableSource) -> Result<Value, EvalError> {
  match segments {
    [] => Ok(Value::String(String::new())),
    [Segment::Expr(expr)] => eval_expr(expr, vars),
    _ => {
      let mut result = String::new();
      for segment in segments {
        match segment {
          Segment::Literal(s) => result.push_str(s),
          Segment::Expr(expr) => result.push_str(&eval_expr(expr, vars)?.render()),
        }
      }
      Ok(Value::String(result))
    }
  }
}

fn eval_expr(expr: &Expr, vars: &impl VariableSource) -> Result<Value, EvalError> {
  match expr {
    Expr::Var(name) => vars
      .lookup(name)
      .cloned()
      .ok_or_else(|| EvalError::UnknownVariable(name.clone())),
    Expr::Str(s) => Ok(Value::String(s.clone())),
    Expr::Int(i) => Ok(Value::Int(*i)),
    Expr::Float(x) => Ok(Value::Float(*x)),
    Expr::Bool(b) => Ok(Value::Bool(*b)),
    Expr::Call { name, args } => {
      let values = args
        .iter()
        .map(|arg| eval_expr(arg, vars))
        .collect::<Result<Vec<_>, _>>()?;
      functions::call(name, values)
    }
  }
}
