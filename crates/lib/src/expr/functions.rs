//! Built-in functions callable from expressions.

use super::{EvalError, Value, ValueKind};

/// Names of every built-in function.
pub const BUILTINS: &[&str] = &["concat", "default", "join", "lower", "replace", "trim", "upper"];

pub(super) fn call(name: &str, args: Vec<Value>) -> Result<Value, EvalError> {
  match name {
    "lower" => {
      let [s] = exact::<1>(name, args)?;
      Ok(Value::String(string_arg(name, s)?.to_lowercase()))
    }
    "upper" => {
      let [s] = exact::<1>(name, args)?;
      Ok(Value::String(string_arg(name, s)?.to_uppercase()))
    }
    "trim" => {
      let [s] = exact::<1>(name, args)?;
      Ok(Value::String(string_arg(name, s)?.trim().to_string()))
    }
    "replace" => {
      let [s, from, to] = exact::<3>(name, args)?;
      let s = string_arg(name, s)?;
      let from = string_arg(name, from)?;
      let to = string_arg(name, to)?;
      Ok(Value::String(s.replace(&from, &to)))
    }
    "concat" => {
      if args.is_empty() {
        return Err(arity(name, "at least 1", 0));
      }
      Ok(Value::String(args.iter().map(Value::render).collect()))
    }
    "join" => {
      if args.len() < 2 {
        return Err(arity(name, "at least 2", args.len()));
      }
      let mut args = args.into_iter();
      let sep = match args.next() {
        Some(sep) => string_arg(name, sep)?,
        None => return Err(arity(name, "at least 2", 0)),
      };
      let parts: Vec<String> = args.map(|v| v.render()).collect();
      Ok(Value::String(parts.join(&sep)))
    }
    "default" => {
      let [value, fallback] = exact::<2>(name, args)?;
      match &value {
        Value::String(s) if s.is_empty() => Ok(fallback),
        _ => Ok(value),
      }
    }
    _ => Err(EvalError::UnknownFunction(name.to_string())),
  }
}

fn exact<const N: usize>(name: &str, args: Vec<Value>) -> Result<[Value; N], EvalError> {
  let got = args.len();
  args.try_into().map_err(|_| arity(name, &N.to_string(), got))
}

fn arity(name: &str, expected: &str, got: usize) -> EvalError {
  EvalError::Arity {
    function: name.to_string(),
    expected: expected.to_string(),
    got,
  }
}

fn string_arg(name: &str, value: Value) -> Result<String, EvalError> {
  value.into_string().map_err(|other| EvalError::ArgumentType {
    function: name.to_string(),
    expected: ValueKind::String,
    got: other.kind(),
  })
}
