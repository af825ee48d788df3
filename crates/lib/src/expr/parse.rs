//! Template parsing.
//!
//! A template is literal text with `${ expr }` interpolations. `$${` produces
//! a literal `${`; any other `$` passes through unchanged so shell-style
//! values like `$HOME` need no escaping.
//!
//! ```
//! use stackwright_lib::expr::{Expr, Segment, parse};
//!
//! let segments = parse("http://${component.api.container.addr.http}/v1").unwrap();
//! assert_eq!(segments, vec![
//!     Segment::Literal("http://".to_string()),
//!     Segment::Expr(Expr::Var("component.api.container.addr.http".to_string())),
//!     Segment::Literal("/v1".to_string()),
//! ]);
//! ```

use super::EvalError;

/// A parsed expression inside `${ ... }`.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
  /// Dotted variable reference, e.g. `stack.id`.
  Var(String),
  Str(String),
  Int(i64),
  Float(f64),
  Bool(bool),
  /// Function call, e.g. `lower(stack.id)`.
  Call { name: String, args: Vec<Expr> },
}

/// A segment of a parsed template.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
  Literal(String),
  Expr(Expr),
}

/// Parse a template into literal and expression segments.
pub fn parse(input: &str) -> Result<Vec<Segment>, EvalError> {
  let mut segments = Vec::new();
  let mut literal = String::new();
  let mut chars = input.char_indices().peekable();

  while let Some((pos, ch)) = chars.next() {
    if ch != '$' {
      literal.push(ch);
      continue;
    }

    match chars.peek() {
      Some((_, '$')) => {
        chars.next();
        match chars.peek() {
          Some((_, '{')) => {
            // Escaped: $${ -> ${
            chars.next();
            literal.push_str("${");
          }
          _ => literal.push_str("$$"),
        }
      }
      Some((_, '{')) => {
        chars.next();

        if !literal.is_empty() {
          segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }

        // Collect up to the closing brace, ignoring braces inside string literals.
        let mut content = String::new();
        let mut in_string = false;
        let mut escaped = false;
        let mut found_close = false;

        for (_, c) in chars.by_ref() {
          if in_string {
            if escaped {
              escaped = false;
            } else if c == '\\' {
              escaped = true;
            } else if c == '"' {
              in_string = false;
            }
          } else if c == '"' {
            in_string = true;
          } else if c == '}' {
            found_close = true;
            break;
          }
          content.push(c);
        }

        if !found_close {
          return Err(EvalError::Unclosed(pos));
        }

        segments.push(Segment::Expr(parse_expr(&content, pos)?));
      }
      _ => literal.push('$'),
    }
  }

  if !literal.is_empty() {
    segments.push(Segment::Literal(literal));
  }

  Ok(segments)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
  Ident(String),
  Str(String),
  Int(i64),
  Float(f64),
  LParen,
  RParen,
  Comma,
}

impl std::fmt::Display for Token {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Token::Ident(s) => write!(f, "identifier '{}'", s),
      Token::Str(s) => write!(f, "string \"{}\"", s),
      Token::Int(i) => write!(f, "number {}", i),
      Token::Float(x) => write!(f, "number {}", x),
      Token::LParen => f.write_str("'('"),
      Token::RParen => f.write_str("')'"),
      Token::Comma => f.write_str("','"),
    }
  }
}

fn tokenize(content: &str) -> Result<Vec<Token>, EvalError> {
  let mut tokens = Vec::new();
  let mut chars = content.chars().peekable();

  while let Some(&ch) = chars.peek() {
    match ch {
      c if c.is_whitespace() => {
        chars.next();
      }
      '(' => {
        chars.next();
        tokens.push(Token::LParen);
      }
      ')' => {
        chars.next();
        tokens.push(Token::RParen);
      }
      ',' => {
        chars.next();
        tokens.push(Token::Comma);
      }
      '"' => {
        chars.next();
        let mut s = String::new();
        let mut closed = false;
        while let Some(c) = chars.next() {
          match c {
            '"' => {
              closed = true;
              break;
            }
            '\\' => match chars.next() {
              Some('n') => s.push('\n'),
              Some('t') => s.push('\t'),
              Some(other) => s.push(other),
              None => break,
            },
            other => s.push(other),
          }
        }
        if !closed {
          return Err(EvalError::UnterminatedString);
        }
        tokens.push(Token::Str(s));
      }
      c if c.is_ascii_digit() || c == '-' => {
        let mut num = String::new();
        num.push(c);
        chars.next();
        while let Some(&d) = chars.peek() {
          if d.is_ascii_digit() || d == '.' {
            num.push(d);
            chars.next();
          } else {
            break;
          }
        }
        tokens.push(number_token(&num)?);
      }
      c if c.is_alphabetic() || c == '_' => {
        let mut ident = String::new();
        while let Some(&d) = chars.peek() {
          if d.is_alphanumeric() || matches!(d, '_' | '-' | '.') {
            ident.push(d);
            chars.next();
          } else {
            break;
          }
        }
        tokens.push(Token::Ident(ident));
      }
      other => return Err(EvalError::UnexpectedChar(other)),
    }
  }

  Ok(tokens)
}

fn number_token(num: &str) -> Result<Token, EvalError> {
  if num.contains('.') {
    num
      .parse::<f64>()
      .map(Token::Float)
      .map_err(|_| EvalError::InvalidNumber(num.to_string()))
  } else {
    num
      .parse::<i64>()
      .map(Token::Int)
      .map_err(|_| EvalError::InvalidNumber(num.to_string()))
  }
}

struct Parser {
  tokens: Vec<Token>,
  pos: usize,
}

impl Parser {
  fn next(&mut self) -> Option<Token> {
    let token = self.tokens.get(self.pos).cloned();
    self.pos += 1;
    token
  }

  fn peek(&self) -> Option<&Token> {
    self.tokens.get(self.pos)
  }

  fn expr(&mut self) -> Result<Expr, EvalError> {
    match self.next() {
      Some(Token::Str(s)) => Ok(Expr::Str(s)),
      Some(Token::Int(i)) => Ok(Expr::Int(i)),
      Some(Token::Float(x)) => Ok(Expr::Float(x)),
      Some(Token::Ident(name)) => {
        if self.peek() == Some(&Token::LParen) {
          self.next();
          let args = self.args()?;
          return Ok(Expr::Call { name, args });
        }
        match name.as_str() {
          "true" => Ok(Expr::Bool(true)),
          "false" => Ok(Expr::Bool(false)),
          _ => Ok(Expr::Var(name)),
        }
      }
      Some(other) => Err(EvalError::UnexpectedToken {
        expected: "expression".to_string(),
        found: other.to_string(),
      }),
      None => Err(EvalError::UnexpectedEnd),
    }
  }

  fn args(&mut self) -> Result<Vec<Expr>, EvalError> {
    let mut args = Vec::new();
    if self.peek() == Some(&Token::RParen) {
      self.next();
      return Ok(args);
    }

    loop {
      args.push(self.expr()?);
      match self.next() {
        Some(Token::Comma) => continue,
        Some(Token::RParen) => return Ok(args),
        Some(other) => {
          return Err(EvalError::UnexpectedToken {
            expected: "',' or ')'".to_string(),
            found: other.to_string(),
          });
        }
        None => return Err(EvalError::UnexpectedEnd),
      }
    }
  }
}

/// Parse the content of one `${ ... }` interpolation.
fn parse_expr(content: &str, pos: usize) -> Result<Expr, EvalError> {
  let tokens = tokenize(content)?;
  if tokens.is_empty() {
    return Err(EvalError::EmptyInterpolation(pos));
  }

  let mut parser = Parser { tokens, pos: 0 };
  let expr = parser.expr()?;

  if let Some(extra) = parser.peek() {
    return Err(EvalError::UnexpectedToken {
      expected: "'}'".to_string(),
      found: extra.to_string(),
    });
  }

  Ok(expr)
}
