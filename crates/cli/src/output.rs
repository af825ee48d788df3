//! CLI output formatting utilities.
//!
//! Colored status lines, aligned tables and human-readable sizes and
//! durations.

use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use console::measure_text_width;
use owo_colors::{OwoColorize, Stream};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
}

pub fn truncate_hash(hash: &str) -> &str {
  let hash = hash.strip_prefix("sha256:").unwrap_or(hash);
  let len = hash.len().min(12);
  &hash[..len]
}

pub fn format_bytes(bytes: u64) -> String {
  const KB: u64 = 1024;
  const MB: u64 = KB * 1024;
  const GB: u64 = MB * 1024;

  if bytes >= GB {
    format!("{:.1} GB", bytes as f64 / GB as f64)
  } else if bytes >= MB {
    format!("{:.1} MB", bytes as f64 / MB as f64)
  } else if bytes >= KB {
    format!("{:.1} KB", bytes as f64 / KB as f64)
  } else {
    format!("{} B", bytes)
  }
}

/// Duration rounded to milliseconds, e.g. `1s 500ms`.
pub fn format_duration(duration: Duration) -> String {
  let rounded = Duration::from_millis(duration.as_millis() as u64);
  if rounded.is_zero() {
    return "0ms".to_string();
  }
  humantime::format_duration(rounded).to_string()
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    symbols::WARNING.if_supports_color(Stream::Stderr, |s| s.yellow()),
    message.if_supports_color(Stream::Stderr, |s| s.yellow())
  );
}

pub fn print_info(message: &str) {
  println!(
    "{} {}",
    symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()),
    message
  );
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

/// Status marker: green `ok`, or the error in red.
pub fn status_cell(error: Option<&str>) -> String {
  match error {
    None => format!("{}", "ok".if_supports_color(Stream::Stdout, |s| s.green())),
    Some(e) => format!("{}", e.if_supports_color(Stream::Stdout, |s| s.red())),
  }
}

/// Render rows as left-aligned columns with a dashed header rule.
pub fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
  let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
  for row in rows {
    for (i, cell) in row.iter().enumerate().take(widths.len()) {
      widths[i] = widths[i].max(measure_text_width(cell));
    }
  }

  let mut out = String::new();
  let render = |cells: Vec<String>, out: &mut String| {
    out.push(' ');
    for (i, cell) in cells.iter().enumerate() {
      out.push_str(cell);
      if i + 1 < cells.len() {
        let pad = widths[i].saturating_sub(measure_text_width(cell)) + 2;
        out.push_str(&" ".repeat(pad));
      }
    }
    out.push('\n');
  };

  render(headers.iter().map(|h| h.to_string()).collect(), &mut out);
  render(headers.iter().map(|h| "-".repeat(h.chars().count())).collect(), &mut out);
  for row in rows {
    render(row.clone(), &mut out);
  }
  out
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_truncate_hash() {
    assert_eq!(truncate_hash("sha256:abcdef123456789"), "abcdef123456");
    assert_eq!(truncate_hash("short"), "short");
    assert_eq!(truncate_hash(""), "");
  }

  #[test]
  fn test_format_bytes() {
    assert_eq!(format_bytes(500), "500 B");
    assert_eq!(format_bytes(1536), "1.5 KB");
    assert_eq!(format_bytes(1048576), "1.0 MB");
    assert_eq!(format_bytes(1073741824), "1.0 GB");
  }

  #[test]
  fn test_format_duration() {
    assert_eq!(format_duration(Duration::from_micros(50)), "0ms");
    assert_eq!(format_duration(Duration::from_millis(1500)), "1s 500ms");
    assert_eq!(format_duration(Duration::from_secs(65)), "1m 5s");
  }

  #[test]
  fn test_table_alignment() {
    let rows = vec![
      vec!["reg/s1/api:1.0".to_string(), "ok".to_string()],
      vec!["db".to_string(), "missing".to_string()],
    ];
    let out = table(&["Artifact", "Status"], &rows);
    let lines: Vec<_> = out.lines().collect();
    assert_eq!(lines[0], " Artifact        Status");
    assert_eq!(lines[1], " --------        ------");
    assert_eq!(lines[2], " reg/s1/api:1.0  ok");
    assert_eq!(lines[3], " db              missing");
  }

  #[test]
  fn test_table_ignores_ansi_in_widths() {
    let rows = vec![
      vec!["api".to_string(), "\u{1b}[32mok\u{1b}[39m".to_string()],
      vec!["web".to_string(), "missing".to_string()],
    ];
    let out = table(&["Component", "Status", "Time"], &rows);
    let lines: Vec<_> = out.lines().collect();
    assert_eq!(lines[0], " Component  Status   Time");
    assert_eq!(lines[2], " api        \u{1b}[32mok\u{1b}[39m");
  }
}
