//! Terminal rendering of engine progress.

use owo_colors::{OwoColorize, Stream};

use stackwright_lib::action::ActionResult;
use stackwright_lib::artifacts::ArtifactReport;
use stackwright_lib::backend::orchestrator::Deployment;
use stackwright_lib::publish::GateDecision;
use stackwright_lib::report::{BuildSummary, Reporter};
use stackwright_lib::scope::ScopeVariables;
use stackwright_lib::stack::Stack;

use crate::output::{format_duration, print_warning, status_cell, symbols, table};

pub struct TerminalReporter {
  pub verbose: bool,
}

impl TerminalReporter {
  pub fn new(verbose: bool) -> Self {
    Self { verbose }
  }
}

fn heading(text: &str) {
  println!();
  println!("{}", text.if_supports_color(Stream::Stdout, |s| s.bold()));
  println!();
}

fn outcome(ok: bool) -> String {
  if ok {
    format!("{}", "[succeeded]".if_supports_color(Stream::Stdout, |s| s.green()))
  } else {
    format!("{}", "[failed]".if_supports_color(Stream::Stdout, |s| s.red()))
  }
}

impl Reporter for TerminalReporter {
  fn scope(&self, _stack: &Stack, vars: &ScopeVariables) {
    if !self.verbose {
      return;
    }
    heading("Scope");
    let rows: Vec<Vec<String>> = vars.iter().map(|(k, v)| vec![k.clone(), v.to_string()]).collect();
    print!("{}", table(&["Variable", "Value"], &rows));
  }

  fn build_summary(&self, summary: &BuildSummary) {
    heading("SUMMARY");

    if let Some(build) = &summary.build {
      println!("  Build {}", outcome(build.succeeded()));
      println!();
      let rows: Vec<Vec<String>> = build
        .components
        .iter()
        .map(|(id, b)| {
          vec![
            id.clone(),
            b.image.clone(),
            format_duration(b.duration),
            status_cell(b.error.as_deref()),
          ]
        })
        .collect();
      print!("{}", table(&["Component", "Image", "Time", "Status"], &rows));
    }

    if let Some(publish) = &summary.publish {
      println!();
      println!("  Publish {}", outcome(publish.succeeded()));
      println!();
      let rows: Vec<Vec<String>> = publish
        .components
        .values()
        .map(|p| vec![p.reference.clone(), status_cell(p.error.as_deref())])
        .collect();
      print!("{}", table(&["Artifact", "Status"], &rows));
    } else if summary.gate.as_ref().is_some_and(|g| !g.can_publish()) {
      println!();
      println!("  Artifacts were not published");
    }

    println!();
    if let Some(build) = &summary.build {
      println!("  Build time: {}", format_duration(build.elapsed));
    }
    if let Some(publish) = &summary.publish {
      println!("  Publish time: {}", format_duration(publish.elapsed));
    }
    println!("  Total time: {}", format_duration(summary.total));
  }

  fn gate(&self, decision: &GateDecision) {
    let Some(status) = decision.uncommitted() else {
      return;
    };

    heading("Uncommitted code");
    println!("{}", status);
    println!();
    if decision.can_publish() {
      print_warning("Explicit artifact publish requested (source code & artifacts may be out of sync)");
    } else {
      print_warning("Artifacts will not be published!");
    }
  }

  fn artifacts(&self, report: &ArtifactReport) {
    heading("Artifacts");
    let rows: Vec<Vec<String>> = report
      .entries
      .iter()
      .map(|e| vec![e.artifact.clone(), status_cell(e.error.as_deref())])
      .collect();
    print!("{}", table(&["Artifact", "Status"], &rows));
  }

  fn deploy_plan(&self, _stack: &Stack, deployment: &Deployment) {
    heading("Plan");
    match serde_json::to_string_pretty(&deployment.job) {
      Ok(job) => println!("{}", job),
      Err(e) => print_warning(&format!("cannot render job: {}", e)),
    }
    if !deployment.response.is_null() && self.verbose {
      match serde_json::to_string_pretty(&deployment.response) {
        Ok(diff) => println!("{}", diff),
        Err(e) => print_warning(&format!("cannot render plan response: {}", e)),
      }
    }
  }

  fn rollback(&self, stack: &Stack, results: &[ActionResult]) {
    print_warning(&format!("Deploy of '{}' failed, rolled back", stack.id));
    print_results(results);
  }
}

/// One line per action: `✓ api stop` or `✗ db stop: error`.
pub fn print_results(results: &[ActionResult]) {
  for result in results {
    match &result.error {
      None => println!(
        "  {} {} {}",
        symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
        result.resource,
        result.action
      ),
      Some(e) => println!(
        "  {} {} {}: {}",
        symbols::ERROR.if_supports_color(Stream::Stdout, |s| s.red()),
        result.resource,
        result.action,
        e
      ),
    }
  }
}
