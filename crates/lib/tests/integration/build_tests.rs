use std::collections::BTreeSet;

use stackwright_lib::expr::EvalError;
use stackwright_lib::stack::Stack;
use stackwright_lib::{BuildOptions, EngineError};

use super::common::{FakeRuntime, FakeVcs, Setup, buildable, external};

fn stack() -> Stack {
  Stack::new("s1", "1.0")
    .with_component(buildable("api", &[("http", 8080)]))
    .with_component(buildable("db", &[("pg", 5432)]))
}

#[tokio::test]
async fn clean_build_publishes_every_artifact() {
  let (engine, fakes) = Setup::default().engine();
  let mut stack = stack().with_component(external("cache", "redis"));

  let outcome = engine.build(&mut stack, &BuildOptions::default()).await.unwrap();

  assert!(outcome.report.succeeded());
  assert!(outcome.published());
  assert_eq!(fakes.runtime.builds.lock().unwrap().len(), 2);
  assert_eq!(
    *fakes.runtime.pushes.lock().unwrap(),
    vec!["reg/s1/api:1.0".to_string(), "reg/s1/db:1.0".to_string()]
  );
  assert_eq!(fakes.reporter.summaries.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn failed_component_blocks_publish() {
  let (engine, fakes) = Setup {
    runtime: FakeRuntime {
      failing: BTreeSet::from(["db".to_string()]),
      ..Default::default()
    },
    ..Default::default()
  }
  .engine();
  let mut stack = stack();

  let err = engine.build(&mut stack, &BuildOptions::default()).await.unwrap_err();

  let EngineError::BuildFailed(report) = err else {
    panic!("expected build failure, got {err}");
  };
  assert!(!report.succeeded());
  assert!(report.components["api"].succeeded());
  assert!(report.components["db"].error.is_some());
  assert!(fakes.runtime.pushes.lock().unwrap().is_empty());

  let summaries = fakes.reporter.summaries.lock().unwrap();
  assert_eq!(summaries.len(), 1);
  assert!(summaries[0].publish.is_none());
}

#[tokio::test]
async fn dirty_worktree_skips_publish() {
  let (engine, fakes) = Setup {
    vcs: FakeVcs { dirty: true },
    ..Default::default()
  }
  .engine();
  let mut stack = stack();

  let outcome = engine.build(&mut stack, &BuildOptions::default()).await.unwrap();

  assert!(outcome.report.succeeded());
  assert!(!outcome.gate.can_publish());
  assert!(!outcome.published());
  assert!(fakes.runtime.pushes.lock().unwrap().is_empty());
}

#[tokio::test]
async fn explicit_publish_overrides_dirty_worktree() {
  let (engine, fakes) = Setup {
    vcs: FakeVcs { dirty: true },
    ..Default::default()
  }
  .engine();
  let mut stack = stack();
  let options = BuildOptions {
    publish: true,
    ..Default::default()
  };

  let outcome = engine.build(&mut stack, &options).await.unwrap();

  assert!(outcome.gate.uncommitted().is_some());
  assert!(outcome.published());
  assert_eq!(fakes.runtime.pushes.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn env_is_evaluated_before_build() {
  let (engine, fakes) = Setup::default().engine();
  let mut api = buildable("api", &[("http", 8080)]);
  api
    .env
    .insert("DB_ADDR".to_string(), "${component.db.container.addr.pg}".to_string());
  api.env.insert("OWNER".to_string(), "${upper(vcs.username)}".to_string());
  let mut stack = Stack::new("s1", "1.0")
    .with_component(api)
    .with_component(buildable("db", &[("pg", 5432)]));

  engine.build(&mut stack, &BuildOptions::default()).await.unwrap();

  let api = &stack.components["api"];
  assert_eq!(api.env["DB_ADDR"], "db.s1:5432");
  assert_eq!(api.env["OWNER"], "OCTOCAT");

  let builds = fakes.runtime.builds.lock().unwrap();
  let api_build = builds.iter().find(|b| b.reference == "reg/s1/api:1.0").unwrap();
  assert_eq!(api_build.build_args["DB_ADDR"], "db.s1:5432");
}

#[tokio::test]
async fn non_string_env_fails_evaluation() {
  let (engine, fakes) = Setup::default().engine();
  let mut api = buildable("api", &[]);
  api.env.insert("PORT".to_string(), "${5}".to_string());
  let mut stack = Stack::new("s1", "1.0").with_component(api);

  let err = engine.build(&mut stack, &BuildOptions::default()).await.unwrap_err();

  match err {
    EngineError::Evaluation {
      component,
      key,
      expression,
      source,
    } => {
      assert_eq!(component, "api");
      assert_eq!(key, "PORT");
      assert_eq!(expression, "${5}");
      assert!(matches!(source, EvalError::TypeMismatch { .. }));
    }
    other => panic!("unexpected error: {other}"),
  }
  assert_eq!(stack.components["api"].env["PORT"], "${5}");
  assert!(fakes.runtime.builds.lock().unwrap().is_empty());
}

#[tokio::test]
async fn invalid_stack_reports_every_violation() {
  let (engine, fakes) = Setup::default().engine();
  let mut stack = Stack::new("", "");

  let err = engine.build(&mut stack, &BuildOptions::default()).await.unwrap_err();

  let EngineError::Validation(errors) = err else {
    panic!("expected validation error, got {err}");
  };
  assert!(errors.len() >= 3);
  assert!(fakes.reporter.summaries.lock().unwrap().is_empty());
}
