use stackwright_lib::EngineError;
use stackwright_lib::backend::orchestrator::DeployOptions;
use stackwright_lib::deploy::DeployPhase;
use stackwright_lib::stack::Stack;

use super::common::{FakeOrchestrator, FakeRegistry, OrchestratorCall, Setup, buildable, external};

fn stack() -> Stack {
  Stack::new("s1", "1.0")
    .with_component(buildable("api", &[("http", 8080)]))
    .with_component(buildable("db", &[("pg", 5432)]))
    .with_component(external("cache", "redis"))
}

fn published() -> FakeRegistry {
  FakeRegistry::with(&["s1/api:1.0", "s1/db:1.0"])
}

#[tokio::test]
async fn missing_artifact_stops_before_orchestrator() {
  let (engine, fakes) = Setup {
    registry: FakeRegistry::with(&["s1/api:1.0"]),
    ..Default::default()
  }
  .engine();
  let mut stack = stack();

  let err = engine.deploy(&mut stack, &DeployOptions::default()).await.unwrap_err();

  let EngineError::ArtifactsMissing(report) = err else {
    panic!("expected missing artifacts, got {err}");
  };
  let missing: Vec<_> = report.missing().map(|e| e.component.as_str()).collect();
  assert_eq!(missing, vec!["db"]);
  assert_eq!(report.entries.len(), 2);
  assert!(fakes.orchestrator.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn non_buildable_components_are_not_checked() {
  let (engine, fakes) = Setup {
    registry: published(),
    ..Default::default()
  }
  .engine();
  let mut stack = stack();

  engine.deploy(&mut stack, &DeployOptions::default()).await.unwrap();

  let lookups = fakes.registry.lookups.lock().unwrap();
  assert!(!lookups.iter().any(|l| l.contains("cache")));
  assert_eq!(stack.components["cache"].name, "redis");
  assert_eq!(stack.components["api"].name, "reg/s1/api");
}

#[tokio::test]
async fn failed_deploy_rolls_back_once() {
  let (engine, fakes) = Setup {
    registry: published(),
    orchestrator: FakeOrchestrator {
      fail_deploy: true,
      ..Default::default()
    },
    ..Default::default()
  }
  .engine();
  let mut stack = stack();

  let err = engine.deploy(&mut stack, &DeployOptions::default()).await.unwrap_err();

  match err {
    EngineError::DeployFailed { source, rollback, phase } => {
      assert!(source.to_string().contains("no capacity"));
      assert_eq!(rollback.len(), 1);
      assert!(!rollback[0].succeeded());
      assert_eq!(phase, DeployPhase::RolledBack);
    }
    other => panic!("unexpected error: {other}"),
  }

  assert_eq!(
    *fakes.orchestrator.calls.lock().unwrap(),
    vec![
      OrchestratorCall::Deploy {
        stack: "s1".to_string(),
        dryrun: false
      },
      OrchestratorCall::Destroy {
        stack: "s1".to_string()
      },
    ]
  );
  assert_eq!(fakes.reporter.rollbacks.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn failed_dry_run_is_not_rolled_back() {
  let (engine, fakes) = Setup {
    registry: published(),
    orchestrator: FakeOrchestrator {
      fail_deploy: true,
      ..Default::default()
    },
    ..Default::default()
  }
  .engine();

  let err = engine
    .deploy(&mut stack(), &DeployOptions { dryrun: true })
    .await
    .unwrap_err();

  match err {
    EngineError::DeployFailed { rollback, phase, .. } => {
      assert!(rollback.is_empty());
      assert_eq!(phase, DeployPhase::DeployFailed);
    }
    other => panic!("unexpected error: {other}"),
  }

  assert_eq!(
    *fakes.orchestrator.calls.lock().unwrap(),
    vec![OrchestratorCall::Deploy {
      stack: "s1".to_string(),
      dryrun: true
    }]
  );
  assert!(fakes.reporter.rollbacks.lock().unwrap().is_empty());
}

#[tokio::test]
async fn dry_run_is_forwarded_and_reported() {
  let (engine, fakes) = Setup {
    registry: published(),
    ..Default::default()
  }
  .engine();

  let outcome = engine
    .deploy(&mut stack(), &DeployOptions { dryrun: true })
    .await
    .unwrap();
  assert!(outcome.dryrun);
  assert_eq!(outcome.phase, DeployPhase::Deployed);
  assert_eq!(fakes.reporter.plans.lock().unwrap().len(), 1);

  engine.deploy(&mut stack(), &DeployOptions::default()).await.unwrap();

  let calls = fakes.orchestrator.calls.lock().unwrap();
  assert_eq!(
    *calls,
    vec![
      OrchestratorCall::Deploy {
        stack: "s1".to_string(),
        dryrun: true
      },
      OrchestratorCall::Deploy {
        stack: "s1".to_string(),
        dryrun: false
      },
    ]
  );
  assert_eq!(fakes.reporter.plans.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn deployed_env_uses_scope_addresses() {
  let (engine, _fakes) = Setup {
    registry: published(),
    ..Default::default()
  }
  .engine();
  let mut api = buildable("api", &[("http", 8080)]);
  api
    .env
    .insert("DB".to_string(), "postgres://${component.db.container.addr.pg}/app".to_string());
  let mut stack = Stack::new("s1", "1.0")
    .with_component(api)
    .with_component(buildable("db", &[("pg", 5432)]));

  let outcome = engine.deploy(&mut stack, &DeployOptions::default()).await.unwrap();
  assert_eq!(
    outcome.deployment.job["components"]["api"]["env"]["DB"],
    "postgres://db.s1:5432/app"
  );
}

#[tokio::test]
async fn stop_reports_each_component() {
  let (engine, fakes) = Setup::default().engine();

  let results = engine.stop(&stack()).await;

  assert_eq!(results.len(), 3);
  assert!(results.iter().all(|r| r.action == "stop"));
  let failed: Vec<_> = results.iter().filter(|r| !r.succeeded()).map(|r| r.resource.as_str()).collect();
  assert_eq!(failed, vec!["db"]);
  assert!(fakes.runtime.stops.lock().unwrap().contains(&"api.s1".to_string()));
}

#[tokio::test]
async fn logs_and_artifacts_use_runtime() {
  let (engine, _fakes) = Setup::default().engine();
  let stack = stack();

  let mut out = Vec::new();
  let mut err = Vec::new();
  engine.logs(&stack, &mut out, &mut err).await.unwrap();
  let out = String::from_utf8(out).unwrap();
  assert!(out.contains("api.s1 started"));
  assert!(out.contains("cache.s1 started"));

  let artifacts = engine.artifacts(&stack).await.unwrap();
  assert_eq!(artifacts[0].labels["filter"], "stack=s1");
}

#[tokio::test]
async fn status_passes_through() {
  let (engine, _fakes) = Setup::default().engine();
  let statuses = engine.status(&stack()).await.unwrap();
  assert_eq!(statuses.len(), 3);
}
