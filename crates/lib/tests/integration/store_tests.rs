use std::ops::ControlFlow;
use std::sync::Arc;

use stackwright_lib::EngineError;
use stackwright_lib::backend::store::FileStore;
use stackwright_lib::stack::Stack;

use super::common::{Setup, buildable};

fn stack(id: &str, version: &str) -> Stack {
  Stack::new(id, version).with_component(buildable("api", &[("http", 8080)]))
}

#[test]
fn duplicate_register_is_conflict() {
  let (engine, _fakes) = Setup::default().engine();
  engine.register(&stack("shop", "1.0")).unwrap();

  let err = engine.register(&stack("shop", "2.0")).unwrap_err();
  assert!(matches!(err, EngineError::Conflict { ref id } if id == "shop"));
  assert_eq!(engine.get("shop").unwrap().version, "1.0");
}

#[test]
fn register_validates() {
  let (engine, _fakes) = Setup::default().engine();
  let err = engine.register(&Stack::new("shop", "1.0")).unwrap_err();
  assert!(matches!(err, EngineError::Validation(_)));
}

#[test]
fn commit_updates_registered_stack() {
  let (engine, _fakes) = Setup::default().engine();
  assert!(matches!(
    engine.commit(&stack("shop", "1.0")),
    Err(EngineError::Store(_))
  ));

  engine.register(&stack("shop", "1.0")).unwrap();
  engine.commit(&stack("shop", "1.1")).unwrap();
  assert_eq!(engine.get("shop").unwrap().version, "1.1");
}

#[test]
fn iter_visits_prefix() {
  let (engine, _fakes) = Setup::default().engine();
  for id in ["shop-eu", "shop-us", "blog"] {
    engine.register(&stack(id, "1")).unwrap();
  }

  let mut ids = Vec::new();
  engine
    .iter("shop", &mut |stack| {
      ids.push(stack.id);
      ControlFlow::Continue(())
    })
    .unwrap();
  assert_eq!(ids, vec!["shop-eu".to_string(), "shop-us".to_string()]);
}

#[test]
fn file_store_survives_engine_restart() {
  let dir = tempfile::TempDir::new().unwrap();

  let (engine, _fakes) = Setup::default().engine_with_store(Arc::new(FileStore::new(dir.path())));
  engine.register(&stack("shop", "1.0")).unwrap();
  drop(engine);

  let (engine, _fakes) = Setup::default().engine_with_store(Arc::new(FileStore::new(dir.path())));
  assert_eq!(engine.get("shop").unwrap().version, "1.0");
  assert!(matches!(
    engine.register(&stack("shop", "1.0")),
    Err(EngineError::Conflict { .. })
  ));
  assert!(dir.path().join("stacks").join("shop.json").exists());
}
