use std::collections::BTreeMap;
use std::ops::ControlFlow;
use std::sync::{PoisonError, RwLock};

use super::{StackStore, StoreError, check_id};
use crate::stack::Stack;

/// Ephemeral in-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
  stacks: RwLock<BTreeMap<String, Stack>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl StackStore for MemoryStore {
  fn id(&self) -> &str {
    "memory"
  }

  fn get(&self, id: &str) -> Result<Stack, StoreError> {
    let stacks = self.stacks.read().unwrap_or_else(PoisonError::into_inner);
    stacks.get(id).cloned().ok_or_else(|| StoreError::NotFound(id.to_string()))
  }

  fn iter(&self, prefix: &str, visitor: &mut dyn FnMut(Stack) -> ControlFlow<()>) -> Result<(), StoreError> {
    // Snapshot first so the visitor may call back into the store.
    let matching: Vec<Stack> = {
      let stacks = self.stacks.read().unwrap_or_else(PoisonError::into_inner);
      stacks
        .range(prefix.to_string()..)
        .take_while(|(id, _)| id.starts_with(prefix))
        .map(|(_, stack)| stack.clone())
        .collect()
    };

    for stack in matching {
      if visitor(stack).is_break() {
        break;
      }
    }
    Ok(())
  }

  fn create(&self, stack: &Stack) -> Result<(), StoreError> {
    check_id(&stack.id)?;
    let mut stacks = self.stacks.write().unwrap_or_else(PoisonError::into_inner);
    if stacks.contains_key(&stack.id) {
      return Err(StoreError::Exists(stack.id.clone()));
    }
    stacks.insert(stack.id.clone(), stack.clone());
    Ok(())
  }

  fn update(&self, stack: &Stack) -> Result<(), StoreError> {
    let mut stacks = self.stacks.write().unwrap_or_else(PoisonError::into_inner);
    match stacks.get_mut(&stack.id) {
      Some(existing) => {
        *existing = stack.clone();
        Ok(())
      }
      None => Err(StoreError::NotFound(stack.id.clone())),
    }
  }
}
