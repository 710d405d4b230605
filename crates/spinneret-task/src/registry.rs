use std::collections::HashMap;

use crate::TaskDefinition;

/// Static catalog mapping a task-type identifier to its declared contract.
///
/// Read-only at run time. Callers must treat a failed [`lookup`] as a
/// recoverable condition for the node in question, never a reason to abort
/// the whole run.
///
/// [`lookup`]: TaskRegistry::lookup
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
  definitions: HashMap<String, TaskDefinition>,
}

impl TaskRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register a definition, replacing any previous one for the same type.
  pub fn register(&mut self, definition: TaskDefinition) {
    self
      .definitions
      .insert(definition.task_type.clone(), definition);
  }

  /// Get the definition for a task type, if one is registered.
  pub fn lookup(&self, task_type: &str) -> Option<&TaskDefinition> {
    self.definitions.get(task_type)
  }

  /// Whether the given task type may start a run.
  pub fn is_entry_point(&self, task_type: &str) -> bool {
    self
      .lookup(task_type)
      .is_some_and(|def| def.is_entry_point)
  }

  pub fn len(&self) -> usize {
    self.definitions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.definitions.is_empty()
  }
}
