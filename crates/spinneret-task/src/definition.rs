use serde::{Deserialize, Serialize};

/// Kind of value a task input or output carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
  String,
  Number,
  Json,
  /// One of a fixed set of string options.
  Select,
  /// Carries the shared automation resource, not a literal value.
  BrowserInstance,
}

/// A declared, named task input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDef {
  pub name: String,
  pub kind: ParamKind,
  pub required: bool,
}

impl InputDef {
  pub fn required(name: impl Into<String>, kind: ParamKind) -> Self {
    Self {
      name: name.into(),
      kind,
      required: true,
    }
  }

  pub fn optional(name: impl Into<String>, kind: ParamKind) -> Self {
    Self {
      name: name.into(),
      kind,
      required: false,
    }
  }
}

/// A declared, named task output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDef {
  pub name: String,
  pub kind: ParamKind,
}

impl OutputDef {
  pub fn new(name: impl Into<String>, kind: ParamKind) -> Self {
    Self {
      name: name.into(),
      kind,
    }
  }
}

/// Immutable description of one task type.
///
/// Defined at process start; the compiler uses the input/output shapes and
/// entry-point eligibility, the engine uses the credit cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDefinition {
  /// Task-type identifier, unique within the registry.
  pub task_type: String,
  /// Human-readable label.
  pub label: String,
  /// Whether this task type may start a run without upstream inputs.
  pub is_entry_point: bool,
  /// Credits deducted before the task executes.
  pub credit_cost: u32,
  pub inputs: Vec<InputDef>,
  pub outputs: Vec<OutputDef>,
}

impl TaskDefinition {
  /// Look up a declared input by name.
  pub fn input(&self, name: &str) -> Option<&InputDef> {
    self.inputs.iter().find(|i| i.name == name)
  }

  /// Look up a declared output by name.
  pub fn output(&self, name: &str) -> Option<&OutputDef> {
    self.outputs.iter().find(|o| o.name == name)
  }
}
