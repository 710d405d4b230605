use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use spinneret_config::{EdgeDef, NodeDef};

/// One instance of a task type inside a workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
  /// Unique within the graph.
  pub id: String,
  pub task_type: String,
  /// Literal input values supplied by the workflow author.
  #[serde(default)]
  pub inputs: HashMap<String, serde_json::Value>,
}

impl Node {
  /// Whether the author supplied a usable literal for this input.
  ///
  /// Null and empty-string values do not count; the editor serializes
  /// untouched fields that way.
  pub fn has_literal(&self, name: &str) -> bool {
    match self.inputs.get(name) {
      None | Some(serde_json::Value::Null) => false,
      Some(serde_json::Value::String(s)) => !s.is_empty(),
      Some(_) => true,
    }
  }
}

impl From<NodeDef> for Node {
  fn from(def: NodeDef) -> Self {
    Self {
      id: def.id,
      task_type: def.task_type,
      inputs: def.inputs,
    }
  }
}

/// Directed wire between a source node output and a target node input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
  pub source: String,
  pub source_output: String,
  pub target: String,
  pub target_input: String,
}

impl From<EdgeDef> for Edge {
  fn from(def: EdgeDef) -> Self {
    Self {
      source: def.source,
      source_output: def.source_output,
      target: def.target,
      target_input: def.target_input,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn literal_presence() {
    let mut inputs = HashMap::new();
    inputs.insert("Url".to_string(), json!("https://example.com"));
    inputs.insert("Blank".to_string(), json!(""));
    inputs.insert("Unset".to_string(), serde_json::Value::Null);
    inputs.insert("Count".to_string(), json!(0));

    let node = Node {
      id: "n1".to_string(),
      task_type: "FETCH".to_string(),
      inputs,
    };

    assert!(node.has_literal("Url"));
    assert!(node.has_literal("Count"));
    assert!(!node.has_literal("Blank"));
    assert!(!node.has_literal("Unset"));
    assert!(!node.has_literal("Missing"));
  }
}
