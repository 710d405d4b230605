use serde::{Deserialize, Serialize};

/// Directed wire between a source node output and a target node input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDef {
  pub source: String,
  pub source_output: String,
  pub target: String,
  pub target_input: String,
}
