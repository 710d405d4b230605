use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One node as submitted by the editor.
///
/// `inputs` holds the literal values the workflow author supplied directly;
/// anything wired from another node arrives through an [`EdgeDef`] instead.
///
/// [`EdgeDef`]: crate::EdgeDef
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDef {
  pub id: String,
  #[serde(rename = "type")]
  pub task_type: String,
  #[serde(default)]
  pub inputs: HashMap<String, serde_json::Value>,
}
