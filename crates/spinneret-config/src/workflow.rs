use serde::{Deserialize, Serialize};

use crate::edge::EdgeDef;
use crate::node::NodeDef;

/// A whole workflow graph as submitted by the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDef {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub nodes: Vec<NodeDef>,
  #[serde(default)]
  pub edges: Vec<EdgeDef>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn deserializes_editor_payload() {
    let payload = r#"{
      "id": "wf-1",
      "name": "Scrape products",
      "nodes": [
        { "id": "a", "type": "LAUNCH_BROWSER", "inputs": { "Website Url": "https://example.com" } },
        { "id": "b", "type": "PAGE_TO_HTML" }
      ],
      "edges": [
        { "source": "a", "sourceOutput": "Web page", "target": "b", "targetInput": "Web page" }
      ]
    }"#;

    let def: WorkflowDef = serde_json::from_str(payload).unwrap();
    assert_eq!(def.nodes.len(), 2);
    assert_eq!(def.nodes[0].task_type, "LAUNCH_BROWSER");
    assert_eq!(
      def.nodes[0].inputs.get("Website Url").and_then(|v| v.as_str()),
      Some("https://example.com")
    );
    assert!(def.nodes[1].inputs.is_empty());
    assert_eq!(def.edges[0].source_output, "Web page");
    assert_eq!(def.edges[0].target_input, "Web page");
  }

  #[test]
  fn empty_graph_defaults() {
    let def: WorkflowDef =
      serde_json::from_str(r#"{ "id": "wf-2", "name": "Empty" }"#).unwrap();
    assert!(def.nodes.is_empty());
    assert!(def.edges.is_empty());
  }
}
