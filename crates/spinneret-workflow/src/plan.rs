//! Execution-plan compilation.
//!
//! [`compile`] turns a node/edge graph into ordered phases by topological
//! leveling: a node is placed in a phase only once every node supplying one
//! of its required inputs sits in an earlier phase. Compilation is pure and
//! deterministic; the same graph always yields the same phase structure.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use spinneret_task::{InputDef, ParamKind, TaskDefinition, TaskRegistry};

use crate::error::{CompileError, InvalidInputReason, InvalidNodeInputs};
use crate::graph::Graph;
use crate::node::{Edge, Node};

/// A batch of nodes executed together because every dependency is already
/// resolved. Phases execute strictly in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanPhase {
  /// 1-based; phase 1 holds exactly the entry point.
  pub number: u32,
  pub nodes: Vec<Node>,
}

/// Ordered sequence of phases covering every valid node exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
  pub phases: Vec<PlanPhase>,
}

impl ExecutionPlan {
  pub fn node_count(&self) -> usize {
    self.phases.iter().map(|p| p.nodes.len()).sum()
  }
}

/// Compile a graph into an [`ExecutionPlan`].
///
/// The entry point is the first node in caller-supplied order whose task
/// type is entry-point-eligible; the compiler does not try to choose the
/// "best" among several candidates. Nodes with unsatisfiable inputs,
/// unknown task types, duplicate input wires, or positions a bounded
/// scheduling pass can never reach are all reported through
/// [`CompileError::InvalidInputs`] - never silently dropped.
pub fn compile(
  registry: &TaskRegistry,
  nodes: &[Node],
  edges: &[Edge],
) -> Result<ExecutionPlan, CompileError> {
  let entry = nodes
    .iter()
    .find(|n| registry.is_entry_point(&n.task_type))
    .ok_or(CompileError::NoEntryPoint)?;

  let graph = Graph::new(nodes, edges);
  let by_id: HashMap<&str, &Node> = nodes.iter().map(|n| (n.id.as_str(), n)).collect();

  let mut invalid: Vec<InvalidNodeInputs> = Vec::new();
  // Nodes recorded as invalid are excluded from every later phase.
  let mut excluded: HashSet<&str> = HashSet::new();

  // A node whose task type the registry does not know must never execute,
  // but it must stay diagnosable.
  for node in nodes {
    if registry.lookup(&node.task_type).is_none() {
      invalid.push(InvalidNodeInputs {
        node_id: node.id.clone(),
        reason: InvalidInputReason::UnknownTaskType,
      });
      excluded.insert(node.id.as_str());
    }
  }

  // At most one edge may feed a given target input.
  let mut feeds: HashMap<(&str, &str), u32> = HashMap::new();
  for edge in edges {
    *feeds
      .entry((edge.target.as_str(), edge.target_input.as_str()))
      .or_default() += 1;
  }
  for node in nodes {
    if excluded.contains(node.id.as_str()) {
      continue;
    }
    let mut duplicated: Vec<String> = feeds
      .iter()
      .filter(|((target, _), count)| *target == node.id && **count > 1)
      .map(|((_, input), _)| input.to_string())
      .collect();
    if !duplicated.is_empty() {
      duplicated.sort();
      invalid.push(InvalidNodeInputs {
        node_id: node.id.clone(),
        reason: InvalidInputReason::DuplicateInputEdges(duplicated),
      });
      excluded.insert(node.id.as_str());
    }
  }

  // The entry point has no earlier phases to draw from; its required inputs
  // must be satisfied by literals alone.
  if !excluded.contains(entry.id.as_str()) {
    if let Some(def) = registry.lookup(&entry.task_type) {
      let entry_missing: Vec<String> = def
        .inputs
        .iter()
        .filter(|input| input.required && !entry.has_literal(&input.name))
        .map(|input| input.name.clone())
        .collect();
      if !entry_missing.is_empty() {
        invalid.push(InvalidNodeInputs {
          node_id: entry.id.clone(),
          reason: InvalidInputReason::MissingInputs(entry_missing),
        });
      }
    }
  }

  let mut planned: HashSet<&str> = HashSet::new();
  planned.insert(entry.id.as_str());

  let mut phases = vec![PlanPhase {
    number: 1,
    nodes: vec![entry.clone()],
  }];

  // Bounded by node count: every productive round plans or rejects at least
  // one node, so the loop terminates even when the graph contains a cycle.
  for _ in 1..nodes.len() {
    let remaining: Vec<&Node> = nodes
      .iter()
      .filter(|n| !planned.contains(n.id.as_str()) && !excluded.contains(n.id.as_str()))
      .collect();
    if remaining.is_empty() {
      break;
    }

    let mut phase_nodes: Vec<&Node> = Vec::new();
    let mut newly_excluded = 0usize;
    for node in remaining {
      // Unknown types were excluded above.
      let Some(def) = registry.lookup(&node.task_type) else {
        continue;
      };
      let missing = missing_inputs(node, def, edges, &by_id, &planned, registry);
      if missing.is_empty() {
        phase_nodes.push(node);
        continue;
      }
      // A supplier that is not yet planned may still land in a later phase;
      // defer. Once every incomer is settled, no later phase can help and
      // the gap is a genuine validation failure.
      let settled = graph.upstream(&node.id).iter().all(|up| {
        planned.contains(up.as_str())
          || excluded.contains(up.as_str())
          || !by_id.contains_key(up.as_str())
      });
      if settled {
        invalid.push(InvalidNodeInputs {
          node_id: node.id.clone(),
          reason: InvalidInputReason::MissingInputs(missing),
        });
        excluded.insert(node.id.as_str());
        newly_excluded += 1;
      }
    }

    if phase_nodes.is_empty() {
      if newly_excluded == 0 {
        break;
      }
      continue;
    }

    let number = phases.len() as u32 + 1;
    for node in &phase_nodes {
      planned.insert(node.id.as_str());
    }
    phases.push(PlanPhase {
      number,
      nodes: phase_nodes.into_iter().cloned().collect(),
    });
  }

  // Anything still unplanned sits behind a cycle; report it instead of
  // letting it vanish from the plan.
  for node in nodes {
    if !planned.contains(node.id.as_str()) && !excluded.contains(node.id.as_str()) {
      invalid.push(InvalidNodeInputs {
        node_id: node.id.clone(),
        reason: InvalidInputReason::Unreachable,
      });
    }
  }

  if !invalid.is_empty() {
    return Err(CompileError::InvalidInputs(invalid));
  }

  Ok(ExecutionPlan { phases })
}

/// Required inputs of `node` not yet satisfied by a literal or by an edge
/// from an already-planned source.
fn missing_inputs(
  node: &Node,
  def: &TaskDefinition,
  edges: &[Edge],
  by_id: &HashMap<&str, &Node>,
  planned: &HashSet<&str>,
  registry: &TaskRegistry,
) -> Vec<String> {
  let mut missing = Vec::new();
  for input in def.inputs.iter().filter(|i| i.required) {
    // Browser-instance inputs carry the shared resource; only an edge can
    // satisfy them.
    if input.kind != ParamKind::BrowserInstance && node.has_literal(&input.name) {
      continue;
    }
    let satisfied = edges.iter().any(|edge| {
      edge.target == node.id
        && edge.target_input == input.name
        && planned.contains(edge.source.as_str())
        && edge_kind_matches(edge, input, by_id, registry)
    });
    if !satisfied {
      missing.push(input.name.clone());
    }
  }
  missing
}

/// An edge only satisfies an input when the source output's kind equals the
/// target input's kind; there is no implicit conversion.
fn edge_kind_matches(
  edge: &Edge,
  input: &InputDef,
  by_id: &HashMap<&str, &Node>,
  registry: &TaskRegistry,
) -> bool {
  by_id
    .get(edge.source.as_str())
    .and_then(|source| registry.lookup(&source.task_type))
    .and_then(|def| def.output(&edge.source_output))
    .is_some_and(|output| output.kind == input.kind)
}
