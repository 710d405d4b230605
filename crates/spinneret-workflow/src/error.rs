use serde::{Deserialize, Serialize};

/// Why a node failed plan validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidInputReason {
  /// Required inputs with neither a literal value nor a satisfying edge.
  MissingInputs(Vec<String>),
  /// The node's task type is not present in the registry.
  UnknownTaskType,
  /// More than one edge feeds the named target inputs.
  DuplicateInputEdges(Vec<String>),
  /// The node can never be scheduled (cycle or dead dependency).
  Unreachable,
}

/// One node the compiler rejected, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidNodeInputs {
  pub node_id: String,
  pub reason: InvalidInputReason,
}

/// Errors produced by plan compilation.
///
/// Both variants are surfaced to the caller before any execution starts;
/// an erroring graph is simply not runnable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
  /// No node in the graph has an entry-point-eligible task type.
  #[error("workflow has no entry point node")]
  NoEntryPoint,

  /// One or more nodes have unsatisfiable inputs.
  #[error("workflow has invalid inputs on {} node(s)", .0.len())]
  InvalidInputs(Vec<InvalidNodeInputs>),
}
