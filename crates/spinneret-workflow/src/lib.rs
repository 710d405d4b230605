//! Spinneret Workflow
//!
//! The strongly-typed workflow graph model and the execution-plan compiler.
//!
//! Wire-format payloads from `spinneret-config` are converted into [`Node`]
//! and [`Edge`] values here; [`compile`] then turns a node/edge graph into an
//! ordered [`ExecutionPlan`] of phases, or a structured [`CompileError`] when
//! the graph is not runnable (no entry point, unsatisfiable inputs, cycles).

mod error;
mod graph;
mod node;
mod plan;

pub use error::{CompileError, InvalidInputReason, InvalidNodeInputs};
pub use graph::Graph;
pub use node::{Edge, Node};
pub use plan::{ExecutionPlan, PlanPhase, compile};
