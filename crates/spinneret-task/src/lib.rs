//! Spinneret Task
//!
//! This crate provides the static task catalog types: the immutable
//! [`TaskDefinition`] describing one task type's contract (inputs, outputs,
//! credit cost, entry-point eligibility) and the [`TaskRegistry`] that maps
//! task-type identifiers to their definitions.
//!
//! Definitions are registered once at process start and never mutated. Both
//! the plan compiler and the execution engine consult the registry through
//! [`TaskRegistry::lookup`]; an unknown task type is a recoverable condition
//! for every caller, never a crash.

mod definition;
mod registry;

pub use definition::{InputDef, OutputDef, ParamKind, TaskDefinition};
pub use registry::TaskRegistry;
