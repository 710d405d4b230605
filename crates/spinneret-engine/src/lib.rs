//! Spinneret Engine
//!
//! Drives compiled execution plans end-to-end: status bookkeeping for runs
//! and phases, input wiring between nodes, atomic credit metering, fail-fast
//! phase ordering, retry-safe finalization, and guaranteed release of the
//! shared browser resource.
//!
//! The engine never knows what a task does. Every task type implements the
//! [`TaskExecutor`] contract against a node-scoped [`ExecutionContext`]
//! view; the [`ExecutorRegistry`] is the only seam between the two.

mod context;
mod engine;
mod environment;
mod error;
mod executor;
mod logs;
mod retry;

pub use context::ExecutionContext;
pub use engine::{ExecutionEngine, RunSummary};
pub use environment::{Environment, NodeIo};
pub use error::EngineError;
pub use executor::{ExecutorRegistry, TaskError, TaskExecutor};
pub use logs::LogCollector;
pub use retry::RetryPolicy;
