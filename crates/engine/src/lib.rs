//! `engine` crate: workflow models, DAG validation, the registry, the
//! scheduler and the execution engine.

pub mod models;
pub mod error;
pub mod dag;
pub mod listener;
pub mod registry;
pub mod executor;
pub mod scheduler;

pub use models::{
    DefaultArgs, Edge, RunStatus, Schedule, StepDefinition, StepRun, StepState, Workflow,
    WorkflowRun,
};
pub use error::EngineError;
pub use dag::validate_dag;
pub use listener::RunListener;
pub use registry::WorkflowRegistry;
pub use executor::{ExecutionResult, ExecutorConfig, StepRegistry, WorkflowExecutor};
pub use scheduler::Scheduler;
