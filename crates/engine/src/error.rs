//! Engine-level error types.

use thiserror::Error;
use uuid::Uuid;

use crate::models::WorkflowRun;

/// Errors produced by the workflow engine (registration, validation,
/// execution).
#[derive(Debug, Error)]
pub enum EngineError {
    // ------ Validation errors ------

    /// Two or more steps share the same ID.
    #[error("duplicate step ID: '{0}'")]
    DuplicateStepId(String),

    /// An edge references a step ID that doesn't exist in the workflow.
    #[error("edge references unknown step '{step_id}' ({side} side)")]
    UnknownStepReference {
        step_id: String,
        side: &'static str,
    },

    /// Topological sort detected a cycle.
    #[error("workflow graph contains a cycle")]
    CycleDetected,

    #[error("unsupported schedule expression: '{0}'")]
    UnsupportedSchedule(String),

    // ------ Registry errors ------

    /// A workflow with the same name is already registered.
    #[error("workflow '{0}' is already registered")]
    DuplicateWorkflow(String),

    #[error("no workflow named '{0}' is registered")]
    UnknownWorkflow(String),

    // ------ Execution errors ------

    /// No implementation is registered for a step's `step_type`.
    #[error("no implementation registered for step type '{step_type}' (step '{step_id}')")]
    UnknownStepType {
        step_id: String,
        step_type: String,
    },

    /// A step failed with a fatal error; the whole run is aborted.
    #[error("step '{step_id}' failed fatally: {message}")]
    StepFatal {
        step_id: String,
        message: String,
    },

    /// A step's retryable error was exhausted.
    #[error("step '{step_id}' exceeded retry limit after {attempts} attempts: {message}")]
    StepRetryExhausted {
        step_id: String,
        attempts: u32,
        message: String,
    },

    /// A single attempt ran past the workflow's execution timeout.
    #[error("step '{step_id}' timed out after {timeout_secs}s")]
    StepTimedOut {
        step_id: String,
        timeout_secs: u64,
    },

    /// A run stopped on a failing step. Carries the run record so callers can
    /// inspect which steps completed.
    #[error("run {run_id} of workflow '{workflow}' failed: {cause}")]
    RunFailed {
        workflow: String,
        run_id: Uuid,
        run: Box<WorkflowRun>,
        #[source]
        cause: Box<EngineError>,
    },
}

impl EngineError {
    /// The run record, when the error came from an executed run.
    pub fn run(&self) -> Option<&WorkflowRun> {
        match self {
            Self::RunFailed { run, .. } => Some(run),
            _ => None,
        }
    }
}
