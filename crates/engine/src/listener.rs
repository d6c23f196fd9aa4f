//! Hooks invoked by the executor around every step.
//!
//! Listeners observe; they cannot fail a run. Implementations that talk to
//! the outside world should log their own errors.

use async_trait::async_trait;

use crate::models::{StepRun, WorkflowRun};

#[async_trait]
pub trait RunListener: Send + Sync {
    /// `step` is in state `Running` with `started_at` set.
    async fn on_step_started(&self, _run: &WorkflowRun, _step: &StepRun) {}

    /// `step` is in state `Success` with its output recorded.
    async fn on_step_succeeded(&self, _run: &WorkflowRun, _step: &StepRun) {}

    /// `step` is in state `Failed` with `error` set.
    async fn on_step_failed(&self, _run: &WorkflowRun, _step: &StepRun) {}
}
