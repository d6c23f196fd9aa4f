//! Workflow execution engine.
//!
//! `WorkflowExecutor` is the central orchestrator:
//! 1. Validates the DAG and produces a topological ordering.
//! 2. Iterates through steps in order, dispatching each via `ExecutableStep`.
//!    A step only starts once every upstream step has succeeded.
//! 3. Passes the previous step's JSON output as input to the next step.
//! 4. Records per-step state, attempts and timings in a `WorkflowRun`.
//! 5. Handles `StepError::Retryable` (up to `default_args.retries`) and
//!    `StepError::Fatal` (abort immediately).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use steps::{ExecutableStep, StepContext, StepError};

use crate::dag::validate_dag;
use crate::listener::RunListener;
use crate::models::{RunStatus, StepDefinition, StepState, Workflow, WorkflowRun};
use crate::EngineError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tuning knobs for the executor.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Ceiling for the exponential back-off between retries.
    pub max_retry_delay: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_retry_delay: Duration::from_secs(3600),
        }
    }
}

// ---------------------------------------------------------------------------
// Step registry
// ---------------------------------------------------------------------------

/// Maps `step_type` strings to `ExecutableStep` implementations.
pub type StepRegistry = HashMap<String, Arc<dyn ExecutableStep>>;

// ---------------------------------------------------------------------------
// Output of a completed execution
// ---------------------------------------------------------------------------

/// The result of running a full workflow.
#[derive(Debug)]
pub struct ExecutionResult {
    /// Per-step record of the run.
    pub run: WorkflowRun,
    /// The JSON output produced by the *last* step in the sorted order.
    pub output: Value,
}

// ---------------------------------------------------------------------------
// WorkflowExecutor
// ---------------------------------------------------------------------------

/// Runs one workflow execution at a time; holds no per-run state.
pub struct WorkflowExecutor {
    registry: StepRegistry,
    config: ExecutorConfig,
    listener: Option<Arc<dyn RunListener>>,
}

impl WorkflowExecutor {
    pub fn new(registry: StepRegistry, config: ExecutorConfig) -> Self {
        Self { registry, config, listener: None }
    }

    /// Attach a listener notified around every step.
    pub fn with_listener(mut self, listener: Arc<dyn RunListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    /// Run the workflow and return the run record plus the final output.
    ///
    /// # Errors
    /// Validation errors are returned as-is. A failing step yields
    /// [`EngineError::RunFailed`] wrapping the step error and the run record.
    #[instrument(skip(self, workflow, initial_input), fields(workflow = %workflow.name))]
    pub async fn run(
        &self,
        workflow: &Workflow,
        initial_input: Value,
    ) -> Result<ExecutionResult, EngineError> {
        let sorted_ids = validate_dag(workflow)?;
        let mut run = WorkflowRun::new(&workflow.name, &sorted_ids);

        info!(
            run_id = %run.run_id,
            "executing {} steps in order: {:?}",
            sorted_ids.len(),
            sorted_ids
        );

        let step_map: HashMap<&str, &StepDefinition> =
            workflow.steps.iter().map(|s| (s.id.as_str(), s)).collect();

        let mut current_input = initial_input;

        for (idx, step_id) in sorted_ids.iter().enumerate() {
            let def = step_map[step_id.as_str()];

            {
                let record = &mut run.steps[idx];
                record.state = StepState::Running;
                record.started_at = Some(Utc::now());
            }
            if let Some(listener) = &self.listener {
                listener.on_step_started(&run, &run.steps[idx]).await;
            }

            let (attempts, outcome) = match self.registry.get(&def.step_type) {
                Some(step_impl) => {
                    self.execute_with_retry(workflow, run.run_id, def, step_impl.as_ref(), &current_input)
                        .await
                }
                None => (
                    0,
                    Err(EngineError::UnknownStepType {
                        step_id: step_id.clone(),
                        step_type: def.step_type.clone(),
                    }),
                ),
            };

            let record = &mut run.steps[idx];
            record.attempts = attempts;
            record.finished_at = Some(Utc::now());

            match outcome {
                Ok(output) => {
                    record.state = StepState::Success;
                    record.output = Some(output.clone());
                    info!(run_id = %run.run_id, "step '{}' succeeded", step_id);

                    if let Some(listener) = &self.listener {
                        listener.on_step_succeeded(&run, &run.steps[idx]).await;
                    }
                    current_input = output;
                }

                Err(cause) => {
                    record.state = StepState::Failed;
                    record.error = Some(cause.to_string());
                    error!(run_id = %run.run_id, "step '{}' failed: {}", step_id, cause);

                    if let Some(listener) = &self.listener {
                        listener.on_step_failed(&run, &run.steps[idx]).await;
                    }

                    for later in &mut run.steps[idx + 1..] {
                        later.state = StepState::UpstreamFailed;
                    }
                    run.status = RunStatus::Failed;
                    run.finished_at = Some(Utc::now());

                    return Err(EngineError::RunFailed {
                        workflow: workflow.name.clone(),
                        run_id: run.run_id,
                        run: Box::new(run),
                        cause: Box::new(cause),
                    });
                }
            }
        }

        run.status = RunStatus::Success;
        run.finished_at = Some(Utc::now());

        info!("workflow '{}' run {} succeeded", workflow.name, run.run_id);

        Ok(ExecutionResult {
            run,
            output: current_input,
        })
    }

    // -----------------------------------------------------------------------
    // Internal: execute a single step with retry and timeout handling.
    // Returns the number of attempts made alongside the outcome.
    // -----------------------------------------------------------------------

    async fn execute_with_retry(
        &self,
        workflow: &Workflow,
        run_id: Uuid,
        def: &StepDefinition,
        step: &dyn ExecutableStep,
        input: &Value,
    ) -> (u32, Result<Value, EngineError>) {
        let args = &workflow.default_args;
        let base_delay = Duration::from_millis(args.retry_delay_ms);
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let ctx = StepContext {
                workflow_name: workflow.name.clone(),
                run_id,
                step_id: def.id.clone(),
                attempt: attempts,
                config: def.config.clone(),
            };

            let attempt = step.execute(input.clone(), &ctx);
            let outcome = match args.execution_timeout_secs {
                Some(secs) => match tokio::time::timeout(Duration::from_secs(secs), attempt).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        return (
                            attempts,
                            Err(EngineError::StepTimedOut {
                                step_id: def.id.clone(),
                                timeout_secs: secs,
                            }),
                        );
                    }
                },
                None => attempt.await,
            };

            match outcome {
                Ok(output) => return (attempts, Ok(output)),

                Err(StepError::Fatal(msg)) => {
                    return (
                        attempts,
                        Err(EngineError::StepFatal {
                            step_id: def.id.clone(),
                            message: msg,
                        }),
                    );
                }

                Err(StepError::Retryable(msg)) => {
                    if attempts > args.retries {
                        return (
                            attempts,
                            Err(EngineError::StepRetryExhausted {
                                step_id: def.id.clone(),
                                attempts,
                                message: msg,
                            }),
                        );
                    }

                    let delay = base_delay
                        .saturating_mul(2u32.saturating_pow(attempts - 1))
                        .min(self.config.max_retry_delay);

                    warn!(
                        "step '{}' retryable error (attempt {}/{}), retrying in {:?}: {}",
                        def.id,
                        attempts,
                        args.retries.saturating_add(1),
                        delay,
                        msg
                    );

                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
