//! Scheduler: decides when registered workflows are triggered.
//!
//! Only two schedules exist: `@once` workflows are triggered a single time
//! after their start date, manual workflows only through [`Scheduler::trigger`].

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, info};

use crate::executor::{ExecutionResult, WorkflowExecutor};
use crate::models::{Schedule, Workflow};
use crate::registry::WorkflowRegistry;
use crate::EngineError;

pub struct Scheduler {
    registry: Arc<WorkflowRegistry>,
    executor: Arc<WorkflowExecutor>,
    /// Names of `@once` workflows that already got their run.
    triggered: Mutex<HashSet<String>>,
}

impl Scheduler {
    pub fn new(registry: Arc<WorkflowRegistry>, executor: Arc<WorkflowExecutor>) -> Self {
        Self {
            registry,
            executor,
            triggered: Mutex::new(HashSet::new()),
        }
    }

    /// Workflows due at `now`. Claims each `@once` workflow so later ticks
    /// skip it.
    fn claim_due(&self, now: DateTime<Utc>) -> Vec<Arc<Workflow>> {
        let mut triggered = self.triggered.lock().unwrap_or_else(|e| e.into_inner());

        self.registry
            .all()
            .into_iter()
            .filter(|wf| match wf.schedule {
                Schedule::Once => wf.default_args.start_date <= now,
                Schedule::Manual => false,
            })
            .filter(|wf| triggered.insert(wf.name.clone()))
            .collect()
    }

    /// Trigger every workflow that is due at `now`, running each to
    /// completion. Returns one outcome per triggered workflow.
    pub async fn tick(&self, now: DateTime<Utc>) -> Vec<Result<ExecutionResult, EngineError>> {
        let due = self.claim_due(now);
        if due.is_empty() {
            debug!("scheduler tick at {now}: nothing due");
            return Vec::new();
        }

        let mut outcomes = Vec::with_capacity(due.len());
        for workflow in due {
            info!(workflow = %workflow.name, "triggering scheduled run");
            outcomes.push(self.execute(&workflow).await);
        }
        outcomes
    }

    /// Run a registered workflow right away, regardless of its schedule.
    ///
    /// # Errors
    /// [`EngineError::UnknownWorkflow`] if `name` is not registered, otherwise
    /// whatever the run returns.
    pub async fn trigger(&self, name: &str) -> Result<ExecutionResult, EngineError> {
        let workflow = self
            .registry
            .get(name)
            .ok_or_else(|| EngineError::UnknownWorkflow(name.to_string()))?;

        info!(workflow = %workflow.name, "triggering manual run");
        self.execute(&workflow).await
    }

    async fn execute(&self, workflow: &Workflow) -> Result<ExecutionResult, EngineError> {
        let input = json!({ "workflow": workflow.name, "triggered_at": Utc::now() });
        self.executor.run(workflow, input).await
    }
}
