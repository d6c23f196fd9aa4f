//! The `event_order` workflow: `just_wait >> emit_event`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::SecondsFormat;
use serde_json::{json, Value};
use tracing::info;

use engine::{
    DefaultArgs, Edge, ExecutorConfig, Schedule, Scheduler, StepDefinition, StepRegistry, Workflow,
    WorkflowExecutor, WorkflowRegistry,
};
use lineage::{Job, LineageClient, LineageError, Producer, Run, RunEvent, RunState};
use steps::{ExecutableStep, ShellStep, StepContext, StepError};

use crate::config::WORKFLOW_NAME;
use crate::{FixtureConfig, FixtureError, LineageRunListener};

pub const WAIT_STEP: &str = "just_wait";
pub const EMIT_STEP: &str = "emit_event";

/// Registry key of [`EmitEventStep`].
pub const EMIT_STEP_TYPE: &str = "emit_lineage_event";
pub const SHELL_STEP_TYPE: &str = "bash";

const JOB_NAME_KEY: &str = "job_name";

/// The workflow definition. Does not register it anywhere.
pub fn event_order_workflow(config: &FixtureConfig) -> Workflow {
    let mut default_args = DefaultArgs::new("datascience", 7);
    default_args.email = vec!["datascience@example.com".to_string()];

    Workflow::new(
        WORKFLOW_NAME,
        "Test dag.",
        Schedule::Once,
        default_args,
        vec![
            StepDefinition::new(
                WAIT_STEP,
                SHELL_STEP_TYPE,
                json!({ "bash_command": format!("sleep {}", config.delay_secs) }),
            ),
            StepDefinition::new(
                EMIT_STEP,
                EMIT_STEP_TYPE,
                json!({ JOB_NAME_KEY: config.job_name }),
            ),
        ],
        vec![Edge::new(WAIT_STEP, EMIT_STEP)],
    )
}

/// Step implementations the workflow refers to.
pub fn step_registry(client: LineageClient, config: &FixtureConfig) -> StepRegistry {
    let mut registry = StepRegistry::new();
    registry.insert(SHELL_STEP_TYPE.to_string(), Arc::new(ShellStep::new()));
    registry.insert(
        EMIT_STEP_TYPE.to_string(),
        Arc::new(EmitEventStep::new(client, config.producer.clone(), config.namespace.clone())),
    );
    registry
}

/// Register `event_order` and wire a scheduler around it. With
/// `task_events`, every step transition is also reported as a lineage event.
pub fn build_scheduler(
    config: &FixtureConfig,
    client: LineageClient,
    task_events: bool,
) -> Result<Scheduler, FixtureError> {
    config.validate()?;

    let registry = Arc::new(WorkflowRegistry::new());
    registry.register(event_order_workflow(config))?;

    let mut executor = WorkflowExecutor::new(
        step_registry(client.clone(), config),
        ExecutorConfig::default(),
    );
    if task_events {
        executor = executor.with_listener(Arc::new(LineageRunListener::new(
            client,
            config.producer.clone(),
            config.namespace.clone(),
        )));
    }

    Ok(Scheduler::new(registry, Arc::new(executor)))
}

// ---------------------------------------------------------------------------
// EmitEventStep
// ---------------------------------------------------------------------------

/// Emits one `COMPLETE` event per execution, with a fresh run id each time.
#[derive(Debug, Clone)]
pub struct EmitEventStep {
    client: LineageClient,
    producer: Producer,
    namespace: Option<String>,
}

impl EmitEventStep {
    pub fn new(client: LineageClient, producer: Producer, namespace: Option<String>) -> Self {
        Self { client, producer, namespace }
    }

    /// The event this step sends for `job_name`.
    pub fn build_event(&self, job_name: &str) -> RunEvent {
        RunEvent::new(
            &self.producer,
            RunState::Complete,
            Run::generate(),
            Job::new(self.namespace.clone(), job_name),
        )
    }
}

fn to_step_error(err: LineageError) -> StepError {
    if err.is_transient() {
        StepError::Retryable(err.to_string())
    } else {
        StepError::Fatal(err.to_string())
    }
}

#[async_trait]
impl ExecutableStep for EmitEventStep {
    async fn execute(&self, _input: Value, ctx: &StepContext) -> Result<Value, StepError> {
        let job_name = ctx.config_str(JOB_NAME_KEY).ok_or_else(|| {
            StepError::Fatal(format!("step '{}' has no '{JOB_NAME_KEY}' configured", ctx.step_id))
        })?;

        let event = self.build_event(job_name);
        info!(
            step_id = %ctx.step_id,
            lineage_run_id = %event.run.run_id,
            job = %event.job.name,
            "emitting {} event",
            event.event_type
        );

        self.client.emit(&event).await.map_err(to_step_error)?;

        Ok(json!({
            "run_id": event.run.run_id,
            "event_type": event.event_type,
            "event_time": event.event_time.to_rfc3339_opts(SecondsFormat::Micros, true),
            "job": event.job.name,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::validate_dag;
    use lineage::{InMemoryTransport, Transport};

    #[derive(Debug)]
    struct FailingTransport(u16);

    #[async_trait]
    impl Transport for FailingTransport {
        async fn emit(&self, _event: &RunEvent) -> Result<(), LineageError> {
            Err(LineageError::Status { status: self.0, body: "nope".into() })
        }

        fn kind(&self) -> &'static str {
            "failing"
        }
    }

    fn ctx(config: Value) -> StepContext {
        StepContext {
            workflow_name: WORKFLOW_NAME.into(),
            run_id: lineage::generate_new_uuid(),
            step_id: EMIT_STEP.into(),
            attempt: 1,
            config,
        }
    }

    #[test]
    fn workflow_declares_wait_before_emit() {
        let wf = event_order_workflow(&FixtureConfig::default());

        assert_eq!(wf.name, "event_order");
        assert_eq!(wf.description, "Test dag.");
        assert_eq!(wf.schedule, Schedule::Once);
        assert_eq!(wf.default_args.owner, "datascience");
        assert!(!wf.default_args.depends_on_past);
        assert!(!wf.default_args.email_on_failure);
        assert!(!wf.default_args.email_on_retry);
        assert_eq!(wf.default_args.email, vec!["datascience@example.com"]);
        assert_eq!(wf.step(WAIT_STEP).unwrap().config["bash_command"], "sleep 5");
        assert_eq!(wf.step(EMIT_STEP).unwrap().config["job_name"], "emit_event.wait-for-me");
        assert_eq!(wf.edges, vec![Edge::new("just_wait", "emit_event")]);
        assert_eq!(validate_dag(&wf).unwrap(), vec!["just_wait", "emit_event"]);
    }

    #[tokio::test]
    async fn emits_one_complete_event() {
        let transport = Arc::new(InMemoryTransport::new());
        let step = EmitEventStep::new(
            LineageClient::new(transport.clone()),
            Producer::new("https://example.com/producer"),
            Some("ns".into()),
        );

        let out = step
            .execute(Value::Null, &ctx(json!({ "job_name": "emit_event.wait-for-me" })))
            .await
            .unwrap();

        let events = transport.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, RunState::Complete);
        assert_eq!(events[0].job.namespace.as_deref(), Some("ns"));
        assert_eq!(events[0].producer.as_str(), "https://example.com/producer");
        assert_eq!(out["run_id"], events[0].run.run_id.to_string());
        assert_eq!(out["event_type"], "COMPLETE");
    }

    #[tokio::test]
    async fn delivery_failures_map_to_step_errors() {
        let step_with = |status| {
            EmitEventStep::new(
                LineageClient::new(Arc::new(FailingTransport(status))),
                Producer::default(),
                None,
            )
        };
        let config = json!({ "job_name": "job" });

        let err = step_with(503).execute(Value::Null, &ctx(config.clone())).await.unwrap_err();
        assert!(err.is_retryable());

        let err = step_with(400).execute(Value::Null, &ctx(config)).await.unwrap_err();
        assert!(matches!(err, StepError::Fatal(_)));
    }

    #[tokio::test]
    async fn missing_job_name_is_fatal() {
        let step = EmitEventStep::new(
            LineageClient::new(Arc::new(InMemoryTransport::new())),
            Producer::default(),
            None,
        );
        let err = step.execute(Value::Null, &ctx(json!({}))).await.unwrap_err();
        assert!(matches!(err, StepError::Fatal(_)));
    }
}
