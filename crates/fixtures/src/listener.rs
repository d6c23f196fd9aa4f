//! Reports step transitions as lineage events.
//!
//! Each step becomes job `<workflow>.<step>`; its START and COMPLETE/FAIL
//! events share the step run's id. Delivery failures are logged and never
//! fail the step.

use async_trait::async_trait;
use chrono::Utc;
use tracing::warn;

use engine::{RunListener, StepRun, WorkflowRun};
use lineage::{Job, LineageClient, Producer, Run, RunEvent, RunState};

pub struct LineageRunListener {
    client: LineageClient,
    producer: Producer,
    namespace: Option<String>,
}

impl LineageRunListener {
    pub fn new(client: LineageClient, producer: Producer, namespace: Option<String>) -> Self {
        Self { client, producer, namespace }
    }

    fn event_for(&self, run: &WorkflowRun, step: &StepRun, state: RunState) -> RunEvent {
        let at = match state {
            RunState::Start => step.started_at,
            _ => step.finished_at,
        };
        RunEvent::new(
            &self.producer,
            state,
            Run::new(step.id),
            Job::new(self.namespace.clone(), format!("{}.{}", run.workflow_name, step.step_id)),
        )
        .with_event_time(at.unwrap_or_else(Utc::now))
    }

    async fn report(&self, run: &WorkflowRun, step: &StepRun, state: RunState) {
        let event = self.event_for(run, step, state);
        if let Err(e) = self.client.emit(&event).await {
            warn!(
                run_id = %run.run_id,
                step_id = %step.step_id,
                "failed to emit {state} event for step: {e}"
            );
        }
    }
}

#[async_trait]
impl RunListener for LineageRunListener {
    async fn on_step_started(&self, run: &WorkflowRun, step: &StepRun) {
        self.report(run, step, RunState::Start).await;
    }

    async fn on_step_succeeded(&self, run: &WorkflowRun, step: &StepRun) {
        self.report(run, step, RunState::Complete).await;
    }

    async fn on_step_failed(&self, run: &WorkflowRun, step: &StepRun) {
        self.report(run, step, RunState::Fail).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use lineage::InMemoryTransport;

    #[tokio::test]
    async fn start_and_complete_share_the_step_run_id() {
        let transport = Arc::new(InMemoryTransport::new());
        let listener = LineageRunListener::new(
            LineageClient::new(transport.clone()),
            Producer::default(),
            Some("ns".into()),
        );
        let run = WorkflowRun::new("event_order", &["just_wait".to_string()]);
        let mut step = run.steps[0].clone();
        step.started_at = Some(Utc::now());

        listener.on_step_started(&run, &step).await;
        step.finished_at = Some(Utc::now());
        listener.on_step_succeeded(&run, &step).await;

        let events = transport.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, RunState::Start);
        assert_eq!(events[1].event_type, RunState::Complete);
        assert_eq!(events[0].run.run_id, events[1].run.run_id);
        assert_eq!(events[0].job.name, "event_order.just_wait");
        assert_eq!(events[0].event_time, step.started_at.unwrap());
        assert_eq!(events[1].event_time, step.finished_at.unwrap());
    }
}
