//! End-to-end runs of `event_order` through the scheduler.
//!
//! These spawn real `sh -c "sleep N"` processes, so delays are kept short.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use axum::{extract::Json, extract::State, http::StatusCode, routing::post, Router};
use chrono::{Duration, Utc};
use serde_json::Value;

use engine::{EngineError, RunStatus, StepState};
use fixtures::{build_scheduler, FixtureConfig};
use lineage::{
    HttpConfig, InMemoryTransport, LineageClient, LineageConfig, Producer, RunEvent, RunState,
};

const PRODUCER: &str = "https://github.com/OpenLineage/OpenLineage/tree/0.0.1/integration/airflow";

fn config(namespace: Option<&str>, delay_secs: u64) -> FixtureConfig {
    FixtureConfig {
        namespace: namespace.map(str::to_string),
        ..FixtureConfig::default()
    }
    .with_delay_secs(delay_secs)
}

fn in_memory() -> (LineageClient, Arc<InMemoryTransport>) {
    let transport = Arc::new(InMemoryTransport::new());
    (LineageClient::new(transport.clone()), transport)
}

#[tokio::test]
async fn single_trigger_waits_then_emits_one_event() {
    let (client, transport) = in_memory();
    let scheduler = build_scheduler(&config(Some("test-namespace"), 1), client, false).unwrap();

    let outcomes = scheduler.tick(Utc::now()).await;
    assert_eq!(outcomes.len(), 1);
    let run = outcomes.into_iter().next().unwrap().expect("run succeeds").run;

    assert_eq!(run.status, RunStatus::Success);
    assert_eq!(run.succeeded_steps(), vec!["just_wait", "emit_event"]);

    let events = transport.events();
    assert_eq!(events.len(), 1);
    let event = &events[0];
    assert_eq!(event.event_type, RunState::Complete);
    assert_eq!(event.job.name, "emit_event.wait-for-me");
    assert_eq!(event.job.namespace.as_deref(), Some("test-namespace"));
    assert!(event.inputs.is_empty());
    assert!(event.outputs.is_empty());
    assert_eq!(event.producer.as_str(), PRODUCER);

    // Emitted only after the wait finished, at least `delay` after the trigger.
    let wait = run.step("just_wait").unwrap();
    let emit = run.step("emit_event").unwrap();
    assert!(emit.started_at.unwrap() >= wait.finished_at.unwrap());
    assert!(event.event_time >= wait.finished_at.unwrap());
    assert!(event.event_time - run.triggered_at >= Duration::seconds(1));

    // `@once` never fires again.
    assert!(scheduler.tick(Utc::now()).await.is_empty());
    assert_eq!(transport.len(), 1);
}

#[tokio::test]
async fn repeated_runs_emit_distinct_run_ids() {
    let (client, transport) = in_memory();
    let scheduler = build_scheduler(&config(None, 0), client, false).unwrap();

    for _ in 0..3 {
        scheduler.trigger("event_order").await.unwrap();
    }

    let events = transport.events();
    assert_eq!(events.len(), 3);
    let ids: HashSet<_> = events.iter().map(|e| e.run.run_id).collect();
    assert_eq!(ids.len(), 3);
    assert!(events.iter().all(|e| e.producer.as_str() == PRODUCER));
}

#[tokio::test]
async fn unset_namespace_is_absent_from_the_payload() {
    let (client, transport) = in_memory();
    let scheduler = build_scheduler(&config(None, 0), client, false).unwrap();

    scheduler.trigger("event_order").await.unwrap();

    let payload = serde_json::to_value(&transport.events()[0]).unwrap();
    assert!(payload["job"].get("namespace").is_none());
    assert_eq!(payload["job"]["name"], "emit_event.wait-for-me");
}

#[tokio::test]
async fn custom_producer_is_used_for_every_event() {
    let (client, transport) = in_memory();
    let config = config(None, 0).with_producer(Producer::new("https://example.com/custom"));
    let scheduler = build_scheduler(&config, client, true).unwrap();

    scheduler.trigger("event_order").await.unwrap();

    let events = transport.events();
    assert!(!events.is_empty());
    assert!(events.iter().all(|e| e.producer.as_str() == "https://example.com/custom"));
}

#[tokio::test]
async fn task_events_bracket_the_custom_event() {
    let (client, transport) = in_memory();
    let scheduler = build_scheduler(&config(Some("ns"), 0), client, true).unwrap();

    scheduler.trigger("event_order").await.unwrap();

    let seen: Vec<(RunState, String)> = transport
        .events()
        .into_iter()
        .map(|e: RunEvent| (e.event_type, e.job.name))
        .collect();
    let expected = [
        (RunState::Start, "event_order.just_wait"),
        (RunState::Complete, "event_order.just_wait"),
        (RunState::Start, "event_order.emit_event"),
        (RunState::Complete, "emit_event.wait-for-me"),
        (RunState::Complete, "event_order.emit_event"),
    ];
    assert_eq!(seen.len(), expected.len());
    for ((state, job), (want_state, want_job)) in seen.iter().zip(expected) {
        assert_eq!((*state, job.as_str()), (want_state, want_job));
    }
}

// ============================================================
// Against an HTTP collector
// ============================================================

#[derive(Clone)]
struct Collector {
    status: StatusCode,
    received: Arc<Mutex<Vec<Value>>>,
}

async fn collect(State(collector): State<Collector>, Json(body): Json<Value>) -> StatusCode {
    collector.received.lock().unwrap().push(body);
    collector.status
}

async fn http_client(status: StatusCode) -> (LineageClient, Collector) {
    let collector = Collector {
        status,
        received: Arc::new(Mutex::new(Vec::new())),
    };
    let app = Router::new()
        .route("/api/v1/lineage", post(collect))
        .with_state(collector.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let url = reqwest::Url::parse(&format!("http://{addr}")).unwrap();
    let client = LineageClient::from_config(&LineageConfig::http(HttpConfig::new(url))).unwrap();
    (client, collector)
}

#[tokio::test]
async fn collector_receives_the_complete_event() {
    let (client, collector) = http_client(StatusCode::CREATED).await;
    let scheduler = build_scheduler(&config(Some("http-ns"), 0), client, false).unwrap();

    scheduler.trigger("event_order").await.unwrap();

    let received = collector.received.lock().unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0]["eventType"], "COMPLETE");
    assert_eq!(received[0]["job"]["namespace"], "http-ns");
    assert_eq!(received[0]["job"]["name"], "emit_event.wait-for-me");
    assert_eq!(received[0]["inputs"], serde_json::json!([]));
    assert_eq!(received[0]["outputs"], serde_json::json!([]));
    assert_eq!(received[0]["producer"], PRODUCER);
}

#[tokio::test]
async fn rejected_emission_fails_the_emit_step_only() {
    let (client, collector) = http_client(StatusCode::INTERNAL_SERVER_ERROR).await;
    let scheduler = build_scheduler(&config(None, 0), client, false).unwrap();

    let err = scheduler.trigger("event_order").await.unwrap_err();

    let run = err.run().expect("run record attached");
    assert_eq!(run.step("just_wait").unwrap().state, StepState::Success);
    assert_eq!(run.step("emit_event").unwrap().state, StepState::Failed);
    assert!(matches!(
        err,
        EngineError::RunFailed { ref cause, .. }
            if matches!(**cause, EngineError::StepRetryExhausted { attempts: 1, .. })
    ));
    // One attempt, no retry.
    assert_eq!(collector.received.lock().unwrap().len(), 1);
}
