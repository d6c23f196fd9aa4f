//! OpenLineage run-event model.
//!
//! Field names follow the 2-0-2 JSON schema (`eventType`, `eventTime`,
//! `run.runId`, `schemaURL`, ...). Facets are carried as opaque JSON maps.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

/// Producer used when none is configured.
pub const DEFAULT_PRODUCER: &str =
    "https://github.com/OpenLineage/OpenLineage/tree/0.0.1/integration/airflow";

pub const RUN_EVENT_SCHEMA_URL: &str =
    "https://openlineage.io/spec/2-0-2/OpenLineage.json#/definitions/RunEvent";

pub type Facets = serde_json::Map<String, serde_json::Value>;

/// A fresh, time-ordered run identifier (UUID v7).
pub fn generate_new_uuid() -> Uuid {
    Uuid::now_v7()
}

// ---------------------------------------------------------------------------
// RunState
// ---------------------------------------------------------------------------

/// Transition reported by a run event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    Start,
    Running,
    Complete,
    Abort,
    Fail,
    Other,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Start => "START",
            Self::Running => "RUNNING",
            Self::Complete => "COMPLETE",
            Self::Abort => "ABORT",
            Self::Fail => "FAIL",
            Self::Other => "OTHER",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Producer
// ---------------------------------------------------------------------------

/// URI of the software that produced an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Producer(String);

impl Producer {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Producer {
    fn default() -> Self {
        Self::new(DEFAULT_PRODUCER)
    }
}

impl fmt::Display for Producer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Run / Job / Dataset
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    pub run_id: Uuid,
    #[serde(default)]
    pub facets: Facets,
}

impl Run {
    pub fn new(run_id: Uuid) -> Self {
        Self { run_id, facets: Facets::new() }
    }

    /// A run with a freshly generated id.
    pub fn generate() -> Self {
        Self::new(generate_new_uuid())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    /// Omitted from the payload when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub name: String,
    #[serde(default)]
    pub facets: Facets,
}

impl Job {
    pub fn new(namespace: Option<String>, name: impl Into<String>) -> Self {
        Self {
            namespace,
            name: name.into(),
            facets: Facets::new(),
        }
    }
}

/// A dataset read by the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputDataset {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub facets: Facets,
    #[serde(default)]
    pub input_facets: Facets,
}

/// A dataset written by the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputDataset {
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub facets: Facets,
    #[serde(default)]
    pub output_facets: Facets,
}

/// Writes `eventTime` as RFC 3339 with microseconds and a `Z` suffix.
fn serialize_event_time<S>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&time.to_rfc3339_opts(SecondsFormat::Micros, true))
}

// ---------------------------------------------------------------------------
// RunEvent
// ---------------------------------------------------------------------------

/// "A run of `job` reached `event_type` at `event_time`."
///
/// Built once, never mutated after it is handed to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunEvent {
    pub event_type: RunState,
    #[serde(serialize_with = "serialize_event_time")]
    pub event_time: DateTime<Utc>,
    pub run: Run,
    pub job: Job,
    #[serde(default)]
    pub inputs: Vec<InputDataset>,
    #[serde(default)]
    pub outputs: Vec<OutputDataset>,
    pub producer: Producer,
    #[serde(rename = "schemaURL")]
    pub schema_url: String,
}

impl RunEvent {
    /// An event stamped with the current time and no datasets.
    pub fn new(producer: &Producer, event_type: RunState, run: Run, job: Job) -> Self {
        Self {
            event_type,
            event_time: Utc::now(),
            run,
            job,
            inputs: Vec::new(),
            outputs: Vec::new(),
            producer: producer.clone(),
            schema_url: RUN_EVENT_SCHEMA_URL.to_string(),
        }
    }

    pub fn with_event_time(mut self, event_time: DateTime<Utc>) -> Self {
        self.event_time = event_time;
        self
    }
}
