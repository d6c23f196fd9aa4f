//! Core domain models for the workflow engine.
//!
//! These types are the source of truth for what a workflow looks like in
//! memory. They round-trip through JSON so definitions can be printed and
//! validated from files.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EngineError;

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// When a workflow is started by the scheduler.
///
/// Serialised as the schedule expression: `"@once"` or `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Option<String>", into = "Option<String>")]
pub enum Schedule {
    /// Triggered exactly once, as soon as the start date has passed.
    Once,
    /// Never triggered by the scheduler; only by an explicit trigger.
    Manual,
}

impl FromStr for Schedule {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "@once" => Ok(Self::Once),
            "" | "None" | "none" | "@manual" => Ok(Self::Manual),
            other => Err(EngineError::UnsupportedSchedule(other.to_string())),
        }
    }
}

impl TryFrom<Option<String>> for Schedule {
    type Error = EngineError;

    fn try_from(value: Option<String>) -> Result<Self, Self::Error> {
        value.map_or(Ok(Self::Manual), |s| s.parse())
    }
}

impl From<Schedule> for Option<String> {
    fn from(schedule: Schedule) -> Self {
        match schedule {
            Schedule::Once => Some("@once".to_string()),
            Schedule::Manual => None,
        }
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Once => write!(f, "@once"),
            Self::Manual => write!(f, "None"),
        }
    }
}

// ---------------------------------------------------------------------------
// DefaultArgs
// ---------------------------------------------------------------------------

fn default_retry_delay_ms() -> u64 {
    300_000
}

/// Execution parameters applied to every step of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultArgs {
    pub owner: String,
    #[serde(default)]
    pub depends_on_past: bool,
    /// The scheduler never triggers a workflow before this instant.
    pub start_date: DateTime<Utc>,
    #[serde(default)]
    pub email: Vec<String>,
    #[serde(default)]
    pub email_on_failure: bool,
    #[serde(default)]
    pub email_on_retry: bool,
    /// How many times a retryable step failure is retried.
    #[serde(default)]
    pub retries: u32,
    /// Base back-off between retries; doubles on every further attempt.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Upper bound for a single step attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_timeout_secs: Option<u64>,
}

impl DefaultArgs {
    /// Defaults for `owner` with a start date `days` days ago.
    pub fn new(owner: impl Into<String>, days: u32) -> Self {
        Self {
            owner: owner.into(),
            depends_on_past: false,
            start_date: Self::days_ago(days),
            email: Vec::new(),
            email_on_failure: false,
            email_on_retry: false,
            retries: 0,
            retry_delay_ms: default_retry_delay_ms(),
            execution_timeout_secs: None,
        }
    }

    /// Midnight (UTC) `days` days before today.
    pub fn days_ago(days: u32) -> DateTime<Utc> {
        let date = Utc::now().date_naive() - Duration::days(i64::from(days));
        date.and_time(NaiveTime::MIN).and_utc()
    }
}

// ---------------------------------------------------------------------------
// StepDefinition
// ---------------------------------------------------------------------------

/// A single step in the workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
    /// Unique identifier within this workflow (referenced by edges).
    pub id: String,
    /// Maps to a registered `ExecutableStep` implementation.
    pub step_type: String,
    /// Arbitrary configuration passed to the step at execution time.
    #[serde(default)]
    pub config: serde_json::Value,
}

impl StepDefinition {
    pub fn new(
        id: impl Into<String>,
        step_type: impl Into<String>,
        config: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            step_type: step_type.into(),
            config,
        }
    }
}

// ---------------------------------------------------------------------------
// Edge
// ---------------------------------------------------------------------------

/// Ordering edge: `from` must succeed before `to` starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
}

impl Edge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self { from: from.into(), to: to.into() }
    }
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

/// A complete workflow definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub schedule: Schedule,
    pub default_args: DefaultArgs,
    pub steps: Vec<StepDefinition>,
    pub edges: Vec<Edge>,
    pub created_at: DateTime<Utc>,
}

impl Workflow {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        schedule: Schedule,
        default_args: DefaultArgs,
        steps: Vec<StepDefinition>,
        edges: Vec<Edge>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: description.into(),
            schedule,
            default_args,
            steps,
            edges,
            created_at: Utc::now(),
        }
    }

    pub fn step(&self, id: &str) -> Option<&StepDefinition> {
        self.steps.iter().find(|s| s.id == id)
    }
}

// ---------------------------------------------------------------------------
// Run records
// ---------------------------------------------------------------------------

/// Lifecycle of one step inside a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Pending,
    Running,
    Success,
    Failed,
    /// Never started because a predecessor failed.
    UpstreamFailed,
}

impl fmt::Display for StepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::UpstreamFailed => "upstream_failed",
        };
        f.write_str(s)
    }
}

/// One step's record within a [`WorkflowRun`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRun {
    /// Unique per step per run.
    pub id: Uuid,
    pub step_id: String,
    pub state: StepState,
    pub attempts: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub output: Option<serde_json::Value>,
    pub error: Option<String>,
}

impl StepRun {
    pub fn pending(step_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            step_id: step_id.into(),
            state: StepState::Pending,
            attempts: 0,
            started_at: None,
            finished_at: None,
            output: None,
            error: None,
        }
    }
}

/// Overall outcome of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Success,
    Failed,
}

/// Record of a single triggered execution of a workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub run_id: Uuid,
    pub workflow_name: String,
    pub status: RunStatus,
    pub triggered_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// In execution (topological) order.
    pub steps: Vec<StepRun>,
}

impl WorkflowRun {
    pub fn new(workflow_name: impl Into<String>, step_order: &[String]) -> Self {
        Self {
            run_id: Uuid::now_v7(),
            workflow_name: workflow_name.into(),
            status: RunStatus::Running,
            triggered_at: Utc::now(),
            finished_at: None,
            steps: step_order.iter().map(StepRun::pending).collect(),
        }
    }

    pub fn step(&self, step_id: &str) -> Option<&StepRun> {
        self.steps.iter().find(|s| s.step_id == step_id)
    }

    /// IDs of the steps that succeeded, in the order they finished.
    pub fn succeeded_steps(&self) -> Vec<&str> {
        let mut done: Vec<&StepRun> = self
            .steps
            .iter()
            .filter(|s| s.state == StepState::Success)
            .collect();
        done.sort_by_key(|s| s.finished_at);
        done.into_iter().map(|s| s.step_id.as_str()).collect()
    }
}
