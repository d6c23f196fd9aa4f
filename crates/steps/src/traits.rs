//! The `ExecutableStep` trait: the contract every step must fulfil.

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::StepError;

/// Context handed to a step for a single attempt.
///
/// Defined here (in the steps crate) so both the engine and individual step
/// implementations can import it without a circular dependency.
#[derive(Debug, Clone)]
pub struct StepContext {
    /// Name of the parent workflow.
    pub workflow_name: String,
    /// ID of the current workflow run.
    pub run_id: Uuid,
    /// ID of the step inside the workflow.
    pub step_id: String,
    /// 1-based attempt number.
    pub attempt: u32,
    /// The step's configuration from its definition.
    pub config: Value,
}

impl StepContext {
    /// Look up a string field in the step's configuration.
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(Value::as_str)
    }
}

/// The core step trait.
#[async_trait]
pub trait ExecutableStep: Send + Sync {
    /// Execute the step, receive the *previous* step's JSON output as `input`,
    /// and return this step's JSON output.
    async fn execute(
        &self,
        input: Value,
        ctx: &StepContext,
    ) -> Result<Value, StepError>;
}
