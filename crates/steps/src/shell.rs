//! `ShellStep`: runs the step's `bash_command` through `sh -c`.
//!
//! Output shape: `{ "exit_code": 0, "stdout": "<trimmed stdout>" }`.

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::process::Command;
use tracing::{debug, info};

use crate::{ExecutableStep, StepContext, StepError};

/// Config key holding the command line.
pub const COMMAND_KEY: &str = "bash_command";

/// Executes a shell command and waits for it to exit.
#[derive(Debug, Clone)]
pub struct ShellStep {
    shell: String,
}

impl Default for ShellStep {
    fn default() -> Self {
        Self { shell: "sh".to_string() }
    }
}

impl ShellStep {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different interpreter (it must accept `-c <command>`).
    pub fn with_shell(shell: impl Into<String>) -> Self {
        Self { shell: shell.into() }
    }
}

#[async_trait]
impl ExecutableStep for ShellStep {
    async fn execute(&self, _input: Value, ctx: &StepContext) -> Result<Value, StepError> {
        let command = ctx.config_str(COMMAND_KEY).ok_or_else(|| {
            StepError::Fatal(format!("step '{}' has no '{COMMAND_KEY}' configured", ctx.step_id))
        })?;

        info!(step_id = %ctx.step_id, attempt = ctx.attempt, "running command: {command}");

        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| StepError::Fatal(format!("failed to spawn '{}': {e}", self.shell)))?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

        if !stderr.is_empty() {
            debug!(step_id = %ctx.step_id, "stderr: {stderr}");
        }

        match output.status.code() {
            Some(0) => Ok(json!({ "exit_code": 0, "stdout": stdout })),
            Some(code) => Err(StepError::Retryable(format!(
                "command exited with status {code}: {stderr}"
            ))),
            // Terminated by a signal.
            None => Err(StepError::Retryable(format!(
                "command was terminated by a signal: {stderr}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn ctx(config: Value) -> StepContext {
        StepContext {
            workflow_name: "wf".into(),
            run_id: Uuid::new_v4(),
            step_id: "shell".into(),
            attempt: 1,
            config,
        }
    }

    #[tokio::test]
    async fn successful_command_captures_stdout() {
        let out = ShellStep::new()
            .execute(Value::Null, &ctx(json!({ "bash_command": "echo hello" })))
            .await
            .expect("echo should succeed");

        assert_eq!(out["exit_code"], 0);
        assert_eq!(out["stdout"], "hello");
    }

    #[tokio::test]
    async fn non_zero_exit_is_retryable() {
        let err = ShellStep::new()
            .execute(Value::Null, &ctx(json!({ "bash_command": "exit 3" })))
            .await
            .unwrap_err();

        assert!(err.is_retryable());
        assert!(err.message().contains("status 3"));
    }

    #[tokio::test]
    async fn missing_command_is_fatal() {
        let err = ShellStep::new()
            .execute(Value::Null, &ctx(json!({})))
            .await
            .unwrap_err();

        assert!(matches!(err, StepError::Fatal(_)));
    }

    #[tokio::test]
    async fn unknown_interpreter_is_fatal() {
        let err = ShellStep::with_shell("definitely-not-a-shell-binary")
            .execute(Value::Null, &ctx(json!({ "bash_command": "true" })))
            .await
            .unwrap_err();

        assert!(matches!(err, StepError::Fatal(_)));
    }
}
