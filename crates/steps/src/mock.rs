//! `MockStep`: a test double for `ExecutableStep`.
//!
//! Useful in unit and integration tests where a real step implementation is
//! either unavailable or irrelevant.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::{ExecutableStep, StepContext, StepError};

/// Behaviour injected into `MockStep` at construction time.
pub enum MockBehaviour {
    /// Return a specific JSON value.
    ReturnValue(Value),
    /// Fail with a `Retryable` error.
    FailRetryable(String),
    /// Fail with a `Fatal` error.
    FailFatal(String),
    /// Fail with a `Retryable` error for the first `failures` calls, then
    /// return the value.
    Flaky { failures: usize, value: Value },
    /// Sleep before returning the value.
    Slow { delay: Duration, value: Value },
}

/// A mock step that records every call it receives and returns a
/// programmer-specified result.
pub struct MockStep {
    /// Label used in test assertions.
    pub name: String,
    /// What the step will do when `execute` is called.
    pub behaviour: MockBehaviour,
    /// All inputs seen by this step (in call order).
    pub calls: Arc<Mutex<Vec<Value>>>,
}

impl MockStep {
    fn with_behaviour(name: impl Into<String>, behaviour: MockBehaviour) -> Self {
        Self {
            name: name.into(),
            behaviour,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock that always succeeds with the given value.
    pub fn returning(name: impl Into<String>, value: Value) -> Self {
        Self::with_behaviour(name, MockBehaviour::ReturnValue(value))
    }

    /// Create a mock that always fails with a `Fatal` error.
    pub fn failing_fatal(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::with_behaviour(name, MockBehaviour::FailFatal(msg.into()))
    }

    /// Create a mock that always fails with a `Retryable` error.
    pub fn failing_retryable(name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::with_behaviour(name, MockBehaviour::FailRetryable(msg.into()))
    }

    /// Create a mock that fails `failures` times before succeeding.
    pub fn flaky(name: impl Into<String>, failures: usize, value: Value) -> Self {
        Self::with_behaviour(name, MockBehaviour::Flaky { failures, value })
    }

    /// Create a mock that takes `delay` to succeed.
    pub fn slow(name: impl Into<String>, delay: Duration, value: Value) -> Self {
        Self::with_behaviour(name, MockBehaviour::Slow { delay, value })
    }

    /// Number of times this step has been executed.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn output(&self, v: &Value) -> Value {
        // Merge the node's own name into the output so tests can trace the
        // data flowing through the workflow.
        let mut out = json!({ "step": self.name });
        if let (Some(out_obj), Some(v_obj)) = (out.as_object_mut(), v.as_object()) {
            for (k, val) in v_obj {
                out_obj.insert(k.clone(), val.clone());
            }
        }
        out
    }
}

#[async_trait]
impl ExecutableStep for MockStep {
    async fn execute(&self, input: Value, _ctx: &StepContext) -> Result<Value, StepError> {
        let call_index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(input);
            calls.len()
        };

        match &self.behaviour {
            MockBehaviour::ReturnValue(v) => Ok(self.output(v)),
            MockBehaviour::FailRetryable(msg) => Err(StepError::Retryable(msg.clone())),
            MockBehaviour::FailFatal(msg)     => Err(StepError::Fatal(msg.clone())),
            MockBehaviour::Flaky { failures, value } => {
                if call_index <= *failures {
                    Err(StepError::Retryable(format!("{} flaked (call {call_index})", self.name)))
                } else {
                    Ok(self.output(value))
                }
            }
            MockBehaviour::Slow { delay, value } => {
                tokio::time::sleep(*delay).await;
                Ok(self.output(value))
            }
        }
    }
}
