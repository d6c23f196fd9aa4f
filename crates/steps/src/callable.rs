//! `CallableStep`: adapts an async closure into an [`ExecutableStep`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;

use crate::{ExecutableStep, StepContext, StepError};

type StepFn = dyn Fn(Value, StepContext) -> BoxFuture<'static, Result<Value, StepError>> + Send + Sync;

/// A step backed by an in-process function.
#[derive(Clone)]
pub struct CallableStep {
    name: String,
    func: Arc<StepFn>,
}

impl CallableStep {
    /// Wrap `func`; `name` is only used for diagnostics.
    ///
    /// ```ignore
    /// let step = CallableStep::new("greet", |_input, ctx| {
    ///     Box::pin(async move { Ok(serde_json::json!({ "hello": ctx.step_id })) })
    /// });
    /// ```
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Value, StepContext) -> BoxFuture<'static, Result<Value, StepError>>
            + Send
            + Sync
            + 'static,
    {
        Self { name: name.into(), func: Arc::new(func) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for CallableStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallableStep").field("name", &self.name).finish_non_exhaustive()
    }
}

#[async_trait]
impl ExecutableStep for CallableStep {
    async fn execute(&self, input: Value, ctx: &StepContext) -> Result<Value, StepError> {
        (self.func)(input, ctx.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    #[tokio::test]
    async fn closure_receives_input_and_context() {
        let step = CallableStep::new("echo", |input, ctx| {
            Box::pin(async move { Ok(json!({ "seen": input, "step": ctx.step_id })) })
        });
        let ctx = StepContext {
            workflow_name: "wf".into(),
            run_id: Uuid::new_v4(),
            step_id: "echo".into(),
            attempt: 1,
            config: Value::Null,
        };

        let out = step.execute(json!({ "x": 1 }), &ctx).await.unwrap();
        assert_eq!(out["seen"]["x"], 1);
        assert_eq!(out["step"], "echo");
        assert_eq!(step.name(), "echo");
    }
}
