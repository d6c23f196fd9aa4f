//! Workflow registry: the set of declared workflows, keyed by name.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use tracing::info;

use crate::{EngineError, Workflow, dag::validate_dag};

/// Holds validated, immutable workflow definitions.
#[derive(Debug, Default)]
pub struct WorkflowRegistry {
    workflows: RwLock<BTreeMap<String, Arc<Workflow>>>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and store a workflow definition.
    ///
    /// # Errors
    /// Any DAG validation error, or [`EngineError::DuplicateWorkflow`] when
    /// the name is taken.
    pub fn register(&self, workflow: Workflow) -> Result<Arc<Workflow>, EngineError> {
        let order = validate_dag(&workflow)?;

        let mut workflows = self.workflows.write().unwrap_or_else(|e| e.into_inner());
        if workflows.contains_key(&workflow.name) {
            return Err(EngineError::DuplicateWorkflow(workflow.name));
        }

        info!(
            workflow = %workflow.name,
            schedule = %workflow.schedule,
            "registered workflow with steps {:?}",
            order
        );

        let workflow = Arc::new(workflow);
        workflows.insert(workflow.name.clone(), Arc::clone(&workflow));
        Ok(workflow)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Workflow>> {
        self.workflows
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .cloned()
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.workflows
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect()
    }

    pub fn all(&self) -> Vec<Arc<Workflow>> {
        self.workflows
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DefaultArgs, Edge, Schedule, StepDefinition};

    fn workflow(name: &str) -> Workflow {
        Workflow::new(
            name,
            "",
            Schedule::Once,
            DefaultArgs::new("test", 1),
            vec![
                StepDefinition::new("a", "mock", serde_json::Value::Null),
                StepDefinition::new("b", "mock", serde_json::Value::Null),
            ],
            vec![Edge::new("a", "b")],
        )
    }

    #[test]
    fn register_then_get() {
        let registry = WorkflowRegistry::new();
        registry.register(workflow("event_order")).unwrap();

        let wf = registry.get("event_order").expect("registered");
        assert_eq!(wf.steps.len(), 2);
        assert_eq!(registry.names(), vec!["event_order"]);
        assert!(registry.get("other").is_none());
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let registry = WorkflowRegistry::new();
        registry.register(workflow("event_order")).unwrap();

        let err = registry.register(workflow("event_order")).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateWorkflow(name) if name == "event_order"));
        assert_eq!(registry.all().len(), 1);
    }

    #[test]
    fn invalid_dag_is_not_registered() {
        let registry = WorkflowRegistry::new();
        let mut wf = workflow("cyclic");
        wf.edges.push(Edge::new("b", "a"));

        assert!(matches!(registry.register(wf), Err(EngineError::CycleDetected)));
        assert!(registry.names().is_empty());
    }
}
