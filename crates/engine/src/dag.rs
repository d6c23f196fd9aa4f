//! DAG validation: run this before registering or executing a workflow.
//!
//! Rules enforced:
//! 1. Step IDs must be unique within the workflow.
//! 2. Every edge must reference valid step IDs (both `from` and `to`).
//! 3. The directed graph must be acyclic (topological sort must succeed).
//!
//! Returns a topologically-sorted list of step IDs on success. Ties between
//! independent steps keep their declaration order so runs are reproducible.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::{EngineError, models::Workflow};

/// Validate the workflow's DAG and return steps in topological execution order.
///
/// # Errors
/// - [`EngineError::DuplicateStepId`] if two steps share an ID.
/// - [`EngineError::UnknownStepReference`] if an edge references a missing step.
/// - [`EngineError::CycleDetected`] if the graph is not acyclic.
pub fn validate_dag(workflow: &Workflow) -> Result<Vec<String>, EngineError> {
    // -----------------------------------------------------------------------
    // 1. Ensure step IDs are unique
    // -----------------------------------------------------------------------
    let mut seen_ids: HashSet<&str> = HashSet::new();
    for step in &workflow.steps {
        if !seen_ids.insert(step.id.as_str()) {
            return Err(EngineError::DuplicateStepId(step.id.clone()));
        }
    }

    // -----------------------------------------------------------------------
    // 2. Validate edge endpoints
    // -----------------------------------------------------------------------
    for edge in &workflow.edges {
        if !seen_ids.contains(edge.from.as_str()) {
            return Err(EngineError::UnknownStepReference {
                step_id: edge.from.clone(),
                side: "from",
            });
        }
        if !seen_ids.contains(edge.to.as_str()) {
            return Err(EngineError::UnknownStepReference {
                step_id: edge.to.clone(),
                side: "to",
            });
        }
    }

    // -----------------------------------------------------------------------
    // 3. Topological sort (Kahn's algorithm)
    // -----------------------------------------------------------------------
    let mut downstream: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut in_degree: HashMap<&str, usize> =
        workflow.steps.iter().map(|s| (s.id.as_str(), 0)).collect();

    for edge in &workflow.edges {
        downstream
            .entry(edge.from.as_str())
            .or_default()
            .push(edge.to.as_str());
        *in_degree.entry(edge.to.as_str()).or_insert(0) += 1;
    }

    // Seed with root steps in declaration order.
    let mut queue: VecDeque<&str> = workflow
        .steps
        .iter()
        .map(|s| s.id.as_str())
        .filter(|id| in_degree[id] == 0)
        .collect();

    let mut sorted: Vec<String> = Vec::with_capacity(workflow.steps.len());

    while let Some(step_id) = queue.pop_front() {
        sorted.push(step_id.to_owned());

        for &next in downstream.get(step_id).into_iter().flatten() {
            let deg = in_degree.entry(next).or_insert(0);
            *deg -= 1;
            if *deg == 0 {
                queue.push_back(next);
            }
        }
    }

    // Steps left with a positive in-degree sit on a cycle.
    if sorted.len() != workflow.steps.len() {
        return Err(EngineError::CycleDetected);
    }

    Ok(sorted)
}
