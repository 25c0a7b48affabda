//! Shared types for StateGraph integration tests: Tally state and small nodes.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use provida::{AgentError, Append, GraphState, Node, Overwrite, RunContext, END};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tally {
    pub total: i64,
    pub visited: Vec<String>,
}

#[derive(Debug, Default)]
pub struct TallyPatch {
    pub total: Overwrite<i64>,
    pub visited: Append<String>,
}

impl GraphState for Tally {
    type Patch = TallyPatch;

    fn merge(&mut self, patch: TallyPatch) {
        patch.total.merge_into(&mut self.total);
        patch.visited.merge_into(&mut self.visited);
    }
}

/// Adds `delta` to the total and records its id.
pub struct AddNode {
    id: &'static str,
    delta: i64,
}

#[async_trait]
impl Node<Tally> for AddNode {
    fn id(&self) -> &str {
        self.id
    }

    async fn run(&self, state: Tally) -> Result<TallyPatch, AgentError> {
        Ok(TallyPatch {
            total: Overwrite::set(state.total + self.delta),
            visited: Append::one(self.id.to_string()),
        })
    }
}

pub fn add(id: &'static str, delta: i64) -> Arc<dyn Node<Tally>> {
    Arc::new(AddNode { id, delta })
}

/// Fails the first `failures` runs, then behaves like `AddNode`.
pub struct FlakyNode {
    id: &'static str,
    delta: i64,
    failures: usize,
    calls: AtomicUsize,
}

impl FlakyNode {
    pub fn new(id: &'static str, delta: i64, failures: usize) -> Self {
        Self {
            id,
            delta,
            failures,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Node<Tally> for FlakyNode {
    fn id(&self) -> &str {
        self.id
    }

    async fn run(&self, state: Tally) -> Result<TallyPatch, AgentError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            return Err(AgentError::ExecutionFailed(format!("{} is down", self.id)));
        }
        Ok(TallyPatch {
            total: Overwrite::set(state.total + self.delta),
            visited: Append::one(self.id.to_string()),
        })
    }
}

/// Cancels the run's token from inside the node, then records its id.
pub struct CancellingNode;

#[async_trait]
impl Node<Tally> for CancellingNode {
    fn id(&self) -> &str {
        "cancel"
    }

    async fn run(&self, _state: Tally) -> Result<TallyPatch, AgentError> {
        Ok(TallyPatch {
            visited: Append::one("cancel".to_string()),
            ..TallyPatch::default()
        })
    }

    async fn run_with_context(&self, state: Tally, ctx: &RunContext) -> Result<TallyPatch, AgentError> {
        ctx.cancel.cancel();
        self.run(state).await
    }
}

pub fn path_map(pairs: &[(&str, &str)]) -> Option<HashMap<String, String>> {
    Some(
        pairs
            .iter()
            .map(|(l, t)| (l.to_string(), t.to_string()))
            .collect(),
    )
}

/// Path map sending `"again"` back to `node` and `"done"` to END.
pub fn loop_map(node: &str) -> Option<HashMap<String, String>> {
    path_map(&[("again", node), ("done", END)])
}
