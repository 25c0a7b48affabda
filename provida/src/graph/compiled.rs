//! Compiled state graph: immutable; runs, resumes and inspects runs.
//!
//! Built by `StateGraph::compile` or `compile_with_checkpointer`. After every
//! node the patch is merged, the next node is resolved (routers see the
//! post-merge state) and a checkpoint recording that route is taken. With a
//! checkpointer and a `thread_id`, checkpoints are also persisted, which is
//! what `resume` reads.

use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::channels::{BoxedStateUpdater, GraphState};
use crate::error::AgentError;
use crate::memory::{Checkpoint, CheckpointError, CheckpointSource, Checkpointer, RunnableConfig};

use super::logging::{
    log_checkpoint_saved, log_graph_complete, log_graph_start, log_node_complete, log_node_start,
    log_run_error,
};
use super::node_middleware::NodeMiddleware;
use super::run_error::{RunAbortedError, RunError};
use super::state_graph::END;
use super::{NextEntry, Node, RunContext};

/// Where a run stands between two nodes.
struct RunCursor<S> {
    state: S,
    current: String,
    /// Steps completed so far (the input checkpoint is step 0).
    step: u64,
    last_checkpoint: Option<Checkpoint<S>>,
}

/// Compiled graph: immutable structure, ready to `invoke`.
///
/// **Interaction**: created by `StateGraph::compile*`; used by the workflow
/// facades in `crate::workflows`.
pub struct CompiledStateGraph<S>
where
    S: GraphState,
{
    pub(super) nodes: HashMap<String, Arc<dyn Node<S>>>,
    pub(super) first_node_id: String,
    /// Node id -> how the next node is chosen.
    pub(super) next_map: HashMap<String, NextEntry<S>>,
    pub(super) checkpointer: Option<Arc<dyn Checkpointer<S>>>,
    pub(super) middleware: Option<Arc<dyn NodeMiddleware<S>>>,
    pub(super) state_updater: BoxedStateUpdater<S>,
}

impl<S> CompiledStateGraph<S>
where
    S: GraphState,
{
    /// Id of the node the graph starts with.
    pub fn entry(&self) -> &str {
        &self.first_node_id
    }

    /// Runs the graph from the entry node until an edge resolves to `END`.
    ///
    /// With a checkpointer and `config.thread_id`, an input checkpoint is written
    /// first and one more after every node.
    pub async fn invoke(&self, state: S, config: Option<RunnableConfig>) -> Result<S, RunError<S>> {
        self.invoke_with_cancel(state, config, CancellationToken::new())
            .await
    }

    /// `invoke` that stops at the next node boundary once `cancel` fires.
    pub async fn invoke_with_cancel(
        &self,
        state: S,
        config: Option<RunnableConfig>,
        cancel: CancellationToken,
    ) -> Result<S, RunError<S>> {
        let config = config.unwrap_or_default();
        let input = Checkpoint::new(state.clone(), CheckpointSource::Input, 0)
            .with_route(None, Some(self.first_node_id.clone()));
        self.save_checkpoint(&config, &input).await?;
        let cursor = RunCursor {
            state,
            current: self.first_node_id.clone(),
            step: 0,
            last_checkpoint: Some(input),
        };
        self.run_loop(cursor, &config, cancel).await
    }

    /// Continues a run from its latest checkpoint (or `config.checkpoint_id`).
    ///
    /// A checkpoint that already reached `END` returns its state without
    /// running anything.
    pub async fn resume(&self, config: RunnableConfig) -> Result<S, RunError<S>> {
        self.resume_with_cancel(config, CancellationToken::new())
            .await
    }

    pub async fn resume_with_cancel(
        &self,
        config: RunnableConfig,
        cancel: CancellationToken,
    ) -> Result<S, RunError<S>> {
        let thread_id = config
            .thread_id
            .clone()
            .ok_or(CheckpointError::ThreadIdRequired)?;
        let Some(checkpoint) = self.get_state(&config).await? else {
            return Err(RunError::NothingToResume(thread_id));
        };
        let Some(next) = checkpoint.metadata.next_node.clone() else {
            tracing::debug!(run_id = %thread_id, "resume: run already complete");
            return Ok(checkpoint.state);
        };
        if !self.nodes.contains_key(&next) {
            return Err(RunError::UnknownNode(next));
        }
        tracing::info!(
            run_id = %thread_id,
            step = checkpoint.metadata.step,
            next = %next,
            "resuming run"
        );
        let cursor = RunCursor {
            state: checkpoint.state.clone(),
            current: next,
            step: checkpoint.metadata.step,
            last_checkpoint: Some(checkpoint),
        };
        self.run_loop(cursor, &config, cancel).await
    }

    /// Latest stored checkpoint for the run (or `config.checkpoint_id`).
    /// `None` without a checkpointer.
    pub async fn get_state(
        &self,
        config: &RunnableConfig,
    ) -> Result<Option<Checkpoint<S>>, CheckpointError> {
        match &self.checkpointer {
            Some(saver) => saver.get_tuple(config).await,
            None => Ok(None),
        }
    }

    async fn save_checkpoint(
        &self,
        config: &RunnableConfig,
        checkpoint: &Checkpoint<S>,
    ) -> Result<(), CheckpointError> {
        if let (Some(saver), Some(run_id)) = (&self.checkpointer, config.thread_id.as_deref()) {
            let id = saver.put(config, checkpoint).await?;
            log_checkpoint_saved(run_id, &id, checkpoint.metadata.step);
        }
        Ok(())
    }

    async fn execute_node(
        &self,
        node: Arc<dyn Node<S>>,
        node_id: &str,
        state: S,
        ctx: &RunContext,
    ) -> Result<S::Patch, AgentError> {
        match &self.middleware {
            Some(middleware) => {
                let ctx = ctx.clone();
                middleware
                    .around_run(
                        node_id,
                        state,
                        Box::new(move |s| {
                            Box::pin(async move { node.run_with_context(s, &ctx).await })
                        }),
                    )
                    .await
            }
            None => node.run_with_context(state, ctx).await,
        }
    }

    async fn run_loop(
        &self,
        mut cursor: RunCursor<S>,
        config: &RunnableConfig,
        cancel: CancellationToken,
    ) -> Result<S, RunError<S>> {
        let limit = config.effective_recursion_limit();
        let run_id = config.thread_id.as_deref();
        let mut ctx = RunContext::new(config.clone(), cancel.clone());
        let mut executed = 0u64;
        log_graph_start(run_id, &cursor.current);

        loop {
            if cancel.is_cancelled() {
                tracing::warn!(
                    run_id = run_id.unwrap_or("-"),
                    step = cursor.step,
                    next = %cursor.current,
                    "run cancelled at node boundary"
                );
                return Err(RunError::Cancelled {
                    step: cursor.step,
                    last_checkpoint: cursor.last_checkpoint,
                });
            }
            if executed >= limit {
                return Err(RunError::StepLimit {
                    limit,
                    last_checkpoint: cursor.last_checkpoint,
                });
            }

            let node_id = cursor.current.clone();
            let node = self
                .nodes
                .get(&node_id)
                .cloned()
                .ok_or_else(|| RunError::UnknownNode(node_id.clone()))?;
            let step = cursor.step + 1;
            ctx.step = step;
            log_node_start(&node_id, step, &cursor.state);

            let patch = match self
                .execute_node(node, &node_id, cursor.state.clone(), &ctx)
                .await
            {
                Ok(patch) => patch,
                Err(source) => {
                    log_run_error(&node_id, &source);
                    return Err(RunError::Aborted(Box::new(RunAbortedError {
                        node_id,
                        step,
                        source,
                        last_checkpoint: cursor.last_checkpoint,
                    })));
                }
            };
            self.state_updater.apply_update(&mut cursor.state, patch);
            executed += 1;

            let next = match self.next_map.get(&node_id) {
                Some(NextEntry::Unconditional(to)) => to.clone(),
                Some(NextEntry::Conditional(router)) => match router.resolve_next(&cursor.state) {
                    Ok((label, target)) => {
                        tracing::debug!(from = %node_id, label = %label, to = %target, "conditional routing");
                        target
                    }
                    Err(label) => {
                        log_run_error(&node_id, &format!("undeclared route label `{}`", label));
                        return Err(RunError::UnknownRoute {
                            node_id,
                            label,
                            last_checkpoint: cursor.last_checkpoint,
                        });
                    }
                },
                None => END.to_string(),
            };
            log_node_complete(&node_id, step, &next);

            let next_node = (next != END).then_some(next);
            let checkpoint = Checkpoint::new(cursor.state.clone(), CheckpointSource::Loop, step)
                .with_route(Some(node_id), next_node.clone());
            self.save_checkpoint(config, &checkpoint).await?;
            cursor.step = step;
            cursor.last_checkpoint = Some(checkpoint);

            match next_node {
                Some(next) => cursor.current = next,
                None => {
                    log_graph_complete(run_id, executed);
                    return Ok(cursor.state);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::{Append, Overwrite};
    use crate::graph::StateGraph;
    use crate::graph::START;
    use async_trait::async_trait;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Counter {
        value: i32,
        trail: Vec<String>,
    }

    #[derive(Debug, Default)]
    struct CounterPatch {
        value: Overwrite<i32>,
        trail: Append<String>,
    }

    impl GraphState for Counter {
        type Patch = CounterPatch;

        fn merge(&mut self, patch: CounterPatch) {
            patch.value.merge_into(&mut self.value);
            patch.trail.merge_into(&mut self.trail);
        }
    }

    struct AddNode {
        id: &'static str,
        delta: i32,
    }

    #[async_trait]
    impl Node<Counter> for AddNode {
        fn id(&self) -> &str {
            self.id
        }

        async fn run(&self, state: Counter) -> Result<CounterPatch, AgentError> {
            Ok(CounterPatch {
                value: Overwrite::set(state.value + self.delta),
                trail: Append::one(self.id.to_string()),
            })
        }
    }

    fn add(id: &'static str, delta: i32) -> Arc<dyn Node<Counter>> {
        Arc::new(AddNode { id, delta })
    }

    /// **Scenario**: A linear graph runs every node once and accumulates the trail in order.
    #[tokio::test]
    async fn invoke_linear_graph_merges_patches() {
        let mut graph = StateGraph::<Counter>::new();
        graph.add_node("first", add("first", 1));
        graph.add_node("second", add("second", 10));
        graph.add_edge(START, "first");
        graph.add_edge("first", "second");
        graph.add_edge("second", END);
        let compiled = graph.compile().unwrap();

        let out = compiled.invoke(Counter::default(), None).await.unwrap();
        assert_eq!(out.value, 11);
        assert_eq!(out.trail, vec!["first", "second"]);
    }

    /// **Scenario**: The router sees the post-merge state and loops until the threshold.
    #[tokio::test]
    async fn conditional_loop_uses_post_merge_state() {
        let mut graph = StateGraph::<Counter>::new();
        graph.add_node("inc", add("inc", 1));
        graph.add_edge(START, "inc");
        graph.add_conditional_edges(
            "inc",
            ["again", "done"],
            Arc::new(|s: &Counter| {
                if s.value >= 3 {
                    "done".into()
                } else {
                    "again".into()
                }
            }),
            Some(
                [("again".into(), "inc".into()), ("done".into(), END.into())]
                    .into_iter()
                    .collect(),
            ),
        );
        let out = graph
            .compile()
            .unwrap()
            .invoke(Counter::default(), None)
            .await
            .unwrap();
        assert_eq!(out.value, 3);
        assert_eq!(out.trail.len(), 3);
    }

    /// **Scenario**: A node failure aborts the run and carries the checkpoint of the previous node.
    #[tokio::test]
    async fn node_failure_carries_last_checkpoint() {
        struct Boom;

        #[async_trait]
        impl Node<Counter> for Boom {
            fn id(&self) -> &str {
                "boom"
            }

            async fn run(&self, _state: Counter) -> Result<CounterPatch, AgentError> {
                Err(AgentError::ExecutionFailed("boom".into()))
            }
        }

        let mut graph = StateGraph::<Counter>::new();
        graph.add_node("first", add("first", 5));
        graph.add_node("boom", Arc::new(Boom));
        graph.add_edge(START, "first");
        graph.add_edge("first", "boom");
        graph.add_edge("boom", END);

        let err = graph
            .compile()
            .unwrap()
            .invoke(Counter::default(), None)
            .await
            .unwrap_err();
        match err {
            RunError::Aborted(aborted) => {
                assert_eq!(aborted.node_id, "boom");
                assert_eq!(aborted.step, 2);
                let cp = aborted.last_checkpoint.expect("checkpoint of `first`");
                assert_eq!(cp.state.value, 5);
                assert_eq!(cp.metadata.next_node.as_deref(), Some("boom"));
            }
            other => panic!("expected Aborted, got {:?}", other),
        }
    }
}
