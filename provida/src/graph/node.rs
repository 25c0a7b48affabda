//! Graph node trait: one named step of a workflow.

use async_trait::async_trait;

use crate::channels::GraphState;
use crate::error::AgentError;

use super::RunContext;

/// One step in a graph: state in, patch out.
///
/// The node receives a clone of the running state and returns the state's
/// `Patch`; the engine merges it with the graph's updater. Routing is decided
/// by edges, never by the node. Side-effect-only nodes return
/// `S::Patch::default()`.
///
/// Returning `Err` aborts the run. Nodes that call collaborators should turn
/// recoverable failures into sentinel values instead.
///
/// **Interaction**: registered with `StateGraph::add_node`; called by the
/// `CompiledStateGraph` run loop, optionally through a `NodeMiddleware`.
#[async_trait]
pub trait Node<S>: Send + Sync
where
    S: GraphState,
{
    /// Node id (e.g. `"planning"`). Unique within a graph.
    fn id(&self) -> &str;

    async fn run(&self, state: S) -> Result<S::Patch, AgentError>;

    /// Variant with the run context (run id, step, cancellation).
    ///
    /// Default implementation calls `run` and ignores the context.
    async fn run_with_context(&self, state: S, _ctx: &RunContext) -> Result<S::Patch, AgentError> {
        self.run(state).await
    }
}
