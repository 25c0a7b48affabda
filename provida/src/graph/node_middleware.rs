//! Node middleware: wrap each node run with external async logic (around pattern).
//!
//! Set via `StateGraph::with_middleware`.

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;

use crate::channels::GraphState;
use crate::error::AgentError;

/// Boxed node execution handed to middleware.
pub type NodeFuture<S> =
    Pin<Box<dyn Future<Output = Result<<S as GraphState>::Patch, AgentError>> + Send>>;

/// Async middleware around `Node::run_with_context`.
///
/// Implementations decide when to call `inner` and may inspect or replace its
/// result. `inner` must be called at most once.
#[async_trait]
pub trait NodeMiddleware<S>: Send + Sync
where
    S: GraphState,
{
    /// - `node_id`: node about to run
    /// - `state`: state passed to the node
    /// - `inner`: the node execution
    async fn around_run(
        &self,
        node_id: &str,
        state: S,
        inner: Box<dyn FnOnce(S) -> NodeFuture<S> + Send>,
    ) -> Result<S::Patch, AgentError>;
}
