//! Middleware that records node enter/exit with timing as tracing events.

use std::marker::PhantomData;
use std::time::Instant;

use async_trait::async_trait;

use crate::channels::GraphState;
use crate::error::AgentError;

use super::node_middleware::{NodeFuture, NodeMiddleware};

/// Logs enter/exit of every node at `info`, with elapsed milliseconds.
pub struct LoggingNodeMiddleware<S> {
    _phantom: PhantomData<fn(S)>,
}

impl<S> Default for LoggingNodeMiddleware<S> {
    fn default() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

#[async_trait]
impl<S> NodeMiddleware<S> for LoggingNodeMiddleware<S>
where
    S: GraphState,
{
    async fn around_run(
        &self,
        node_id: &str,
        state: S,
        inner: Box<dyn FnOnce(S) -> NodeFuture<S> + Send>,
    ) -> Result<S::Patch, AgentError> {
        tracing::info!(node_id, "node enter");
        let started = Instant::now();
        let result = inner(state).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => tracing::info!(node_id, elapsed_ms, "node exit"),
            Err(e) => tracing::warn!(node_id, elapsed_ms, error = %e, "node exit with error"),
        }
        result
    }
}
