//! Workflow graph engine: nodes, edges, conditional routing, patch merge, checkpoints.
//!
//! Build a [`StateGraph`] with `add_node` / `add_edge` / `add_conditional_edges`
//! (using [`START`] and [`END`]), `compile` it into a [`CompiledStateGraph`], then
//! `invoke` it with an initial state. A failed, cancelled or crashed run keeps its
//! last checkpoint and can be picked up again with `resume`.

mod compiled;
mod conditional;
mod definition_error;
mod fan_out;
mod logging;
mod logging_middleware;
mod node;
mod node_middleware;
mod run_context;
mod run_error;
mod state_graph;

pub use compiled::CompiledStateGraph;
pub use conditional::{ConditionalRouter, NextEntry, RouterFn};
pub use definition_error::GraphDefinitionError;
pub use fan_out::fan_out;
pub use logging::{
    log_checkpoint_saved, log_graph_complete, log_graph_start, log_node_complete,
    log_node_start, log_run_error,
};
pub use logging_middleware::LoggingNodeMiddleware;
pub use node::Node;
pub use node_middleware::{NodeFuture, NodeMiddleware};
pub use run_context::RunContext;
pub use run_error::{RunAbortedError, RunError};
pub use state_graph::{StateGraph, END, START};
pub use tokio_util::sync::CancellationToken;
