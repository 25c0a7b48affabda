//! Structured tracing events for graph execution.

use std::fmt::Debug;

pub fn log_graph_start(run_id: Option<&str>, entry: &str) {
    tracing::info!(run_id = run_id.unwrap_or("-"), entry, "Starting graph execution");
}

pub fn log_node_start<S: Debug>(node_id: &str, step: u64, state: &S) {
    tracing::debug!(node_id, step, "Starting node execution");
    tracing::trace!(node_id, step, state = ?state, "Node input state");
}

/// `next` is the resolved target (`__end__` for END).
pub fn log_node_complete(node_id: &str, step: u64, next: &str) {
    tracing::debug!(node_id, step, next, "Node execution complete");
}

pub fn log_checkpoint_saved(run_id: &str, checkpoint_id: &str, step: u64) {
    tracing::debug!(run_id, checkpoint_id, step, "Checkpoint saved");
}

pub fn log_graph_complete(run_id: Option<&str>, steps: u64) {
    tracing::info!(run_id = run_id.unwrap_or("-"), steps, "Graph execution complete");
}

pub fn log_run_error(node_id: &str, error: &dyn std::fmt::Display) {
    tracing::error!(node_id, error = %error, "Graph execution error");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logging_functions_do_not_panic() {
        log_graph_start(Some("run"), "first");
        log_node_start("first", 1, &42);
        log_node_complete("first", 1, "__end__");
        log_checkpoint_saved("run", "cp", 1);
        log_graph_complete(None, 1);
        log_run_error("first", &"boom");
    }
}
