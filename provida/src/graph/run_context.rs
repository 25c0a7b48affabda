//! Run-scoped context handed to nodes.

use tokio_util::sync::CancellationToken;

use crate::memory::RunnableConfig;

/// What a node may know about the run it executes in.
///
/// Long-running nodes may watch `cancel` to stop early; the engine itself only
/// checks it between nodes.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub config: RunnableConfig,
    /// 1-based index of the node execution within this run.
    pub step: u64,
    pub cancel: CancellationToken,
}

impl RunContext {
    pub fn new(config: RunnableConfig, cancel: CancellationToken) -> Self {
        Self {
            config,
            step: 0,
            cancel,
        }
    }

    pub fn run_id(&self) -> Option<&str> {
        self.config.thread_id.as_deref()
    }
}
