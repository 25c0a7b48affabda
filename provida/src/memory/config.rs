//! Per-run config: run (thread) id, checkpoint selection and the step limit.

/// Step limit applied when `RunnableConfig::recursion_limit` is unset.
pub const DEFAULT_RECURSION_LIMIT: u64 = 64;

/// Config for one `invoke` / `resume`.
///
/// **Interaction**: passed to `CompiledStateGraph::invoke` and to every
/// `Checkpointer` method. Checkpoints are only written when `thread_id` is set.
#[derive(Debug, Clone, Default)]
pub struct RunnableConfig {
    /// Opaque run id; checkpoints are keyed by it.
    pub thread_id: Option<String>,
    /// Load this checkpoint instead of the latest (resume / inspection).
    pub checkpoint_id: Option<String>,
    /// Namespace inside a thread. Empty by default.
    pub checkpoint_ns: String,
    /// Maximum number of node executions in one invoke; [`DEFAULT_RECURSION_LIMIT`] when `None`.
    pub recursion_limit: Option<u64>,
}

impl RunnableConfig {
    /// Config for the given run id, everything else default.
    pub fn for_thread(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: Some(thread_id.into()),
            ..Self::default()
        }
    }

    pub fn with_recursion_limit(mut self, limit: u64) -> Self {
        self.recursion_limit = Some(limit);
        self
    }

    pub fn effective_recursion_limit(&self) -> u64 {
        self.recursion_limit.unwrap_or(DEFAULT_RECURSION_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: for_thread sets only the thread id; the step limit falls back to the default.
    #[test]
    fn for_thread_defaults() {
        let c = RunnableConfig::for_thread("patient-1");
        assert_eq!(c.thread_id.as_deref(), Some("patient-1"));
        assert!(c.checkpoint_id.is_none());
        assert!(c.checkpoint_ns.is_empty());
        assert_eq!(c.effective_recursion_limit(), DEFAULT_RECURSION_LIMIT);
        assert_eq!(c.with_recursion_limit(3).effective_recursion_limit(), 3);
    }
}
