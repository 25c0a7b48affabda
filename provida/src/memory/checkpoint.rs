//! Checkpoint and metadata types.

use std::time::SystemTime;

/// Where a checkpoint came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CheckpointSource {
    /// The caller's initial state, written before the first node runs.
    #[default]
    Input,
    /// Written by the run loop after a node completed and its patch was merged.
    Loop,
}

impl CheckpointSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Loop => "loop",
        }
    }

    /// Unknown tags read back from storage are treated as loop checkpoints.
    pub fn parse(s: &str) -> Self {
        match s {
            "input" => Self::Input,
            _ => Self::Loop,
        }
    }
}

/// Step and routing facts recorded with a checkpoint.
///
/// `next_node` is what a resumed run starts with; `None` means the run had
/// already reached END when this checkpoint was written.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckpointMetadata {
    pub source: CheckpointSource,
    /// 0 for the input checkpoint, then 1, 2, … per completed node.
    pub step: u64,
    pub completed_node: Option<String>,
    pub next_node: Option<String>,
    pub created_at: Option<SystemTime>,
}

/// One snapshot of a run.
///
/// **Interaction**: produced by `CompiledStateGraph` after each node; stored by a
/// `Checkpointer`; carried by `RunError` so a failed or cancelled run keeps its
/// progress.
#[derive(Debug, Clone)]
pub struct Checkpoint<S> {
    pub id: String,
    /// RFC 3339 timestamp.
    pub ts: String,
    pub state: S,
    pub metadata: CheckpointMetadata,
}

impl<S> Checkpoint<S> {
    /// Snapshot of `state` with a fresh id and the current time.
    pub fn new(state: S, source: CheckpointSource, step: u64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            ts: chrono::Utc::now().to_rfc3339(),
            state,
            metadata: CheckpointMetadata {
                source,
                step,
                completed_node: None,
                next_node: None,
                created_at: Some(SystemTime::now()),
            },
        }
    }

    /// Records the node that just completed and the node to run next (`None` = END).
    pub fn with_route(mut self, completed: Option<String>, next: Option<String>) -> Self {
        self.metadata.completed_node = completed;
        self.metadata.next_node = next;
        self
    }

    /// True when the run had finished at this checkpoint.
    pub fn is_terminal(&self) -> bool {
        self.metadata.next_node.is_none()
    }
}

/// Entry returned by `Checkpointer::list`.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointListItem {
    pub checkpoint_id: String,
    pub metadata: CheckpointMetadata,
}
