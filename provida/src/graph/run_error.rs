//! Errors that end a graph run. Every variant that stops mid-run carries the
//! last checkpoint so progress is never silently dropped.

use thiserror::Error;

use crate::channels::GraphState;
use crate::error::AgentError;
use crate::memory::{Checkpoint, CheckpointError};

/// A node returned an error; the run stops at that node.
#[derive(Debug, Error)]
#[error("node `{node_id}` failed at step {step}: {source}")]
pub struct RunAbortedError<S>
where
    S: GraphState,
{
    pub node_id: String,
    pub step: u64,
    #[source]
    pub source: AgentError,
    /// Last successful snapshot; `None` only when nothing ran before the failure
    /// and no input checkpoint was taken.
    pub last_checkpoint: Option<Checkpoint<S>>,
}

/// Why `invoke` / `resume` did not return a final state.
#[derive(Debug, Error)]
pub enum RunError<S>
where
    S: GraphState,
{
    #[error(transparent)]
    Aborted(Box<RunAbortedError<S>>),

    /// Cancellation was observed between two nodes.
    #[error("run cancelled after step {step}")]
    Cancelled {
        step: u64,
        last_checkpoint: Option<Checkpoint<S>>,
    },

    #[error("step limit of {limit} node executions exceeded")]
    StepLimit {
        limit: u64,
        last_checkpoint: Option<Checkpoint<S>>,
    },

    /// A router returned a label it never declared.
    #[error("router on `{node_id}` returned undeclared label `{label}`")]
    UnknownRoute {
        node_id: String,
        label: String,
        last_checkpoint: Option<Checkpoint<S>>,
    },

    #[error("checkpoint: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("no checkpoint to resume for thread `{0}`")]
    NothingToResume(String),

    /// A stored checkpoint names a node this graph does not have.
    #[error("checkpoint refers to unknown node `{0}`")]
    UnknownNode(String),
}

impl<S> RunError<S>
where
    S: GraphState,
{
    /// Last successful checkpoint carried by this error, if any.
    pub fn last_checkpoint(&self) -> Option<&Checkpoint<S>> {
        match self {
            Self::Aborted(e) => e.last_checkpoint.as_ref(),
            Self::Cancelled {
                last_checkpoint, ..
            }
            | Self::StepLimit {
                last_checkpoint, ..
            }
            | Self::UnknownRoute {
                last_checkpoint, ..
            } => last_checkpoint.as_ref(),
            Self::Checkpoint(_) | Self::NothingToResume(_) | Self::UnknownNode(_) => None,
        }
    }
}
