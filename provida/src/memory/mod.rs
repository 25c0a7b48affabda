//! Run persistence: checkpoints keyed by run (thread) id, and the savers that store them.
//!
//! - [`Checkpoint`]: state snapshot plus step/node metadata, written after every node.
//! - [`Checkpointer`]: `put` / `get_tuple` / `list` by [`RunnableConfig`].
//! - [`MemorySaver`]: in-process; [`SqliteSaver`]: on disk via rusqlite, state encoded by a [`Serializer`].

mod checkpoint;
mod checkpointer;
mod config;
mod memory_saver;
mod serializer;
mod sqlite_saver;

pub use checkpoint::{Checkpoint, CheckpointListItem, CheckpointMetadata, CheckpointSource};
pub use checkpointer::{CheckpointError, Checkpointer};
pub use config::{RunnableConfig, DEFAULT_RECURSION_LIMIT};
pub use memory_saver::MemorySaver;
pub use serializer::{JsonSerializer, Serializer};
pub use sqlite_saver::SqliteSaver;
