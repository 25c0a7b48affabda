//! In-memory checkpointer (MemorySaver). Not persistent; for tests and single-process runs.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::memory::checkpoint::{Checkpoint, CheckpointListItem};
use crate::memory::checkpointer::{keep_newest, CheckpointError, Checkpointer};
use crate::memory::config::RunnableConfig;

/// In-memory checkpointer. Key: `"{thread_id}:{checkpoint_ns}"`; each key holds its
/// checkpoints oldest first.
///
/// Threads are kept until removed: memory grows with every new thread id.
/// Long-lived owners call `prune_finished` or `remove_thread`.
///
/// **Interaction**: used as `Arc<dyn Checkpointer<S>>` in `StateGraph::compile_with_checkpointer`.
pub struct MemorySaver<S> {
    by_thread: Arc<RwLock<HashMap<String, Vec<Checkpoint<S>>>>>,
}

impl<S> MemorySaver<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            by_thread: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of stored `thread_id:checkpoint_ns` keys.
    pub async fn thread_count(&self) -> usize {
        self.by_thread.read().await.len()
    }

    /// Drops every checkpoint of `config`'s thread and namespace; true if any existed.
    pub async fn remove_thread(&self, config: &RunnableConfig) -> Result<bool, CheckpointError> {
        let key = Self::thread_key(config)?;
        Ok(self.by_thread.write().await.remove(&key).is_some())
    }

    /// Drops threads whose latest checkpoint is terminal; they have nothing
    /// left to resume. Returns how many were dropped.
    pub async fn prune_finished(&self) -> usize {
        let mut guard = self.by_thread.write().await;
        let before = guard.len();
        guard.retain(|_, list| !list.last().is_some_and(|cp| cp.is_terminal()));
        let pruned = before - guard.len();
        if pruned > 0 {
            tracing::debug!(pruned, remaining = guard.len(), "finished threads pruned");
        }
        pruned
    }

    fn thread_key(config: &RunnableConfig) -> Result<String, CheckpointError> {
        let thread_id = config
            .thread_id
            .as_deref()
            .ok_or(CheckpointError::ThreadIdRequired)?;
        Ok(format!("{}:{}", thread_id, config.checkpoint_ns))
    }
}

impl<S> Default for MemorySaver<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<S> Checkpointer<S> for MemorySaver<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn put(
        &self,
        config: &RunnableConfig,
        checkpoint: &Checkpoint<S>,
    ) -> Result<String, CheckpointError> {
        let key = Self::thread_key(config)?;
        let mut guard = self.by_thread.write().await;
        let list = guard.entry(key).or_default();
        list.retain(|cp| cp.id != checkpoint.id);
        list.push(checkpoint.clone());
        Ok(checkpoint.id.clone())
    }

    async fn get_tuple(
        &self,
        config: &RunnableConfig,
    ) -> Result<Option<Checkpoint<S>>, CheckpointError> {
        let key = Self::thread_key(config)?;
        let guard = self.by_thread.read().await;
        let Some(list) = guard.get(&key) else {
            return Ok(None);
        };
        let found = match &config.checkpoint_id {
            Some(cid) => list.iter().find(|cp| &cp.id == cid),
            None => list.last(),
        };
        Ok(found.cloned())
    }

    async fn list(
        &self,
        config: &RunnableConfig,
        limit: Option<usize>,
    ) -> Result<Vec<CheckpointListItem>, CheckpointError> {
        let key = Self::thread_key(config)?;
        let guard = self.by_thread.read().await;
        let items = guard
            .get(&key)
            .map(|list| {
                list.iter()
                    .map(|cp| CheckpointListItem {
                        checkpoint_id: cp.id.clone(),
                        metadata: cp.metadata.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(keep_newest(items, limit))
    }
}
