//! Graph-level state updater: how a node's patch reaches the running state.

use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;

use super::GraphState;

/// Applies a node's patch to the running state. Fixed when the graph is compiled.
pub trait StateUpdater<S>: Send + Sync + Debug
where
    S: GraphState,
{
    fn apply_update(&self, current: &mut S, patch: S::Patch);
}

/// Shared updater handle stored in the graph.
pub type BoxedStateUpdater<S> = Arc<dyn StateUpdater<S>>;

/// Default updater: the state's own per-field [`GraphState::merge`].
#[derive(Debug, Clone, Default)]
pub struct MergeUpdater;

impl<S> StateUpdater<S> for MergeUpdater
where
    S: GraphState,
{
    fn apply_update(&self, current: &mut S, patch: S::Patch) {
        current.merge(patch);
    }
}

/// Updater backed by a closure, for graphs that need merge logic other than the
/// state's default (e.g. counting writes, or tests).
pub struct FieldBasedUpdater<S, F>
where
    S: GraphState,
    F: Fn(&mut S, S::Patch) + Send + Sync,
{
    update_fn: F,
    _phantom: PhantomData<fn(S)>,
}

impl<S, F> FieldBasedUpdater<S, F>
where
    S: GraphState,
    F: Fn(&mut S, S::Patch) + Send + Sync,
{
    pub fn new(update_fn: F) -> Self {
        Self {
            update_fn,
            _phantom: PhantomData,
        }
    }
}

impl<S, F> Debug for FieldBasedUpdater<S, F>
where
    S: GraphState,
    F: Fn(&mut S, S::Patch) + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldBasedUpdater").finish_non_exhaustive()
    }
}

impl<S, F> StateUpdater<S> for FieldBasedUpdater<S, F>
where
    S: GraphState,
    F: Fn(&mut S, S::Patch) + Send + Sync,
{
    fn apply_update(&self, current: &mut S, patch: S::Patch) {
        (self.update_fn)(current, patch);
    }
}
