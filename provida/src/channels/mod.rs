//! State merge semantics: per-field policies and the graph-level updater.
//!
//! A workflow state is a plain struct implementing [`GraphState`]. Nodes do not
//! return a whole new state; they return the state's associated `Patch`, whose
//! field *types* declare how each field merges:
//!
//! - [`Overwrite<T>`]: last writer wins; an untouched field is left as is.
//! - [`Append<T>`]: accumulating list; `merge(old, new) = old ++ new`.
//!
//! The compiled graph applies each patch through a [`StateUpdater`]; the default
//! [`MergeUpdater`] delegates to [`GraphState::merge`].
//!
//! ```rust,ignore
//! #[derive(Debug, Default)]
//! struct LoopPatch {
//!     plan: Overwrite<Option<String>>,
//!     notes: Append<String>,
//! }
//!
//! impl GraphState for LoopState {
//!     type Patch = LoopPatch;
//!     fn merge(&mut self, patch: LoopPatch) {
//!         patch.plan.merge_into(&mut self.plan);
//!         patch.notes.merge_into(&mut self.notes);
//!     }
//! }
//! ```

mod field;
mod updater;

use std::fmt::Debug;

pub use field::{Append, Overwrite};
pub use updater::{BoxedStateUpdater, FieldBasedUpdater, MergeUpdater, StateUpdater};

/// State shared by all nodes of one graph run.
///
/// `Patch` is what a node returns; `Patch::default()` means "no change", which is
/// what side-effect-only nodes return.
pub trait GraphState: Clone + Send + Sync + Debug + 'static {
    /// Partial update produced by one node.
    type Patch: Send + Debug + Default + 'static;

    /// Merges one node's patch into the running state, field by field.
    fn merge(&mut self, patch: Self::Patch);
}
