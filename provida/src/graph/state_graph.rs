//! State graph builder: nodes, explicit edges, conditional edges.
//!
//! Add nodes with `add_node`, wire them with `add_edge(from, to)` using `START`
//! and `END`, and branch with `add_conditional_edges`. Then `compile` or
//! `compile_with_checkpointer` to get a `CompiledStateGraph`.
//!
//! # Validation
//!
//! `compile` rejects, with `GraphDefinitionError`:
//! - edges or path maps naming unregistered nodes;
//! - zero or several edges from `START`, or one that goes straight to `END`;
//! - a node with two outgoing edges, or with both an edge and a router;
//! - a node with no outgoing edge;
//! - a router declaring no labels, or a declared label without a target;
//! - nodes unreachable from `START`.
//!
//! # State updates
//!
//! Node patches are merged with the state's own `GraphState::merge` unless a
//! different updater is set with `with_state_updater`.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use crate::channels::{BoxedStateUpdater, GraphState, MergeUpdater};
use crate::memory::Checkpointer;

use super::compiled::CompiledStateGraph;
use super::conditional::{ConditionalRouter, NextEntry, RouterFn};
use super::definition_error::GraphDefinitionError;
use super::node::Node;
use super::node_middleware::NodeMiddleware;

/// Sentinel for graph entry: use as `from_id` in `add_edge(START, first_node_id)`.
pub const START: &str = "__start__";

/// Sentinel for graph exit: use as a target in `add_edge` or a path map.
pub const END: &str = "__end__";

/// Mutable graph definition. Generic over the workflow state `S`.
///
/// **Interaction**: accepts `Arc<dyn Node<S>>`; produces `CompiledStateGraph<S>`.
pub struct StateGraph<S>
where
    S: GraphState,
{
    nodes: HashMap<String, Arc<dyn Node<S>>>,
    /// Edges (from_id, to_id), in insertion order.
    edges: Vec<(String, String)>,
    conditional_edges: HashMap<String, ConditionalRouter<S>>,
    middleware: Option<Arc<dyn NodeMiddleware<S>>>,
    state_updater: Option<BoxedStateUpdater<S>>,
}

impl<S> Default for StateGraph<S>
where
    S: GraphState,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> StateGraph<S>
where
    S: GraphState,
{
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            edges: Vec::new(),
            conditional_edges: HashMap::new(),
            middleware: None,
            state_updater: None,
        }
    }

    /// Wraps every node run with `middleware`.
    pub fn with_middleware(self, middleware: Arc<dyn NodeMiddleware<S>>) -> Self {
        Self {
            middleware: Some(middleware),
            ..self
        }
    }

    /// Replaces the default `MergeUpdater`.
    pub fn with_state_updater(self, updater: BoxedStateUpdater<S>) -> Self {
        Self {
            state_updater: Some(updater),
            ..self
        }
    }

    /// Adds a node; replaces any node registered under the same id.
    pub fn add_node(&mut self, id: impl Into<String>, node: Arc<dyn Node<S>>) -> &mut Self {
        self.nodes.insert(id.into(), node);
        self
    }

    /// Adds an unconditional edge. Use `START` / `END` for entry and exit.
    pub fn add_edge(&mut self, from_id: impl Into<String>, to_id: impl Into<String>) -> &mut Self {
        self.edges.push((from_id.into(), to_id.into()));
        self
    }

    /// Adds conditional edges from `source`.
    ///
    /// After `source` runs and its patch is merged, `path(state)` returns a
    /// label from `labels`. The next node is `path_map[label]`, or the label
    /// itself when `path_map` is `None`.
    ///
    /// ```rust,ignore
    /// graph.add_conditional_edges(
    ///     "verification",
    ///     ["replan", "end"],
    ///     Arc::new(|s: &PlanState| if s.approved { "end".into() } else { "replan".into() }),
    ///     Some([("replan".into(), "planning".into()), ("end".into(), END.into())].into_iter().collect()),
    /// );
    /// ```
    pub fn add_conditional_edges<L>(
        &mut self,
        source: impl Into<String>,
        labels: L,
        path: RouterFn<S>,
        path_map: Option<HashMap<String, String>>,
    ) -> &mut Self
    where
        L: IntoIterator,
        L::Item: Into<String>,
    {
        let labels = labels.into_iter().map(Into::into).collect();
        self.conditional_edges
            .insert(source.into(), ConditionalRouter::new(path, labels, path_map));
        self
    }

    /// Validates the definition and builds the executable graph.
    pub fn compile(self) -> Result<CompiledStateGraph<S>, GraphDefinitionError> {
        self.compile_internal(None)
    }

    /// Like `compile`; the graph writes a checkpoint after every node when the
    /// run config carries a `thread_id`.
    pub fn compile_with_checkpointer(
        self,
        checkpointer: Arc<dyn Checkpointer<S>>,
    ) -> Result<CompiledStateGraph<S>, GraphDefinitionError> {
        self.compile_internal(Some(checkpointer))
    }

    fn is_target(&self, id: &str) -> bool {
        id == END || self.nodes.contains_key(id)
    }

    fn validate_edges(&self) -> Result<String, GraphDefinitionError> {
        for (from, to) in &self.edges {
            if from != START && !self.nodes.contains_key(from) {
                return Err(GraphDefinitionError::NodeNotFound(from.clone()));
            }
            if !self.is_target(to) {
                return Err(GraphDefinitionError::NodeNotFound(to.clone()));
            }
        }

        let mut sources = self.conditional_edges.keys().collect::<Vec<_>>();
        sources.sort();
        for source in sources {
            let router = &self.conditional_edges[source];
            if !self.nodes.contains_key(source) {
                return Err(GraphDefinitionError::NodeNotFound(source.clone()));
            }
            if router.labels().is_empty() {
                return Err(GraphDefinitionError::EmptyRouter {
                    node: source.clone(),
                });
            }
            for label in router.labels() {
                let Some(target) = router.target_for(label) else {
                    return Err(GraphDefinitionError::UnmappedLabel {
                        node: source.clone(),
                        label: label.clone(),
                    });
                };
                if !self.is_target(target) {
                    return Err(GraphDefinitionError::InvalidConditionalTarget {
                        node: source.clone(),
                        target: target.to_string(),
                    });
                }
            }
        }

        let starts: Vec<&String> = self
            .edges
            .iter()
            .filter(|(f, _)| f == START)
            .map(|(_, t)| t)
            .collect();
        match starts.as_slice() {
            [] => Err(GraphDefinitionError::MissingStart),
            [first] if first.as_str() == END => Err(GraphDefinitionError::StartToEnd),
            [first] => Ok((*first).clone()),
            many => Err(GraphDefinitionError::MultipleStart(many.len())),
        }
    }

    fn build_next_map(&self) -> Result<HashMap<String, NextEntry<S>>, GraphDefinitionError> {
        let mut next_map: HashMap<String, NextEntry<S>> = HashMap::new();
        for (from, to) in self.edges.iter().filter(|(f, _)| f != START) {
            if next_map.contains_key(from) {
                return Err(GraphDefinitionError::DuplicateEdge(from.clone()));
            }
            if self.conditional_edges.contains_key(from) {
                return Err(GraphDefinitionError::NodeHasBothEdgeAndConditional(
                    from.clone(),
                ));
            }
            next_map.insert(from.clone(), NextEntry::Unconditional(to.clone()));
        }
        for (source, router) in &self.conditional_edges {
            next_map.insert(source.clone(), NextEntry::Conditional(router.clone()));
        }

        let mut ids: Vec<&String> = self.nodes.keys().collect();
        ids.sort();
        if let Some(missing) = ids.into_iter().find(|id| !next_map.contains_key(*id)) {
            return Err(GraphDefinitionError::MissingOutgoingEdge(missing.clone()));
        }
        Ok(next_map)
    }

    fn check_reachable(
        &self,
        first: &str,
        next_map: &HashMap<String, NextEntry<S>>,
    ) -> Result<(), GraphDefinitionError> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::from([first]);
        while let Some(id) = queue.pop_front() {
            if id == END || !seen.insert(id) {
                continue;
            }
            match next_map.get(id) {
                Some(NextEntry::Unconditional(to)) => queue.push_back(to),
                Some(NextEntry::Conditional(router)) => queue.extend(router.targets()),
                None => {}
            }
        }
        let mut unreachable: Vec<&String> = self
            .nodes
            .keys()
            .filter(|id| !seen.contains(id.as_str()))
            .collect();
        unreachable.sort();
        match unreachable.first() {
            Some(id) => Err(GraphDefinitionError::Unreachable((*id).clone())),
            None => Ok(()),
        }
    }

    fn compile_internal(
        self,
        checkpointer: Option<Arc<dyn Checkpointer<S>>>,
    ) -> Result<CompiledStateGraph<S>, GraphDefinitionError> {
        let first = self.validate_edges()?;
        let next_map = self.build_next_map()?;
        self.check_reachable(&first, &next_map)?;

        Ok(CompiledStateGraph {
            nodes: self.nodes,
            first_node_id: first,
            next_map,
            checkpointer,
            middleware: self.middleware,
            state_updater: self
                .state_updater
                .unwrap_or_else(|| Arc::new(MergeUpdater)),
        })
    }
}
