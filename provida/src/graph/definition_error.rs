//! Graph definition (compile-time wiring) errors.

use thiserror::Error;

/// Error when compiling a state graph.
///
/// Always a programming error in workflow wiring; never retried.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphDefinitionError {
    /// An edge names a node that was not registered (and is not START/END).
    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("graph must have exactly one edge from START, found none")]
    MissingStart,

    #[error("graph must have exactly one edge from START, found {0}")]
    MultipleStart(usize),

    /// The START edge goes straight to END, so the graph would run no node.
    #[error("edge from START leads directly to END")]
    StartToEnd,

    /// A node has two unconditional outgoing edges.
    #[error("node has more than one outgoing edge: {0}")]
    DuplicateEdge(String),

    #[error("node has both edge and conditional edges: {0}")]
    NodeHasBothEdgeAndConditional(String),

    /// A node with no way out; every node must reach another node or END.
    #[error("node has no outgoing edge: {0}")]
    MissingOutgoingEdge(String),

    #[error("node is not reachable from START: {0}")]
    Unreachable(String),

    #[error("conditional edge on `{node}` declares no labels")]
    EmptyRouter { node: String },

    /// A declared router label has no target.
    #[error("conditional edge on `{node}`: label `{label}` is not mapped")]
    UnmappedLabel { node: String, label: String },

    /// A path-map target is neither a registered node nor END.
    #[error("conditional edge on `{node}`: invalid target `{target}`")]
    InvalidConditionalTarget { node: String, target: String },
}
