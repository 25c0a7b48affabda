//! StateGraph compile: wiring mistakes are rejected before anything runs.

use std::sync::Arc;

use provida::{GraphDefinitionError, StateGraph, END, START};

use crate::common::{add, path_map, Tally};

fn compile_err(graph: StateGraph<Tally>) -> GraphDefinitionError {
    match graph.compile() {
        Ok(_) => panic!("expected a definition error"),
        Err(e) => e,
    }
}

/// **Scenario**: An edge to an unregistered node fails with NodeNotFound.
#[test]
fn edge_to_unknown_node() {
    let mut graph = StateGraph::<Tally>::new();
    graph
        .add_node("a", add("a", 1))
        .add_edge(START, "a")
        .add_edge("a", "ghost");
    assert_eq!(
        compile_err(graph),
        GraphDefinitionError::NodeNotFound("ghost".into())
    );
}

/// **Scenario**: A graph without an edge from START fails with MissingStart.
#[test]
fn missing_start() {
    let mut graph = StateGraph::<Tally>::new();
    graph.add_node("a", add("a", 1)).add_edge("a", END);
    assert_eq!(compile_err(graph), GraphDefinitionError::MissingStart);
}

/// **Scenario**: START wired straight to END is rejected instead of failing on the first run.
#[test]
fn start_straight_to_end() {
    let mut graph = StateGraph::<Tally>::new();
    graph.add_edge(START, END);
    assert_eq!(compile_err(graph), GraphDefinitionError::StartToEnd);

    let mut graph = StateGraph::<Tally>::new();
    graph.add_node("a", add("a", 1)).add_edge(START, END).add_edge("a", END);
    assert_eq!(compile_err(graph), GraphDefinitionError::StartToEnd);
}

/// **Scenario**: Two entry edges fail with MultipleStart.
#[test]
fn multiple_start() {
    let mut graph = StateGraph::<Tally>::new();
    graph
        .add_node("a", add("a", 1))
        .add_node("b", add("b", 1))
        .add_edge(START, "a")
        .add_edge(START, "b")
        .add_edge("a", END)
        .add_edge("b", END);
    assert_eq!(compile_err(graph), GraphDefinitionError::MultipleStart(2));
}

/// **Scenario**: A node with no way out fails with MissingOutgoingEdge.
#[test]
fn dead_end_node() {
    let mut graph = StateGraph::<Tally>::new();
    graph
        .add_node("a", add("a", 1))
        .add_node("b", add("b", 1))
        .add_edge(START, "a")
        .add_edge("a", "b");
    assert_eq!(
        compile_err(graph),
        GraphDefinitionError::MissingOutgoingEdge("b".into())
    );
}

/// **Scenario**: A registered node nothing leads to fails with Unreachable.
#[test]
fn unreachable_node() {
    let mut graph = StateGraph::<Tally>::new();
    graph
        .add_node("a", add("a", 1))
        .add_node("orphan", add("orphan", 1))
        .add_edge(START, "a")
        .add_edge("a", END)
        .add_edge("orphan", END);
    assert_eq!(
        compile_err(graph),
        GraphDefinitionError::Unreachable("orphan".into())
    );
}

/// **Scenario**: A node with both an edge and a router is rejected.
#[test]
fn edge_and_router_on_same_node() {
    let mut graph = StateGraph::<Tally>::new();
    graph
        .add_node("a", add("a", 1))
        .add_edge(START, "a")
        .add_edge("a", END)
        .add_conditional_edges(
            "a",
            ["done"],
            Arc::new(|_: &Tally| "done".to_string()),
            path_map(&[("done", END)]),
        );
    assert_eq!(
        compile_err(graph),
        GraphDefinitionError::NodeHasBothEdgeAndConditional("a".into())
    );
}

/// **Scenario**: A declared label missing from the path map fails with UnmappedLabel.
#[test]
fn declared_label_without_target() {
    let mut graph = StateGraph::<Tally>::new();
    graph
        .add_node("review", add("review", 1))
        .add_edge(START, "review")
        .add_conditional_edges(
            "review",
            ["done", "escalate"],
            Arc::new(|_: &Tally| "done".to_string()),
            path_map(&[("done", END)]),
        );
    assert_eq!(
        compile_err(graph),
        GraphDefinitionError::UnmappedLabel {
            node: "review".into(),
            label: "escalate".into()
        }
    );
}

/// **Scenario**: A path-map target that is not a node fails with InvalidConditionalTarget.
#[test]
fn router_target_not_registered() {
    let mut graph = StateGraph::<Tally>::new();
    graph
        .add_node("review", add("review", 1))
        .add_edge(START, "review")
        .add_conditional_edges(
            "review",
            ["done", "retry"],
            Arc::new(|_: &Tally| "done".to_string()),
            path_map(&[("done", END), ("retry", "planning")]),
        );
    assert_eq!(
        compile_err(graph),
        GraphDefinitionError::InvalidConditionalTarget {
            node: "review".into(),
            target: "planning".into()
        }
    );
}

/// **Scenario**: A router with no labels fails with EmptyRouter.
#[test]
fn router_without_labels() {
    let mut graph = StateGraph::<Tally>::new();
    graph
        .add_node("review", add("review", 1))
        .add_edge(START, "review")
        .add_conditional_edges(
            "review",
            Vec::<String>::new(),
            Arc::new(|_: &Tally| "done".to_string()),
            None,
        );
    assert_eq!(
        compile_err(graph),
        GraphDefinitionError::EmptyRouter {
            node: "review".into()
        }
    );
}
