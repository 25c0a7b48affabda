//! StateGraph invoke: merging, conditional loops, run limits, cancellation
//! and middleware.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use provida::graph::NodeFuture;
use provida::{
    AgentError, CancellationToken, GraphState, NodeMiddleware, RunError, RunnableConfig,
    StateGraph, END, START,
};

use crate::common::{add, loop_map, CancellingNode, Tally};

fn counting_loop(until: i64) -> StateGraph<Tally> {
    let mut graph = StateGraph::<Tally>::new();
    graph
        .add_node("inc", add("inc", 1))
        .add_edge(START, "inc")
        .add_conditional_edges(
            "inc",
            ["again", "done"],
            Arc::new(move |s: &Tally| {
                if s.total >= until {
                    "done".to_string()
                } else {
                    "again".to_string()
                }
            }),
            loop_map("inc"),
        );
    graph
}

/// **Scenario**: Overwrite fields take the last value and Append fields accumulate in order.
#[tokio::test]
async fn linear_chain_merges_patches() {
    let mut graph = StateGraph::<Tally>::new();
    graph
        .add_node("anamnesis", add("anamnesis", 2))
        .add_node("diagnosis", add("diagnosis", 3))
        .add_edge(START, "anamnesis")
        .add_edge("anamnesis", "diagnosis")
        .add_edge("diagnosis", END);

    let out = graph
        .compile()
        .unwrap()
        .invoke(Tally::default(), None)
        .await
        .unwrap();
    assert_eq!(out.total, 5);
    assert_eq!(out.visited, vec!["anamnesis", "diagnosis"]);
}

/// **Scenario**: A conditional loop runs until the router sends it to END.
#[tokio::test]
async fn conditional_loop_terminates() {
    let out = counting_loop(4)
        .compile()
        .unwrap()
        .invoke(Tally::default(), None)
        .await
        .unwrap();
    assert_eq!(out.total, 4);
    assert_eq!(out.visited.len(), 4);
}

/// **Scenario**: A loop that never ends stops at the recursion limit with its progress.
#[tokio::test]
async fn step_limit_stops_runaway_loop() {
    let err = counting_loop(i64::MAX)
        .compile()
        .unwrap()
        .invoke(
            Tally::default(),
            Some(RunnableConfig::default().with_recursion_limit(3)),
        )
        .await
        .unwrap_err();
    match err {
        RunError::StepLimit {
            limit,
            last_checkpoint,
        } => {
            assert_eq!(limit, 3);
            let cp = last_checkpoint.unwrap();
            assert_eq!(cp.state.total, 3);
            assert_eq!(cp.metadata.step, 3);
        }
        other => panic!("expected StepLimit, got {:?}", other),
    }
}

/// **Scenario**: A router returning an undeclared label fails with UnknownRoute.
#[tokio::test]
async fn undeclared_label_is_unknown_route() {
    let mut graph = StateGraph::<Tally>::new();
    graph
        .add_node("review", add("review", 1))
        .add_edge(START, "review")
        .add_conditional_edges(
            "review",
            ["again", "done"],
            Arc::new(|_: &Tally| "sideways".to_string()),
            loop_map("review"),
        );
    let err = graph
        .compile()
        .unwrap()
        .invoke(Tally::default(), None)
        .await
        .unwrap_err();
    match err {
        RunError::UnknownRoute { node_id, label, .. } => {
            assert_eq!(node_id, "review");
            assert_eq!(label, "sideways");
        }
        other => panic!("expected UnknownRoute, got {:?}", other),
    }
}

/// **Scenario**: Cancelling inside a node stops the run before the next node.
#[tokio::test]
async fn cancellation_observed_at_node_boundary() {
    let mut graph = StateGraph::<Tally>::new();
    graph
        .add_node("cancel", Arc::new(CancellingNode))
        .add_node("after", add("after", 1))
        .add_edge(START, "cancel")
        .add_edge("cancel", "after")
        .add_edge("after", END);

    let err = graph
        .compile()
        .unwrap()
        .invoke_with_cancel(Tally::default(), None, CancellationToken::new())
        .await
        .unwrap_err();
    match err {
        RunError::Cancelled {
            step,
            last_checkpoint,
        } => {
            assert_eq!(step, 1);
            let cp = last_checkpoint.unwrap();
            assert_eq!(cp.state.visited, vec!["cancel"]);
            assert_eq!(cp.metadata.next_node.as_deref(), Some("after"));
        }
        other => panic!("expected Cancelled, got {:?}", other),
    }
}

/// **Scenario**: A token cancelled before invoke runs no node at all.
#[tokio::test]
async fn pre_cancelled_token_runs_nothing() {
    let mut graph = StateGraph::<Tally>::new();
    graph
        .add_node("a", add("a", 1))
        .add_edge(START, "a")
        .add_edge("a", END);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = graph
        .compile()
        .unwrap()
        .invoke_with_cancel(Tally::default(), None, cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::Cancelled { step: 0, .. }), "{:?}", err);
    assert_eq!(err.last_checkpoint().map(|cp| cp.state.total), Some(0));
}

/// Records every node id and doubles the total each node writes.
#[derive(Default)]
struct RecordingMiddleware {
    seen: Mutex<Vec<String>>,
}

#[async_trait]
impl NodeMiddleware<Tally> for RecordingMiddleware {
    async fn around_run(
        &self,
        node_id: &str,
        state: Tally,
        inner: Box<dyn FnOnce(Tally) -> NodeFuture<Tally> + Send>,
    ) -> Result<<Tally as GraphState>::Patch, AgentError> {
        self.seen.lock().unwrap().push(node_id.to_string());
        let mut patch = inner(state).await?;
        if let Some(total) = patch.total.get().copied() {
            patch.total = provida::Overwrite::set(total * 2);
        }
        Ok(patch)
    }
}

/// **Scenario**: Middleware wraps every node and may rewrite its patch.
#[tokio::test]
async fn middleware_wraps_every_node() {
    let middleware = Arc::new(RecordingMiddleware::default());
    let mut graph = StateGraph::<Tally>::new().with_middleware(middleware.clone());
    graph
        .add_node("a", add("a", 1))
        .add_node("b", add("b", 1))
        .add_edge(START, "a")
        .add_edge("a", "b")
        .add_edge("b", END);

    let out = graph
        .compile()
        .unwrap()
        .invoke(Tally::default(), None)
        .await
        .unwrap();
    assert_eq!(*middleware.seen.lock().unwrap(), vec!["a", "b"]);
    // a: (0 + 1) * 2 = 2; b: (2 + 1) * 2 = 6
    assert_eq!(out.total, 6);
}
