//! Checkpoint-based resume: a failed run continues from its last checkpoint,
//! and SQLite checkpoints survive a fresh saver on the same file.

use std::sync::Arc;

use provida::memory::Checkpointer;
use provida::{
    CheckpointError, CompiledStateGraph, JsonSerializer, MemorySaver, Node, RunError,
    RunnableConfig, SqliteSaver, StateGraph, END, START,
};

use crate::common::{add, FlakyNode, Tally};

fn two_step(
    second: Arc<dyn Node<Tally>>,
    saver: Arc<dyn Checkpointer<Tally>>,
) -> CompiledStateGraph<Tally> {
    let mut graph = StateGraph::<Tally>::new();
    graph
        .add_node("first", add("first", 5))
        .add_node("second", second)
        .add_edge(START, "first")
        .add_edge("first", "second")
        .add_edge("second", END);
    graph.compile_with_checkpointer(saver).unwrap()
}

/// **Scenario**: A node failure aborts with the previous checkpoint; resume re-runs only the failed node.
#[tokio::test]
async fn resume_after_abort_runs_only_remaining_nodes() {
    let flaky = Arc::new(FlakyNode::new("second", 10, 1));
    let compiled = two_step(flaky.clone(), Arc::new(MemorySaver::<Tally>::new()));
    let config = RunnableConfig::for_thread("run-abort");

    let err = compiled
        .invoke(Tally::default(), Some(config.clone()))
        .await
        .unwrap_err();
    match &err {
        RunError::Aborted(aborted) => {
            assert_eq!(aborted.node_id, "second");
            assert_eq!(aborted.step, 2);
        }
        other => panic!("expected Aborted, got {:?}", other),
    }
    let cp = err.last_checkpoint().unwrap();
    assert_eq!(cp.state.total, 5);
    assert_eq!(cp.metadata.next_node.as_deref(), Some("second"));

    let out = compiled.resume(config.clone()).await.unwrap();
    assert_eq!(out.total, 15);
    assert_eq!(out.visited, vec!["first", "second"]);
    assert_eq!(flaky.calls(), 2);

    let last = compiled.get_state(&config).await.unwrap().unwrap();
    assert!(last.is_terminal());
    assert_eq!(last.metadata.step, 2);
}

/// **Scenario**: Resuming a finished run returns its final state without running a node.
#[tokio::test]
async fn resume_of_finished_run_is_a_no_op() {
    let flaky = Arc::new(FlakyNode::new("second", 10, 0));
    let compiled = two_step(flaky.clone(), Arc::new(MemorySaver::<Tally>::new()));
    let config = RunnableConfig::for_thread("run-done");

    let first = compiled
        .invoke(Tally::default(), Some(config.clone()))
        .await
        .unwrap();
    let again = compiled.resume(config).await.unwrap();
    assert_eq!(again, first);
    assert_eq!(flaky.calls(), 1);
}

/// **Scenario**: Resuming an unknown run fails with NothingToResume; no run id fails with ThreadIdRequired.
#[tokio::test]
async fn resume_requires_existing_run() {
    let compiled = two_step(add("second", 1), Arc::new(MemorySaver::<Tally>::new()));

    let err = compiled
        .resume(RunnableConfig::for_thread("never-started"))
        .await
        .unwrap_err();
    assert!(
        matches!(&err, RunError::NothingToResume(id) if id == "never-started"),
        "{:?}",
        err
    );

    let err = compiled.resume(RunnableConfig::default()).await.unwrap_err();
    assert!(
        matches!(err, RunError::Checkpoint(CheckpointError::ThreadIdRequired)),
        "{:?}",
        err
    );
}

/// **Scenario**: Checkpoints written through SQLite are read back by a new saver and the run resumes.
#[tokio::test]
async fn sqlite_checkpoints_survive_new_saver() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("checkpoints.db");
    let config = RunnableConfig::for_thread("run-sqlite");

    {
        let saver = SqliteSaver::<Tally>::new(&db, Arc::new(JsonSerializer)).unwrap();
        let compiled = two_step(Arc::new(FlakyNode::new("second", 10, 1)), Arc::new(saver));
        let err = compiled
            .invoke(Tally::default(), Some(config.clone()))
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::Aborted(_)), "{:?}", err);
    }

    let saver = Arc::new(SqliteSaver::<Tally>::new(&db, Arc::new(JsonSerializer)).unwrap());
    let items = saver.list(&config, None).await.unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[1].metadata.completed_node.as_deref(), Some("first"));

    let compiled = two_step(add("second", 10), saver.clone());
    let out = compiled.resume(config.clone()).await.unwrap();
    assert_eq!(out.total, 15);
    assert_eq!(out.visited, vec!["first", "second"]);
    assert_eq!(saver.list(&config, None).await.unwrap().len(), 3);
}
