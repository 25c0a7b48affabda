//! Fan-out/fan-in inside a node: run independent sub-tasks concurrently and
//! collect their outputs in input order.

use std::future::Future;

use futures::stream::{self, StreamExt};

/// Runs `f` over every item with at most `concurrency` tasks in flight and
/// returns outputs so that output `i` belongs to input `i`, whatever order the
/// tasks finish in.
///
/// Errors are values here: return `Result` from `f` and decide per item, so one
/// failing sub-task never cancels its siblings. `concurrency` of 0 is treated as 1.
pub async fn fan_out<I, T, F, Fut>(items: I, concurrency: usize, f: F) -> Vec<T>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = T>,
{
    stream::iter(items)
        .map(f)
        .buffered(concurrency.max(1))
        .collect()
        .await
}
