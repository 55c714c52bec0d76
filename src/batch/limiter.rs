//! Per-batch concurrency limiting

use futures::stream::{self, Stream, StreamExt};
use std::future::Future;

/// Run `worker` over `items` with at most `permits` futures in flight
///
/// Results are yielded in completion order. A slot frees as soon as its future
/// resolves, whatever the result, and the next item starts immediately. The
/// permit pool lives and dies with the returned stream.
pub(crate) fn completion_stream<I, F, Fut>(
    items: I,
    permits: usize,
    worker: F,
) -> impl Stream<Item = Fut::Output>
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future,
{
    stream::iter(items).map(worker).buffer_unordered(permits.max(1))
}
