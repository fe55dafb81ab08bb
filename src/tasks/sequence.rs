//! # Sequence wrappers: lazily observed iterators and streams.
//!
//! [`Generated`] wraps a producer of `Result<T, E>` items; [`GeneratedStream`]
//! does the same for an async [`Stream`].
//!
//! ```text
//! first pull   → capture args, on_start(), build the source
//! Ok(item)     → on_yield(item), forward item
//! Err(err)     → on_failure(err), forward err, then fused
//! exhausted    → on_success(None), then fused
//! dropped early→ on_failure("sequence dropped before exhaustion")
//! ```
//!
//! Items pass through unchanged and nothing is pulled ahead of the consumer.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{FusedStream, Stream, StreamExt};
use serde::Serialize;

use crate::tasks::invocation::Invocation;
use crate::tasks::task::{report, Task};

const DROPPED: &str = "sequence dropped before exhaustion";

impl Task {
    /// Sequence wrapper: observes every item `produce()` yields.
    ///
    /// ```rust
    /// use std::convert::Infallible;
    /// use tasktally::{Invocation, Status, Task};
    ///
    /// let mut task = Task::new("count");
    /// let items: Vec<i32> = task
    ///     .generates(Invocation::new(), || (0..3).map(Ok::<_, Infallible>))
    ///     .map(Result::unwrap)
    ///     .collect();
    /// assert_eq!(items, [0, 1, 2]);
    /// assert_eq!(task.status(), Status::Succeed);
    /// ```
    pub fn generates<F, I>(&mut self, invocation: Invocation, produce: F) -> Generated<'_, F, I>
    where
        F: FnOnce() -> I,
        I: IntoIterator,
    {
        Generated {
            task: self,
            start: Some((produce, invocation)),
            source: None,
            finished: false,
        }
    }

    /// Stream counterpart of [`Task::generates`].
    ///
    /// The stream is pinned internally, so `async`-built streams need no
    /// `Box::pin` at the call site.
    pub fn generates_stream<S>(&mut self, invocation: Invocation, stream: S) -> GeneratedStream<'_, S>
    where
        S: Stream,
    {
        GeneratedStream {
            task: self,
            invocation: Some(invocation),
            stream: Box::pin(stream),
            finished: false,
        }
    }
}

/// Iterator returned by [`Task::generates`].
pub struct Generated<'a, F, I: IntoIterator> {
    task: &'a mut Task,
    start: Option<(F, Invocation)>,
    source: Option<I::IntoIter>,
    finished: bool,
}

impl<F, I: IntoIterator> Generated<'_, F, I> {
    /// Read access to the observed task.
    pub fn task(&self) -> &Task {
        &*self.task
    }
}

impl<F, I, T, E> Iterator for Generated<'_, F, I>
where
    F: FnOnce() -> I,
    I: IntoIterator<Item = Result<T, E>>,
    T: Serialize,
    E: fmt::Display + fmt::Debug,
{
    type Item = Result<T, E>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if let Some((produce, invocation)) = self.start.take() {
            self.task.capture(invocation);
            report(self.task.on_start());
            self.source = Some(produce().into_iter());
        }
        let item = self.source.as_mut()?.next();
        match item {
            Some(Ok(value)) => {
                report(self.task.on_yield(&value));
                Some(Ok(value))
            }
            Some(Err(err)) => {
                self.finished = true;
                self.source = None;
                report(self.task.on_failure(&err));
                Some(Err(err))
            }
            None => {
                self.finished = true;
                self.source = None;
                report(self.task.on_success(None));
                None
            }
        }
    }
}

impl<F, I: IntoIterator> Drop for Generated<'_, F, I> {
    fn drop(&mut self) {
        let started = self.start.is_none();
        if started && !self.finished {
            abandon(self.task);
        }
    }
}

/// Stream returned by [`Task::generates_stream`].
pub struct GeneratedStream<'a, S> {
    task: &'a mut Task,
    invocation: Option<Invocation>,
    stream: Pin<Box<S>>,
    finished: bool,
}

impl<S> GeneratedStream<'_, S> {
    /// Read access to the observed task.
    pub fn task(&self) -> &Task {
        &*self.task
    }
}

impl<S, T, E> Stream for GeneratedStream<'_, S>
where
    S: Stream<Item = Result<T, E>>,
    T: Serialize,
    E: fmt::Display + fmt::Debug,
{
    type Item = Result<T, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        if this.finished {
            return Poll::Ready(None);
        }
        if let Some(invocation) = this.invocation.take() {
            this.task.capture(invocation);
            report(this.task.on_start());
        }
        match futures::ready!(this.stream.poll_next_unpin(cx)) {
            Some(Ok(value)) => {
                report(this.task.on_yield(&value));
                Poll::Ready(Some(Ok(value)))
            }
            Some(Err(err)) => {
                this.finished = true;
                report(this.task.on_failure(&err));
                Poll::Ready(Some(Err(err)))
            }
            None => {
                this.finished = true;
                report(this.task.on_success(None));
                Poll::Ready(None)
            }
        }
    }
}

impl<S, T, E> FusedStream for GeneratedStream<'_, S>
where
    S: Stream<Item = Result<T, E>>,
    T: Serialize,
    E: fmt::Display + fmt::Debug,
{
    fn is_terminated(&self) -> bool {
        self.finished
    }
}

impl<S> Drop for GeneratedStream<'_, S> {
    fn drop(&mut self) {
        let started = self.invocation.is_none();
        if started && !self.finished {
            abandon(self.task);
        }
    }
}

fn abandon(task: &mut Task) {
    if std::thread::panicking() {
        report(task.on_failure("panicked"));
    } else {
        report(task.on_failure(DROPPED));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Status;
    use std::convert::Infallible;

    #[test]
    fn test_nothing_happens_before_first_pull() {
        let mut task = Task::new("lazy");
        let seq = task.generates(Invocation::new(), || (0..3).map(Ok::<_, Infallible>));
        assert_eq!(seq.task().status(), Status::Unknown);
        drop(seq);
        assert_eq!(task.status(), Status::Unknown);
    }

    #[test]
    fn test_error_is_forwarded_then_fused() {
        let mut task = Task::new("parse");
        let items = vec![Ok(1), Err("bad row"), Ok(3)];
        let mut seq = task.generates(Invocation::new(), move || items);

        assert_eq!(seq.next(), Some(Ok(1)));
        assert_eq!(seq.next(), Some(Err("bad row")));
        assert_eq!(seq.next(), None);
        drop(seq);
        assert_eq!(task.status(), Status::Fail);
        assert_eq!(task.exception(), Some("bad row"));
    }

    #[test]
    fn test_dropping_midway_records_failure() {
        let mut task = Task::new("partial");
        {
            let mut seq = task.generates(Invocation::new(), || (0..10).map(Ok::<_, Infallible>));
            assert_eq!(seq.next(), Some(Ok(0)));
        }
        assert_eq!(task.status(), Status::Fail);
        assert_eq!(task.exception(), Some(DROPPED));
    }

    #[test]
    fn test_empty_sequence_succeeds() {
        let mut task = Task::new("empty");
        let count = task
            .generates(Invocation::new(), || std::iter::empty::<Result<u8, Infallible>>())
            .count();
        assert_eq!(count, 0);
        assert_eq!(task.status(), Status::Succeed);
    }
}
