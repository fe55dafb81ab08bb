use std::fmt;
use std::sync::Arc;

use futures::{stream, FutureExt, StreamExt};
use tasktally::{Invocation, Quantity, Scope, Status, Tally, HAS_FAILED, HAS_SUCCEEDED};

#[tokio::test]
async fn async_call_is_tracked_like_a_sync_one() {
    let tally = Arc::new(Tally::new([Scope::module("net")]));
    let mut task = tally.track("fetch");

    let body = task
        .returns_async(Invocation::new().kwarg("url", "/health"), async {
            tokio::task::yield_now().await;
            Ok::<_, fmt::Error>("ok")
        })
        .await
        .unwrap();

    assert_eq!(body, "ok");
    assert_eq!(task.status(), Status::Succeed);
    assert_eq!(task.return_value(), Some(&serde_json::json!("ok")));
    assert_eq!(tally.count(HAS_SUCCEEDED), Some(Quantity::Int(1)));
}

#[tokio::test]
async fn async_error_is_handed_back() {
    let tally = Arc::new(Tally::new([]));
    let mut task = tally.track("fetch");

    let out = task
        .returns_async(Invocation::new(), async { Err::<u8, _>(fmt::Error) })
        .await;

    assert_eq!(out, Err(fmt::Error));
    assert_eq!(task.status(), Status::Fail);
    assert_eq!(tally.count(HAS_FAILED), Some(Quantity::Int(1)));
}

#[tokio::test]
async fn stream_items_pass_through_unchanged() {
    let tally = Arc::new(Tally::new([]));
    let mut task = tally.track("pages");

    let pages: Vec<Result<u32, fmt::Error>> = task
        .generates_stream(Invocation::new(), stream::iter(vec![Ok(1), Ok(2), Ok(3)]))
        .collect()
        .await;

    assert_eq!(pages, vec![Ok(1), Ok(2), Ok(3)]);
    assert_eq!(task.status(), Status::Succeed);
    assert_eq!(tally.pending_len(), 0);
    assert_eq!(tally.count(HAS_SUCCEEDED), Some(Quantity::Int(1)));
}

#[tokio::test]
async fn stream_error_ends_the_task() {
    let mut task = tasktally::Task::new("pages");
    let mut pages = task.generates_stream(
        Invocation::new(),
        stream::iter(vec![Ok(1), Err(fmt::Error), Ok(3)]),
    );

    assert_eq!(pages.next().await, Some(Ok(1)));
    assert_eq!(pages.next().await, Some(Err(fmt::Error)));
    assert_eq!(pages.next().await, None);
    drop(pages);

    assert_eq!(task.status(), Status::Fail);
}

#[test]
fn dropped_future_records_failure() {
    let tally = Arc::new(Tally::new([]));
    let mut task = tally.track("never finishes");
    {
        let mut pending = Box::pin(
            task.returns_async(Invocation::new(), std::future::pending::<Result<u8, fmt::Error>>()),
        );
        assert!(pending.as_mut().now_or_never().is_none());
    }

    assert_eq!(task.status(), Status::Fail);
    assert_eq!(task.exception(), Some("future dropped before completion"));
    assert_eq!(tally.count(HAS_FAILED), Some(Quantity::Int(1)));
}

#[tokio::test]
async fn async_built_streams_need_no_pinning() {
    let mut task = tasktally::Task::new("pages");
    let source = stream::once(async { Ok::<u32, fmt::Error>(1) })
        .chain(stream::once(async { Ok(2) }));

    let pages: Vec<_> = task
        .generates_stream(Invocation::new(), source)
        .collect()
        .await;

    assert_eq!(pages, vec![Ok(1), Ok(2)]);
    assert_eq!(task.status(), Status::Succeed);
}

#[tokio::test]
async fn runs_async_records_outcome_only() {
    struct Connection;

    let tally = Arc::new(Tally::new([]));
    let mut task = tally.track("connect");
    let conn = task
        .runs_async(Invocation::new(), async { Ok::<_, fmt::Error>(Connection) })
        .await;

    assert!(conn.is_ok());
    assert_eq!(task.status(), Status::Succeed);
    assert_eq!(task.return_value(), None);
    assert_eq!(tally.count(HAS_SUCCEEDED), Some(Quantity::Int(1)));
}
