//! # Example: tally_tree
//!
//! Demonstrates a three-level tally tree with a custom monitor and line logging.
//!
//! Shows how to:
//! - Build per-module / per-class / per-function [`Tally`] rollups with [`Tally::child`].
//! - Track calls with [`Tally::track`] and the [`purpose!`] macro.
//! - Attach a custom [`Monitor`] next to the built-in [`LogWriter`].
//! - Read a rate report.
//!
//! ## Flow
//! ```text
//! Task::returns / generates / scope
//!     └─► Tally[shop.Cart.add|remove]
//!           └─► Tally[shop.Cart]
//!                 └─► Tally[shop] ──► LogWriter, SlowCallWatch
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=info cargo run --example tally_tree
//! ```

use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tasktally::{
    purpose, Invocation, LifecycleError, LogWriter, Monitor, Scope, Tally, Task, TracingSink,
};
use tracing_subscriber::EnvFilter;

/// Counts calls that took longer than a threshold.
struct SlowCallWatch {
    threshold: Duration,
    slow: AtomicUsize,
}

impl Monitor for SlowCallWatch {
    fn on_success(&self, task: &Task) -> Result<(), LifecycleError> {
        if task.duration().is_some_and(|d| d >= self.threshold) {
            self.slow.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "SlowCallWatch"
    }
}

#[derive(Debug, thiserror::Error)]
#[error("item {0} is not in the cart")]
struct NotInCart(u32);

fn main() -> Result<(), serde_json::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let watch = Arc::new(SlowCallWatch {
        threshold: Duration::from_millis(5),
        slow: AtomicUsize::new(0),
    });
    let shop = Arc::new(
        Tally::new([Scope::module("shop")])
            .notifies(Arc::new(LogWriter::new()))
            .notifies(watch.clone()),
    );
    let cart = Arc::new(shop.child(Scope::class("Cart")));
    let add = Arc::new(cart.child(Scope::function("add")));
    let remove = Arc::new(cart.child(Scope::function("remove")));
    let sink = Arc::new(TracingSink::new());

    for item in [3u32, 5, 8] {
        let _ = add
            .track(purpose!("add"))
            .logs(sink.clone())
            .scope(Invocation::new().arg(item), |active| {
                active.consume("items", 1);
                std::thread::sleep(Duration::from_millis(u64::from(item)));
                Ok::<_, Infallible>(item)
            });
    }

    let removed = remove
        .track(purpose!("remove"))
        .logs(sink.clone())
        .returns(Invocation::new().arg(42), || Err::<u32, _>(NotInCart(42)));
    println!("remove(42) -> {removed:?}");

    let mut listing = cart.track(purpose!("list"));
    let names: Vec<&str> = listing
        .generates(Invocation::new(), || {
            ["apple", "pear"].into_iter().map(Ok::<_, Infallible>)
        })
        .filter_map(Result::ok)
        .collect();
    println!("list() -> {names:?}");

    println!("slow calls: {}", watch.slow.load(Ordering::Relaxed));
    println!("{}", serde_json::to_string_pretty(&shop.report())?);
    Ok(())
}
