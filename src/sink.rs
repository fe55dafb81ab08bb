//! # Line-oriented log sinks.
//!
//! A [`Task`](crate::Task) writes one formatted line per lifecycle event or
//! annotation into its [`LogSink`], if it has one:
//!
//! ```text
//! <status-emoji> <task-id> <verb><body>
//!
//! 🏃 K3ZQ1AB BEGIN billing.rs.42: charge
//! 🏃 K3ZQ1AB ARGS  [12,"EUR"]
//! 👍 K3ZQ1AB END   billing.rs.42: charge
//! 👍 K3ZQ1AB RETURN {"ok":true}
//! ```
//!
//! The enablement predicate ([`LogSink::enabled`]) is evaluated once per logging
//! call; a disabled sink receives nothing.
//!
//! Provided sinks:
//! - [`TracingSink`] forwards lines to `tracing` at INFO level;
//! - [`FnSink`] adapts a pair of closures (line writer + enablement predicate).

use std::fmt;

/// Destination for task log lines.
pub trait LogSink: Send + Sync {
    /// Whether the next call should produce any line at all.
    fn enabled(&self) -> bool {
        true
    }

    /// Writes one fully formatted line.
    fn write_line(&self, line: &str);
}

/// Sink writing lines as `tracing` events (target `tasktally::task`).
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl TracingSink {
    /// Construct a new [`TracingSink`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl LogSink for TracingSink {
    fn enabled(&self) -> bool {
        tracing::enabled!(target: "tasktally::task", tracing::Level::INFO)
    }

    fn write_line(&self, line: &str) {
        tracing::info!(target: "tasktally::task", "{line}");
    }
}

/// Closure-backed sink.
///
/// ## Example
/// ```rust
/// use std::sync::{Arc, Mutex};
/// use tasktally::{FnSink, LogSink};
///
/// let lines = Arc::new(Mutex::new(Vec::new()));
/// let out = Arc::clone(&lines);
/// let sink = FnSink::new(move |line: &str| out.lock().unwrap().push(line.to_owned()));
///
/// sink.write_line("hello");
/// assert_eq!(lines.lock().unwrap().as_slice(), ["hello"]);
/// ```
pub struct FnSink<W, E = fn() -> bool> {
    write: W,
    enabled: E,
}

fn always() -> bool {
    true
}

impl<W> FnSink<W>
where
    W: Fn(&str) + Send + Sync,
{
    /// Creates an always-enabled sink.
    pub fn new(write: W) -> Self {
        Self {
            write,
            enabled: always,
        }
    }
}

impl<W, E> FnSink<W, E>
where
    W: Fn(&str) + Send + Sync,
    E: Fn() -> bool + Send + Sync,
{
    /// Creates a sink gated by `enabled`.
    pub fn gated(write: W, enabled: E) -> Self {
        Self { write, enabled }
    }
}

impl<W, E> LogSink for FnSink<W, E>
where
    W: Fn(&str) + Send + Sync,
    E: Fn() -> bool + Send + Sync,
{
    fn enabled(&self) -> bool {
        (self.enabled)()
    }

    fn write_line(&self, line: &str) {
        (self.write)(line)
    }
}

impl<W, E> fmt::Debug for FnSink<W, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnSink").finish_non_exhaustive()
    }
}
