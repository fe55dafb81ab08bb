//! # tasktally
//!
//! **tasktally** is a lightweight task-instrumentation library for Rust.
//!
//! It wraps units of work (function calls, iterators, streams, scoped blocks)
//! with lifecycle tracking and aggregates outcome counters into a tree of
//! tallies for throughput measurement. It observes work; it never schedules it.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │     Task     │   │     Task     │   │     Task     │
//!     │ (returns)    │   │ (generates)  │   │ (enter/scope)│
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            │ on_start / on_yield / on_success / on_failure
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Tally [app.Billing.charge]                                       │
//! │  - forwards to listeners first                                    │
//! │  - pending: tasks between start and terminal                      │
//! │  - consumed: per-key totals merged on terminal                    │
//! └──────┬──────────────────────────────────────┬─────────────────────┘
//!        ▼                                      ▼
//! ┌─────────────────────────────┐      ┌──────────────────┐
//! │  Tally [app.Billing]        │      │  custom Monitor  │
//! └──────┬──────────────────────┘      └──────────────────┘
//!        ▼
//! ┌─────────────────────────────┐
//! │  Tally [app] (process-wide) │ ──► report(): { "app.outcome.hasStarted": {count, perSecond} }
//! └─────────────────────────────┘
//! ```
//!
//! ### Lifecycle
//! ```text
//! Unknown ──on_start──► Run ──on_yield*──► Run ──┬─on_success──► Succeed
//!                                                └─on_failure──► Fail
//! ```
//!
//! ## Features
//! | Area            | Description                                                   | Key types / traits                          |
//! |-----------------|---------------------------------------------------------------|---------------------------------------------|
//! | **Tasks**       | Lifecycle state machine and execution wrappers.               | [`Task`], [`ActiveTask`], [`Generated`]     |
//! | **Monitors**    | Hook into lifecycle notifications.                            | [`Monitor`], [`MonitorSet`]                 |
//! | **Tallies**     | Hierarchical counter aggregation and rate reports.            | [`Tally`], [`TallyReport`], [`Scope`]       |
//! | **Counters**    | Integer-or-float accumulators.                                | [`Quantity`], [`Consumed`]                  |
//! | **Logging**     | Line sinks and structured events.                             | [`LogSink`], [`TracingSink`], [`FnSink`]    |
//! | **Records**     | JSON export/import of tasks.                                  | [`TaskRecord`]                              |
//! | **Errors**      | Typed protocol errors.                                        | [`LifecycleError`]                          |
//! | **Configuration** | Id length, display limits, rate window floor.               | [`Config`]                                  |
//!
//! ## Optional features
//! - `logging` (default): exports the built-in [`LogWriter`] monitor.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use tasktally::{purpose, Invocation, Scope, Tally};
//!
//! // Process-wide tally, created once and passed explicitly.
//! let app = Arc::new(Tally::new([Scope::module("app")]));
//! let billing = Arc::new(app.child(Scope::class("Billing")));
//!
//! fn charge(tally: &Arc<Tally>, cents: u32) -> Result<u32, std::num::TryFromIntError> {
//!     tally
//!         .track(purpose!("charge"))
//!         .returns(Invocation::new().arg(cents), || u32::try_from(u64::from(cents) * 2))
//! }
//!
//! assert_eq!(charge(&billing, 21).unwrap(), 42);
//! let report = app.report();
//! assert_eq!(report.get("app.outcome.hasSucceeded").unwrap().count, 1.into());
//! ```
mod config;
mod counters;
mod error;
mod monitors;
mod scope;
mod sink;
mod tasks;

// ---- Public re-exports ----

pub use config::Config;
pub use counters::{Consumed, Quantity, HAS_FAILED, HAS_STARTED, HAS_SUCCEEDED};
pub use error::LifecycleError;
pub use monitors::{Monitor, MonitorSet, Rate, Tally, TallyReport, Transition};
pub use scope::Scope;
pub use sink::{FnSink, LogSink, TracingSink};
pub use tasks::{
    parse_timestamp, ActiveTask, Generated, GeneratedStream, Invocation, Status, Task, TaskId,
    TaskRecord,
};

#[doc(hidden)]
pub use tasks::format_purpose;

// Optional: expose a built-in structured-logging monitor.
// Enabled by default; opt out with `default-features = false`.
#[cfg(feature = "logging")]
pub use monitors::LogWriter;
