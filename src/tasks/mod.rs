//! # Tracked tasks.
//!
//! This module provides the task-related types:
//! - [`Task`] - one tracked unit of work and its lifecycle state machine
//! - [`Status`] - lifecycle states
//! - [`TaskId`] - opaque identity token
//! - [`Invocation`] - captured call arguments
//! - [`ActiveTask`] - scoped guard returned by [`Task::enter`]
//! - [`Generated`], [`GeneratedStream`] - observed sequences
//! - [`TaskRecord`] - JSON shape for export/import

mod guard;
mod id;
mod invocation;
mod purpose;
mod record;
mod sequence;
mod status;
mod task;

pub use guard::ActiveTask;
pub use id::TaskId;
pub use invocation::Invocation;
#[doc(hidden)]
pub use purpose::format_purpose;
pub use record::{parse_timestamp, TaskRecord};
pub use sequence::{Generated, GeneratedStream};
pub use status::Status;
pub use task::Task;
