//! Error types used by tasks and monitors.
//!
//! [`LifecycleError`] covers two families of failures:
//!
//! - **protocol violations**: a collaborator drove a [`Task`](crate::Task) or a
//!   [`Tally`](crate::Tally) out of order (double start, terminal twice, terminal
//!   without a matching start on an aggregator);
//! - **import failures**: a task record could not be rebuilt from JSON.
//!
//! Errors raised by the *observed* work are never wrapped in this type; the
//! execution wrappers hand them back to the caller unchanged.
//!
//! Both helper methods (`as_label`, `as_message`) exist for logs and metrics.

use thiserror::Error;

use crate::tasks::{Status, TaskId};

/// # Errors produced by the lifecycle protocol.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// `on_start` was called on a task that already left [`Status::Unknown`].
    #[error("task {id} already started (status {status:?})")]
    AlreadyStarted {
        /// Offending task.
        id: TaskId,
        /// Status at the time of the call.
        status: Status,
    },

    /// A transition that requires [`Status::Run`] saw another status.
    #[error("task {id} is not running (status {status:?})")]
    NotRunning {
        /// Offending task.
        id: TaskId,
        /// Status at the time of the call.
        status: Status,
    },

    /// A terminal transition was requested on a task that already finished.
    #[error("task {id} already finished (status {status:?})")]
    AlreadyFinished {
        /// Offending task.
        id: TaskId,
        /// Terminal status the task already holds.
        status: Status,
    },

    /// A tally saw `on_start` twice for the same task.
    #[error("task {id} is already pending in tally '{tally}'")]
    AlreadyPending {
        /// Offending task.
        id: TaskId,
        /// Dotted scope path of the tally.
        tally: String,
    },

    /// A tally saw a terminal event for a task it never saw start.
    #[error("task {id} is not pending in tally '{tally}' (missed on_start?)")]
    NotPending {
        /// Offending task.
        id: TaskId,
        /// Dotted scope path of the tally.
        tally: String,
    },

    /// A task record is not valid JSON of the expected shape.
    #[error("invalid task record: {0}")]
    Import(#[from] serde_json::Error),

    /// A timestamp in a task record could not be parsed.
    #[error("invalid timestamp {value:?}")]
    InvalidTimestamp {
        /// The raw text that failed to parse.
        value: String,
    },
}

impl LifecycleError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use tasktally::{LifecycleError, Status, TaskId};
    ///
    /// let err = LifecycleError::AlreadyStarted {
    ///     id: TaskId::from("ABC1234"),
    ///     status: Status::Run,
    /// };
    /// assert_eq!(err.as_label(), "task_already_started");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            LifecycleError::AlreadyStarted { .. } => "task_already_started",
            LifecycleError::NotRunning { .. } => "task_not_running",
            LifecycleError::AlreadyFinished { .. } => "task_already_finished",
            LifecycleError::AlreadyPending { .. } => "tally_already_pending",
            LifecycleError::NotPending { .. } => "tally_not_pending",
            LifecycleError::Import(_) => "record_invalid",
            LifecycleError::InvalidTimestamp { .. } => "record_invalid_timestamp",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            LifecycleError::AlreadyStarted { id, status } => {
                format!("start on task {id} in status {}", status.as_str())
            }
            LifecycleError::NotRunning { id, status } => {
                format!("task {id} expected running, found {}", status.as_str())
            }
            LifecycleError::AlreadyFinished { id, status } => {
                format!("task {id} already terminal: {}", status.as_str())
            }
            LifecycleError::AlreadyPending { id, tally } => {
                format!("duplicate start of {id} in tally '{tally}'")
            }
            LifecycleError::NotPending { id, tally } => {
                format!("terminal event of {id} without start in tally '{tally}'")
            }
            LifecycleError::Import(err) => format!("record: {err}"),
            LifecycleError::InvalidTimestamp { value } => format!("timestamp: {value}"),
        }
    }

    /// Indicates whether the error reports a collaborator driving the protocol
    /// out of order (as opposed to bad input data).
    ///
    /// # Example
    /// ```
    /// use tasktally::LifecycleError;
    ///
    /// let bad = LifecycleError::InvalidTimestamp { value: "yesterday".into() };
    /// assert!(!bad.is_protocol_violation());
    /// ```
    pub fn is_protocol_violation(&self) -> bool {
        !matches!(
            self,
            LifecycleError::Import(_) | LifecycleError::InvalidTimestamp { .. }
        )
    }
}
