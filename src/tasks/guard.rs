//! # ActiveTask: scoped lifecycle guard.
//!
//! Returned by [`Task::enter`]. The task is already started; the guard makes
//! sure exactly one terminal transition happens on every exit path:
//!
//! ```text
//! guard.succeed(&value)      → on_success(value)
//! guard.complete()           → on_success(None)
//! guard.fail(&err)           → on_failure(err)
//! drop while unwinding       → on_failure("panicked")
//! drop after abandon_as(msg) → on_failure(msg)
//! drop otherwise             → on_failure("scope exited without a result")
//! ```
//!
//! Success is only ever explicit, so an error leaving the scope through `?`
//! is recorded as a failure.
//!
//! ```rust
//! use tasktally::{Invocation, Status, Task};
//!
//! fn parse(task: &mut Task, text: &str) -> Result<u32, std::num::ParseIntError> {
//!     let active = task.enter(Invocation::new().arg(text));
//!     let n: u32 = text.parse()?;
//!     active.succeed(&n);
//!     Ok(n)
//! }
//!
//! let mut task = Task::new("parse");
//! assert!(parse(&mut task, "nope").is_err());
//! assert_eq!(task.status(), Status::Fail);
//! ```

use std::fmt;

use serde::Serialize;

use crate::counters::Quantity;
use crate::tasks::task::{report, to_value, Task};

pub(crate) const NO_RESULT: &str = "scope exited without a result";

/// A started task bound to a lexical scope.
pub struct ActiveTask<'a> {
    task: &'a mut Task,
    done: bool,
    abandon: Option<&'static str>,
}

impl<'a> ActiveTask<'a> {
    pub(crate) fn new(task: &'a mut Task) -> Self {
        Self {
            task,
            done: false,
            abandon: None,
        }
    }

    /// Replaces the failure message recorded on a plain drop (no panic, no
    /// explicit terminal call).
    pub fn abandon_as(&mut self, reason: &'static str) -> &mut Self {
        self.abandon = Some(reason);
        self
    }

    /// Ends the scope successfully with `value`.
    pub fn succeed<T: Serialize + ?Sized>(mut self, value: &T) {
        self.done = true;
        report(self.task.on_success(to_value(value)));
    }

    /// Ends the scope successfully without a value.
    pub fn complete(mut self) {
        self.done = true;
        report(self.task.on_success(None));
    }

    /// Ends the scope with a failure.
    pub fn fail<E>(mut self, err: &E)
    where
        E: fmt::Display + fmt::Debug + ?Sized,
    {
        self.done = true;
        report(self.task.on_failure(err));
    }

    /// Reports an item produced inside the scope.
    pub fn yielded<T: Serialize + ?Sized>(&mut self, value: &T) -> &mut Self {
        report(self.task.on_yield(value));
        self
    }

    /// See [`Task::info`].
    pub fn info(&mut self, message: impl Into<String>) -> &mut Self {
        self.task.info(message);
        self
    }

    /// See [`Task::warning`].
    pub fn warning(&mut self, message: impl Into<String>) -> &mut Self {
        self.task.warning(message);
        self
    }

    /// See [`Task::error`].
    pub fn error(&mut self, message: impl Into<String>) -> &mut Self {
        self.task.error(message);
        self
    }

    /// See [`Task::consume`].
    pub fn consume(&mut self, key: impl Into<String>, amount: impl Into<Quantity>) -> &mut Self {
        report(self.task.consume(key, amount));
        self
    }

    /// Read access to the running task.
    pub fn task(&self) -> &Task {
        &*self.task
    }
}

impl Drop for ActiveTask<'_> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        if std::thread::panicking() {
            report(self.task.on_failure("panicked"));
        } else {
            report(self.task.on_failure(self.abandon.unwrap_or(NO_RESULT)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::NO_RESULT;
    use crate::{Invocation, Status, Task, HAS_FAILED, HAS_SUCCEEDED};
    use std::num::ParseIntError;

    #[test]
    fn test_plain_drop_is_a_failure() {
        let mut task = Task::new("block");
        {
            let mut active = task.enter(Invocation::new());
            active.info("inside").yielded(&1);
            assert_eq!(active.task().status(), Status::Run);
        }
        assert_eq!(task.status(), Status::Fail);
        assert_eq!(task.exception(), Some(NO_RESULT));
        assert_eq!(task.return_value(), None);
    }

    #[test]
    fn test_complete_succeeds_without_value() {
        let mut task = Task::new("block");
        task.enter(Invocation::new()).complete();
        assert_eq!(task.status(), Status::Succeed);
        assert_eq!(task.return_value(), None);
    }

    #[test]
    fn test_error_through_question_mark_is_a_failure() {
        fn body(task: &mut Task, text: &str) -> Result<u32, ParseIntError> {
            let active = task.enter(Invocation::new().arg(text));
            let n: u32 = text.parse()?;
            active.succeed(&n);
            Ok(n)
        }

        let mut task = Task::new("parse");
        assert!(body(&mut task, "nope").is_err());
        assert_eq!(task.status(), Status::Fail);
        assert_eq!(task.consumed().get(HAS_FAILED), Some(1.into()));
        assert_eq!(task.consumed().get(HAS_SUCCEEDED), None);

        let mut task = Task::new("parse");
        assert_eq!(body(&mut task, "12").unwrap(), 12);
        assert_eq!(task.status(), Status::Succeed);
    }

    #[test]
    fn test_abandon_reason_marks_failure() {
        let mut task = Task::new("abandoned");
        {
            let mut active = task.enter(Invocation::new());
            active.abandon_as("cancelled");
        }
        assert_eq!(task.status(), Status::Fail);
        assert_eq!(task.exception(), Some("cancelled"));
    }

    #[test]
    fn test_explicit_fail() {
        let mut task = Task::new("f");
        task.enter(Invocation::new()).fail("bad input");
        assert_eq!(task.status(), Status::Fail);
        assert_eq!(task.exception(), Some("bad input"));
    }
}
