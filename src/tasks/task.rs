//! # Task: one tracked unit of work.
//!
//! A [`Task`] carries identity, status, timing, consumed counters and
//! annotations, and notifies its listeners on every lifecycle transition.
//!
//! ## Lifecycle
//! ```text
//! Task::new(purpose)
//!   .notifies(tally)          (zero or more listeners, notified in order)
//!   .logs(sink)               (optional line sink)
//!
//! on_start()                  Unknown → Run,    outcome.hasStarted   += 1
//! on_yield(value)*            Run     → Run
//! on_success(value)           Run     → Succeed, outcome.hasSucceeded += 1
//!   | on_failure(error)       Run     → Fail,    outcome.hasFailed    += 1
//! ```
//!
//! Each transition first updates the task itself, then writes its log lines,
//! then notifies every listener. A listener error never stops the remaining
//! listeners from being notified; the first error is returned.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use tasktally::{Invocation, Status, Tally, Task};
//!
//! let tally = Arc::new(Tally::new([]));
//! let mut task = Task::new("add").notifies(tally.clone());
//!
//! let sum = task.returns(Invocation::from_args([1, 2]), || Ok::<_, std::fmt::Error>(1 + 2));
//! assert_eq!(sum.unwrap(), 3);
//! assert_eq!(task.status(), Status::Succeed);
//! assert_eq!(tally.count("outcome.hasSucceeded"), Some(1.into()));
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::Config;
use crate::counters::{Consumed, Quantity, HAS_FAILED, HAS_STARTED, HAS_SUCCEEDED};
use crate::error::LifecycleError;
use crate::monitors::{Monitor, MonitorSet, Transition};
use crate::sink::LogSink;
use crate::tasks::guard::ActiveTask;
use crate::tasks::id::TaskId;
use crate::tasks::invocation::Invocation;
use crate::tasks::status::Status;

/// Source of [`Task::key`]; never reused within a process.
static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

/// One tracked invocation.
pub struct Task {
    key: u64,
    id: TaskId,
    parent_id: Option<TaskId>,
    purpose: Option<String>,
    status: Status,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    consumed: Consumed,
    tags: BTreeSet<String>,
    warnings: Vec<String>,
    errors: Vec<String>,
    args: Option<Vec<Value>>,
    kwargs: Option<Map<String, Value>>,
    return_value: Option<Value>,
    exception: Option<String>,
    listeners: MonitorSet,
    sink: Option<Arc<dyn LogSink>>,
    config: Config,
}

impl Task {
    /// Creates a task with the default [`Config`].
    pub fn new(purpose: impl Into<String>) -> Self {
        Self::with_config(purpose, &Config::default())
    }

    /// Creates a task using `config` for id generation and display limits.
    pub fn with_config(purpose: impl Into<String>, config: &Config) -> Self {
        Self {
            id: TaskId::generate(config.id_len()),
            purpose: Some(purpose.into()),
            config: config.clone(),
            ..Self::blank()
        }
    }

    fn blank() -> Self {
        Self {
            key: NEXT_KEY.fetch_add(1, Ordering::Relaxed),
            id: TaskId::from(String::new()),
            parent_id: None,
            purpose: None,
            status: Status::Unknown,
            start_time: None,
            end_time: None,
            consumed: Consumed::new(),
            tags: BTreeSet::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
            args: None,
            kwargs: None,
            return_value: None,
            exception: None,
            listeners: MonitorSet::default(),
            sink: None,
            config: Config::default(),
        }
    }

    // ---- Builders ----

    /// Registers a listener; listeners are notified in registration order.
    #[must_use]
    pub fn notifies(mut self, listener: Arc<dyn Monitor>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Records `parent` as the causally enclosing task.
    #[must_use]
    pub fn child_of(mut self, parent: &Task) -> Self {
        self.parent_id = Some(parent.id.clone());
        self
    }

    /// Records a parent by id only.
    #[must_use]
    pub fn with_parent_id(mut self, parent_id: TaskId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Replaces the tag set.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Attaches a log sink.
    #[must_use]
    pub fn logs(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Captures the call arguments for tasks driven by hand.
    #[must_use]
    pub fn with_invocation(mut self, invocation: Invocation) -> Self {
        self.capture(invocation);
        self
    }

    /// Stores the invocation unless the task already started; captured
    /// arguments never change afterwards.
    pub(crate) fn capture(&mut self, invocation: Invocation) {
        if self.status != Status::Unknown {
            tracing::warn!(task_id = %self.id, "arguments captured after start are ignored");
            return;
        }
        let (args, kwargs) = invocation.into_parts();
        self.args = args;
        self.kwargs = kwargs;
    }

    // ---- Lifecycle transitions ----

    /// `Unknown → Run`.
    pub fn on_start(&mut self) -> Result<(), LifecycleError> {
        if self.status != Status::Unknown {
            return Err(LifecycleError::AlreadyStarted {
                id: self.id.clone(),
                status: self.status,
            });
        }
        self.start_time = Some(Utc::now());
        self.status = Status::Run;
        self.consumed.add(HAS_STARTED, 1);

        if let Some(sink) = self.active_sink() {
            self.write(sink, "BEGIN ", None);
            if let Some(args) = &self.args {
                self.write(sink, "ARGS  ", Some(&json_text(args)));
            }
            if let Some(kwargs) = &self.kwargs {
                self.write(sink, "KWARGS ", Some(&json_text(kwargs)));
            }
        }
        self.listeners.dispatch(Transition::Start, self)
    }

    /// Reports one produced item; the status stays [`Status::Run`].
    pub fn on_yield<T>(&mut self, value: &T) -> Result<(), LifecycleError>
    where
        T: Serialize + ?Sized,
    {
        if self.status != Status::Run {
            return Err(LifecycleError::NotRunning {
                id: self.id.clone(),
                status: self.status,
            });
        }
        if let Some(sink) = self.active_sink() {
            if let Some(value) = to_value(value) {
                self.write(sink, "YIELD ", Some(&value.to_string()));
            }
        }
        self.listeners.dispatch(Transition::Yield, self)
    }

    /// Terminal success; `return_value` of `None` (or JSON `null`) records no value.
    pub fn on_success(&mut self, return_value: Option<Value>) -> Result<(), LifecycleError> {
        self.finish(Status::Succeed)?;
        self.return_value = return_value.filter(|v| !v.is_null());

        if let Some(sink) = self.active_sink() {
            self.write(sink, "END   ", None);
            if let Some(value) = &self.return_value {
                self.write(sink, "RETURN ", Some(&value.to_string()));
            }
        }
        self.listeners.dispatch(Transition::Success, self)
    }

    /// Terminal failure caused by `exception`.
    ///
    /// The exception is stored through its `Display` form; the `TRACE` log line
    /// uses its `Debug` form, which for chained errors includes the causes.
    pub fn on_failure<E>(&mut self, exception: &E) -> Result<(), LifecycleError>
    where
        E: fmt::Display + fmt::Debug + ?Sized,
    {
        self.finish(Status::Fail)?;
        let message = exception.to_string();

        if let Some(sink) = self.active_sink() {
            self.write(sink, "FAIL  ", Some(&message));
            self.write(sink, "TRACE ", Some(&format!("{exception:?}")));
        }
        self.exception = Some(message);
        self.listeners.dispatch(Transition::Failure, self)
    }

    fn finish(&mut self, status: Status) -> Result<(), LifecycleError> {
        if self.status.is_terminal() {
            return Err(LifecycleError::AlreadyFinished {
                id: self.id.clone(),
                status: self.status,
            });
        }
        self.end_time = Some(Utc::now());
        self.status = status;
        let key = match status {
            Status::Fail => HAS_FAILED,
            _ => HAS_SUCCEEDED,
        };
        self.consumed.add(key, 1);
        Ok(())
    }

    // ---- Execution wrappers ----

    /// Runs `work` as this task's single result.
    ///
    /// `Ok` → `on_success(value)`, `Err` → `on_failure(err)`; in both cases the
    /// outcome is handed back unchanged. A panic inside `work` records a failure
    /// and keeps unwinding.
    pub fn returns<T, E, F>(&mut self, invocation: Invocation, work: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        T: Serialize,
        E: fmt::Display + fmt::Debug,
    {
        let active = self.enter(invocation);
        match work() {
            Ok(value) => {
                active.succeed(&value);
                Ok(value)
            }
            Err(err) => {
                active.fail(&err);
                Err(err)
            }
        }
    }

    /// Like [`Task::returns`], but records no return value, so `T` needs no
    /// `Serialize` implementation.
    pub fn runs<T, E, F>(&mut self, invocation: Invocation, work: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: fmt::Display + fmt::Debug,
    {
        let active = self.enter(invocation);
        match work() {
            Ok(value) => {
                active.complete();
                Ok(value)
            }
            Err(err) => {
                active.fail(&err);
                Err(err)
            }
        }
    }

    /// Async counterpart of [`Task::returns`].
    ///
    /// Dropping the returned future before it completes records a failure.
    pub async fn returns_async<T, E, Fut>(
        &mut self,
        invocation: Invocation,
        work: Fut,
    ) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
        T: Serialize,
        E: fmt::Display + fmt::Debug,
    {
        let mut active = self.enter(invocation);
        active.abandon_as(FUTURE_DROPPED);
        match work.await {
            Ok(value) => {
                active.succeed(&value);
                Ok(value)
            }
            Err(err) => {
                active.fail(&err);
                Err(err)
            }
        }
    }

    /// Async counterpart of [`Task::runs`].
    pub async fn runs_async<T, E, Fut>(&mut self, invocation: Invocation, work: Fut) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display + fmt::Debug,
    {
        let mut active = self.enter(invocation);
        active.abandon_as(FUTURE_DROPPED);
        match work.await {
            Ok(value) => {
                active.complete();
                Ok(value)
            }
            Err(err) => {
                active.fail(&err);
                Err(err)
            }
        }
    }

    /// Scoped-block form: `work` receives the active task for annotations.
    ///
    /// ```rust
    /// use tasktally::{Invocation, Status, Task};
    ///
    /// let mut task = Task::new("import batch");
    /// let rows = task.scope(Invocation::new(), |active| {
    ///     active.consume("rows", 120);
    ///     active.warning("3 rows skipped");
    ///     Ok::<_, std::io::Error>(117)
    /// });
    /// assert_eq!(rows.unwrap(), 117);
    /// assert_eq!(task.status(), Status::Succeed);
    /// assert_eq!(task.warnings(), ["3 rows skipped"]);
    /// ```
    pub fn scope<T, E, F>(&mut self, invocation: Invocation, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut ActiveTask<'_>) -> Result<T, E>,
        T: Serialize,
        E: fmt::Display + fmt::Debug,
    {
        let mut active = self.enter(invocation);
        match work(&mut active) {
            Ok(value) => {
                active.succeed(&value);
                Ok(value)
            }
            Err(err) => {
                active.fail(&err);
                Err(err)
            }
        }
    }

    /// Starts the task and returns a guard that guarantees a terminal
    /// transition on every exit path.
    ///
    /// Success must be explicit ([`ActiveTask::succeed`] or
    /// [`ActiveTask::complete`]); any other exit, including an error returned
    /// through `?`, records a failure.
    pub fn enter(&mut self, invocation: Invocation) -> ActiveTask<'_> {
        self.capture(invocation);
        report(self.on_start());
        ActiveTask::new(self)
    }

    // ---- Annotations ----

    /// Logs an informational line.
    pub fn info(&mut self, message: impl Into<String>) -> &mut Self {
        let message = message.into();
        if let Some(sink) = self.active_sink() {
            self.write(sink, "INFO  ", Some(&message));
        }
        self
    }

    /// Logs and records a warning.
    pub fn warning(&mut self, message: impl Into<String>) -> &mut Self {
        let message = message.into();
        if let Some(sink) = self.active_sink() {
            self.write(sink, "WARN  ", Some(&message));
        }
        self.warnings.push(message);
        self
    }

    /// Logs and records an error message (does not fail the task).
    pub fn error(&mut self, message: impl Into<String>) -> &mut Self {
        let message = message.into();
        if let Some(sink) = self.active_sink() {
            self.write(sink, "ERROR ", Some(&message));
        }
        self.errors.push(message);
        self
    }

    /// Adds a user-defined measurement to this task's counters.
    ///
    /// Tallies pick it up with the outcome counters on the terminal transition.
    pub fn consume(
        &mut self,
        key: impl Into<String>,
        amount: impl Into<Quantity>,
    ) -> Result<(), LifecycleError> {
        if self.status.is_terminal() {
            return Err(LifecycleError::AlreadyFinished {
                id: self.id.clone(),
                status: self.status,
            });
        }
        self.consumed.add(key, amount);
        Ok(())
    }

    // ---- Logging ----

    fn active_sink(&self) -> Option<&dyn LogSink> {
        self.sink.as_deref().filter(|sink| sink.enabled())
    }

    fn write(&self, sink: &dyn LogSink, verb: &str, body: Option<&str>) {
        sink.write_line(&self.to_log_line(verb, body));
    }

    /// Formats `<status-emoji> <task-id> <verb><body>`; the body defaults to the purpose.
    pub fn to_log_line(&self, verb: &str, body: Option<&str>) -> String {
        let body = body.or(self.purpose.as_deref()).unwrap_or_default();
        format!("{} {} {verb}{body}", self.status.emoji(), self.id)
    }

    // ---- Accessors ----

    /// Process-unique identity used by tallies to track this task in flight.
    ///
    /// Unlike [`Task::id`] it is never shown, exported or imported; an
    /// imported task gets a fresh key.
    pub(crate) fn key(&self) -> u64 {
        self.key
    }

    /// Identity token.
    pub fn id(&self) -> &TaskId {
        &self.id
    }

    /// Causally enclosing task, if any.
    pub fn parent_id(&self) -> Option<&TaskId> {
        self.parent_id.as_ref()
    }

    /// What this task does.
    pub fn purpose(&self) -> Option<&str> {
        self.purpose.as_deref()
    }

    /// Current lifecycle state.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Set when entering [`Status::Run`].
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.start_time
    }

    /// Set when entering a terminal status.
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    /// Time between start and end, once both are known.
    pub fn duration(&self) -> Option<Duration> {
        let (start, end) = (self.start_time?, self.end_time?);
        (end - start).to_std().ok()
    }

    /// Counters recorded so far.
    pub fn consumed(&self) -> &Consumed {
        &self.consumed
    }

    /// Tag labels.
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Recorded warnings, in call order.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Recorded error messages, in call order.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// True if at least one warning was recorded.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// True if at least one error message was recorded.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Captured positional arguments.
    pub fn args(&self) -> Option<&[Value]> {
        self.args.as_deref()
    }

    /// Captured keyword arguments.
    pub fn kwargs(&self) -> Option<&Map<String, Value>> {
        self.kwargs.as_ref()
    }

    /// Value recorded by `on_success`.
    pub fn return_value(&self) -> Option<&Value> {
        self.return_value.as_ref()
    }

    /// Message recorded by `on_failure`.
    pub fn exception(&self) -> Option<&str> {
        self.exception.as_deref()
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Purpose shortened to `limit` characters (marker included).
    pub fn purpose_abbrev(&self, limit: usize) -> Option<String> {
        self.purpose.as_deref().map(|p| abbreviate(p, limit))
    }

    /// Return value rendered as text and shortened to `limit` characters.
    pub fn return_abbrev(&self, limit: usize) -> Option<String> {
        self.return_value.as_ref().map(|v| match v {
            Value::String(s) => abbreviate(s, limit),
            other => abbreviate(&other.to_string(), limit),
        })
    }

    /// [`Task::purpose_abbrev`] with the configured limit.
    pub fn purpose_short(&self) -> Option<String> {
        self.purpose_abbrev(self.config.purpose_limit())
    }

    /// [`Task::return_abbrev`] with the configured limit.
    pub fn return_short(&self) -> Option<String> {
        self.return_abbrev(self.config.returns_limit())
    }

    // ---- Record support ----

    pub(crate) fn from_parts(parts: TaskParts) -> Self {
        Self {
            id: parts.id,
            parent_id: parts.parent_id,
            purpose: parts.purpose,
            status: parts.status,
            start_time: parts.start_time,
            end_time: parts.end_time,
            warnings: parts.warnings,
            errors: parts.errors,
            args: parts.args,
            kwargs: parts.kwargs,
            return_value: parts.return_value,
            exception: parts.exception,
            ..Self::blank()
        }
    }
}

/// Plain data used to rebuild an imported task.
pub(crate) struct TaskParts {
    pub id: TaskId,
    pub parent_id: Option<TaskId>,
    pub purpose: Option<String>,
    pub status: Status,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub args: Option<Vec<Value>>,
    pub kwargs: Option<Map<String, Value>>,
    pub return_value: Option<Value>,
    pub exception: Option<String>,
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("parent_id", &self.parent_id)
            .field("purpose", &self.purpose)
            .field("status", &self.status)
            .field("consumed", &self.consumed)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}

const FUTURE_DROPPED: &str = "future dropped before completion";

/// Reports a protocol error raised inside an execution wrapper.
///
/// Wrappers never let instrumentation change the wrapped call's outcome.
pub(crate) fn report(result: Result<(), LifecycleError>) {
    if let Err(err) = result {
        tracing::error!(label = err.as_label(), "{}", err.as_message());
    }
}

/// Serializes a value for records and log lines; `null` counts as no value.
pub(crate) fn to_value<T: Serialize + ?Sized>(value: &T) -> Option<Value> {
    match serde_json::to_value(value) {
        Ok(Value::Null) => None,
        Ok(v) => Some(v),
        Err(err) => {
            tracing::warn!(error = %err, "value is not representable as JSON");
            None
        }
    }
}

fn json_text<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|err| format!("<unserializable: {err}>"))
}

fn abbreviate(text: &str, limit: usize) -> String {
    let keep = limit.saturating_sub(4);
    if text.chars().count() > keep {
        let head: String = text.chars().take(keep).collect();
        format!("{head} ...")
    } else {
        text.to_owned()
    }
}
