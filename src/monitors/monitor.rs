//! # Monitor: the lifecycle listener capability.
//!
//! [`Monitor`] is the main **extension point**. Anything implementing it can be
//! attached to a [`Task`] or a [`Tally`](crate::Tally):
//!
//! ```text
//! Task ── on_*(&Task) ──► Tally(function) ──► Tally(class) ──► Tally(module)
//!   │                          └────────────► test recorder
//!   └──────────────────► LogWriter
//! ```
//!
//! Notifications are synchronous: they run inside the transition call, in
//! listener-registration order.
//!
//! # Example: custom monitor
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use tasktally::{LifecycleError, Monitor, Task};
//!
//! #[derive(Default)]
//! struct FailureCounter(AtomicUsize);
//!
//! impl Monitor for FailureCounter {
//!     fn on_failure(&self, _task: &Task) -> Result<(), LifecycleError> {
//!         self.0.fetch_add(1, Ordering::Relaxed);
//!         Ok(())
//!     }
//! }
//! ```

use crate::error::LifecycleError;
use crate::tasks::Task;

/// Receiver of task lifecycle notifications.
///
/// All methods default to doing nothing. Returning an error reports a protocol
/// violation back to whoever drove the transition; it never undoes the
/// transition itself.
pub trait Monitor: Send + Sync {
    /// `task` entered [`Status::Run`](crate::Status::Run).
    fn on_start(&self, _task: &Task) -> Result<(), LifecycleError> {
        Ok(())
    }

    /// `task` produced an item.
    fn on_yield(&self, _task: &Task) -> Result<(), LifecycleError> {
        Ok(())
    }

    /// `task` reached [`Status::Succeed`](crate::Status::Succeed).
    fn on_success(&self, _task: &Task) -> Result<(), LifecycleError> {
        Ok(())
    }

    /// `task` reached [`Status::Fail`](crate::Status::Fail).
    fn on_failure(&self, _task: &Task) -> Result<(), LifecycleError> {
        Ok(())
    }

    /// Human-readable name (for diagnostics).
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// One of the four notifications, used to dispatch generically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Transition {
    /// `on_start`
    Start,
    /// `on_yield`
    Yield,
    /// `on_success`
    Success,
    /// `on_failure`
    Failure,
}

impl Transition {
    /// Delivers this notification to `monitor`.
    pub fn deliver(self, monitor: &dyn Monitor, task: &Task) -> Result<(), LifecycleError> {
        match self {
            Transition::Start => monitor.on_start(task),
            Transition::Yield => monitor.on_yield(task),
            Transition::Success => monitor.on_success(task),
            Transition::Failure => monitor.on_failure(task),
        }
    }

    /// Stable snake_case label.
    pub fn as_label(self) -> &'static str {
        match self {
            Transition::Start => "start",
            Transition::Yield => "yield",
            Transition::Success => "success",
            Transition::Failure => "failure",
        }
    }
}
