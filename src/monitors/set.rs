//! # MonitorSet: ordered synchronous fan-out.
//!
//! [`MonitorSet`] delivers each notification to every registered [`Monitor`],
//! in registration order, on the calling thread.
//!
//! ## What it guarantees
//! - Every listener is notified, even when an earlier one returns an error.
//! - The first error is returned; later ones are logged (warn).
//!
//! ## Diagram
//! ```text
//!    dispatch(Transition, &Task)
//!        ├──► M1.on_*(&Task)
//!        ├──► M2.on_*(&Task)
//!        └──► MN.on_*(&Task)
//! ```

use std::sync::Arc;

use crate::error::LifecycleError;
use crate::tasks::Task;

use super::{Monitor, Transition};

/// Ordered listener list.
#[derive(Clone, Default)]
pub struct MonitorSet {
    monitors: Vec<Arc<dyn Monitor>>,
}

impl MonitorSet {
    /// Creates a set from existing listeners.
    #[must_use]
    pub fn new(monitors: Vec<Arc<dyn Monitor>>) -> Self {
        Self { monitors }
    }

    /// Appends a listener.
    pub fn push(&mut self, monitor: Arc<dyn Monitor>) {
        self.monitors.push(monitor);
    }

    /// Delivers `transition` for `task` to every listener.
    pub fn dispatch(&self, transition: Transition, task: &Task) -> Result<(), LifecycleError> {
        let mut first = None;
        for monitor in &self.monitors {
            if let Err(err) = transition.deliver(monitor.as_ref(), task) {
                if first.is_none() {
                    first = Some(err);
                } else {
                    tracing::warn!(
                        monitor = monitor.name(),
                        transition = transition.as_label(),
                        label = err.as_label(),
                        "{}",
                        err.as_message()
                    );
                }
            }
        }
        first.map_or(Ok(()), Err)
    }

    /// True if there are no listeners.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    /// Number of listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.monitors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Failing;
    impl Monitor for Failing {
        fn on_start(&self, task: &Task) -> Result<(), LifecycleError> {
            Err(LifecycleError::NotPending {
                id: task.id().clone(),
                tally: "failing".into(),
            })
        }
    }

    #[derive(Default)]
    struct Seen(Mutex<Vec<Transition>>);
    impl Monitor for Seen {
        fn on_start(&self, _task: &Task) -> Result<(), LifecycleError> {
            self.0.lock().unwrap().push(Transition::Start);
            Ok(())
        }
    }

    #[test]
    fn test_error_does_not_stop_fan_out() {
        let seen = Arc::new(Seen::default());
        let monitors: Vec<Arc<dyn Monitor>> =
            vec![Arc::new(Failing), seen.clone(), Arc::new(Failing)];
        let set = MonitorSet::new(monitors);
        let task = Task::new("t");

        let err = set.dispatch(Transition::Start, &task).unwrap_err();
        assert_eq!(err.as_label(), "tally_not_pending");
        assert_eq!(*seen.0.lock().unwrap(), vec![Transition::Start]);
        assert_eq!(set.len(), 3);
    }
}
