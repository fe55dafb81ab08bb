//! # LogWriter: structured lifecycle events
//!
//! A minimal monitor that reports every transition as a `tracing` event
//! (target `tasktally::monitor`). Failures are logged at WARN, everything else
//! at DEBUG/INFO.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO  tasktally::monitor: task started task_id=K3ZQ1AB purpose="billing.rs.42: charge"
//! DEBUG tasktally::monitor: task yielded task_id=K3ZQ1AB
//! INFO  tasktally::monitor: task succeeded task_id=K3ZQ1AB elapsed_ms=12
//! WARN  tasktally::monitor: task failed task_id=K3ZQ1AB exception="division by zero"
//! ```

use crate::error::LifecycleError;
use crate::monitors::Monitor;
use crate::tasks::Task;

/// Lifecycle event writer.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn elapsed_ms(task: &Task) -> u64 {
    task.duration()
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

impl Monitor for LogWriter {
    fn on_start(&self, task: &Task) -> Result<(), LifecycleError> {
        let purpose = task.purpose_short().unwrap_or_default();
        let parent = task.parent_id().map(|id| id.as_str()).unwrap_or("");
        tracing::info!(
            target: "tasktally::monitor",
            task_id = %task.id(),
            parent_id = parent,
            purpose = purpose.as_str(),
            "task started"
        );
        Ok(())
    }

    fn on_yield(&self, task: &Task) -> Result<(), LifecycleError> {
        tracing::debug!(target: "tasktally::monitor", task_id = %task.id(), "task yielded");
        Ok(())
    }

    fn on_success(&self, task: &Task) -> Result<(), LifecycleError> {
        let returns = task.return_short().unwrap_or_default();
        tracing::info!(
            target: "tasktally::monitor",
            task_id = %task.id(),
            elapsed_ms = elapsed_ms(task),
            returns = returns.as_str(),
            "task succeeded"
        );
        Ok(())
    }

    fn on_failure(&self, task: &Task) -> Result<(), LifecycleError> {
        tracing::warn!(
            target: "tasktally::monitor",
            task_id = %task.id(),
            elapsed_ms = elapsed_ms(task),
            exception = task.exception().unwrap_or("<none>"),
            "task failed"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "LogWriter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Invocation;
    use std::sync::Arc;

    #[test]
    fn test_log_writer_never_interferes() {
        let mut task = Task::new("logged").notifies(Arc::new(LogWriter::new()));
        let out = task.returns(Invocation::new(), || "nope".parse::<u32>());
        assert!(out.is_err());
        assert_eq!(task.exception(), Some("invalid digit found in string"));
    }
}
