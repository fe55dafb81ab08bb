//! # Tally: hierarchical outcome aggregator.
//!
//! A [`Tally`] is a [`Monitor`] that sums the consumed counters of every task
//! it observes, and forwards every notification to its own listeners, so
//! tallies compose into a rollup tree:
//!
//! ```text
//! Task ──► Tally[app.Billing.charge] ──► Tally[app.Billing] ──► Tally[app]
//! ```
//!
//! ## Behavior
//! - **start**: forward, then add the task to `pending`
//! - **yield**: forward only
//! - **success / failure**: forward, then remove the task from `pending` and
//!   add its `consumed` into the running totals
//!
//! Forwarding happens before this node's own bookkeeping, so outer listeners
//! observe the event before shared state changes. No lock is held while
//! forwarding.
//!
//! ## Protocol checks
//! - start of a task that is not running → [`LifecycleError::NotRunning`]
//! - start of a task already pending → [`LifecycleError::AlreadyPending`]
//!
//! Pending tasks are keyed by an internal per-task identity, not by the
//! displayed [`TaskId`](crate::TaskId), so tasks sharing an id are still counted apart.
//! - terminal event of a task not pending → [`LifecycleError::NotPending`]
//!   (nothing is merged, so a task is never counted twice)
//!
//! ## Report
//! ```text
//! { "app.Billing.outcome.hasStarted": { "count": 12, "perSecond": 0.4 }, ... }
//! ```
//! `perSecond` is `null` while the window since the last reset is shorter than
//! [`Config::rate_floor`](crate::Config::rate_floor).

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Config;
use crate::counters::{Consumed, Quantity};
use crate::error::LifecycleError;
use crate::scope::{self, Scope};
use crate::tasks::{Status, Task};

use super::{Monitor, MonitorSet, Transition};

/// Mutable aggregation state, guarded by the tally's lock.
struct TallyState {
    start_time: DateTime<Utc>,
    consumed: Consumed,
    pending: HashSet<u64>,
}

impl TallyState {
    fn fresh() -> Self {
        Self {
            start_time: Utc::now(),
            consumed: Consumed::new(),
            pending: HashSet::new(),
        }
    }
}

/// Counter aggregator and lifecycle listener.
pub struct Tally {
    scopes: Vec<Scope>,
    path: String,
    config: Config,
    listeners: MonitorSet,
    state: Mutex<TallyState>,
}

impl Tally {
    /// Creates a tally with the default [`Config`].
    pub fn new(scopes: impl IntoIterator<Item = Scope>) -> Self {
        Self::with_config(Config::default(), scopes)
    }

    /// Creates a tally with an explicit [`Config`].
    pub fn with_config(config: Config, scopes: impl IntoIterator<Item = Scope>) -> Self {
        let scopes: Vec<Scope> = scopes.into_iter().collect();
        Self {
            path: scope::join(&scopes),
            scopes,
            config,
            listeners: MonitorSet::default(),
            state: Mutex::new(TallyState::fresh()),
        }
    }

    /// Registers a listener that receives every notification this tally sees.
    #[must_use]
    pub fn notifies(mut self, listener: Arc<dyn Monitor>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Builds a tally one level below this one.
    ///
    /// The child's scopes extend this tally's scopes with `scope`, and the
    /// child forwards to this tally.
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use tasktally::{Scope, Tally};
    ///
    /// let module = Arc::new(Tally::new([Scope::module("app")]));
    /// let class = Arc::new(module.child(Scope::class("Billing")));
    /// assert_eq!(class.to_string(), "app.Billing");
    /// ```
    pub fn child(self: &Arc<Self>, scope: Scope) -> Tally {
        let mut scopes = self.scopes.clone();
        scopes.push(scope);
        let parent: Arc<dyn Monitor> = Arc::clone(self) as Arc<dyn Monitor>;
        Tally::with_config(self.config.clone(), scopes).notifies(parent)
    }

    /// Builds a task that already notifies this tally.
    pub fn track(self: &Arc<Self>, purpose: impl Into<String>) -> Task {
        let me: Arc<dyn Monitor> = Arc::clone(self) as Arc<dyn Monitor>;
        Task::with_config(purpose, &self.config).notifies(me)
    }

    /// Clears counters and pending tasks and restarts the measurement window.
    ///
    /// Scopes and listeners are kept.
    pub fn reset(&self) {
        *self.state() = TallyState::fresh();
    }

    // ---- Accessors ----

    /// Scope chain of this tally.
    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    /// Start of the current measurement window.
    pub fn start_time(&self) -> DateTime<Utc> {
        self.state().start_time
    }

    /// Snapshot of the running totals.
    pub fn consumed(&self) -> Consumed {
        self.state().consumed.clone()
    }

    /// Current total for `key`.
    pub fn count(&self, key: &str) -> Option<Quantity> {
        self.state().consumed.get(key)
    }

    /// Number of tasks between start and a terminal event.
    pub fn pending_len(&self) -> usize {
        self.state().pending.len()
    }

    /// True if `task` is currently pending here.
    pub fn is_pending(&self, task: &Task) -> bool {
        self.state().pending.contains(&task.key())
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    // ---- Report ----

    /// Report computed against the current time.
    pub fn report(&self) -> TallyReport {
        self.report_at(Utc::now())
    }

    /// Report computed against `now`.
    pub fn report_at(&self, now: DateTime<Utc>) -> TallyReport {
        let state = self.state();
        let elapsed = (now - state.start_time).to_std().unwrap_or(Duration::ZERO);
        let seconds = self
            .config
            .rate_window_ok(elapsed)
            .then(|| elapsed.as_secs_f64());

        let entries = state
            .consumed
            .iter()
            .map(|(key, count)| {
                let rate = Rate {
                    count,
                    per_second: seconds.map(|s| count.as_f64() / s),
                };
                (self.key_for(key), rate)
            })
            .collect();
        TallyReport { entries }
    }

    /// Report as JSON.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self.report()).unwrap_or_default()
    }

    fn key_for(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_owned()
        } else {
            format!("{}.{key}", self.path)
        }
    }

    fn state(&self) -> MutexGuard<'_, TallyState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn finish(&self, transition: Transition, task: &Task) -> Result<(), LifecycleError> {
        let forwarded = self.listeners.dispatch(transition, task);

        let mut state = self.state();
        if !state.pending.remove(&task.key()) {
            drop(state);
            return forwarded.and(Err(LifecycleError::NotPending {
                id: task.id().clone(),
                tally: self.path.clone(),
            }));
        }
        state.consumed.merge(task.consumed());
        forwarded
    }
}

impl Monitor for Tally {
    fn on_start(&self, task: &Task) -> Result<(), LifecycleError> {
        let forwarded = self.listeners.dispatch(Transition::Start, task);

        if task.status() != Status::Run {
            return forwarded.and(Err(LifecycleError::NotRunning {
                id: task.id().clone(),
                status: task.status(),
            }));
        }
        if !self.state().pending.insert(task.key()) {
            return forwarded.and(Err(LifecycleError::AlreadyPending {
                id: task.id().clone(),
                tally: self.path.clone(),
            }));
        }
        forwarded
    }

    fn on_yield(&self, task: &Task) -> Result<(), LifecycleError> {
        self.listeners.dispatch(Transition::Yield, task)
    }

    fn on_success(&self, task: &Task) -> Result<(), LifecycleError> {
        self.finish(Transition::Success, task)
    }

    fn on_failure(&self, task: &Task) -> Result<(), LifecycleError> {
        self.finish(Transition::Failure, task)
    }

    fn name(&self) -> &str {
        "Tally"
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

impl fmt::Debug for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("Tally")
            .field("path", &self.path)
            .field("consumed", &state.consumed)
            .field("pending", &state.pending.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for Tally {
    fn default() -> Self {
        Self::new([])
    }
}

/// Count and throughput of one counter key.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rate {
    /// Accumulated total.
    pub count: Quantity,
    /// `count` per second of the measurement window; `None` when the window is
    /// too short to measure.
    #[serde(rename = "perSecond")]
    pub per_second: Option<f64>,
}

/// Flat mapping of dotted counter key → [`Rate`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TallyReport {
    entries: BTreeMap<String, Rate>,
}

impl TallyReport {
    /// Rate for a fully qualified key.
    pub fn get(&self, key: &str) -> Option<&Rate> {
        self.entries.get(key)
    }

    /// Iterates entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Rate)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// True if nothing was counted.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counters::{HAS_FAILED, HAS_STARTED, HAS_SUCCEEDED};
    use serde_json::json;

    fn running(tally: &Arc<Tally>) -> Task {
        let mut task = tally.track("t");
        task.on_start().unwrap();
        task
    }

    #[test]
    fn test_start_and_finish_update_pending_and_totals() {
        let tally = Arc::new(Tally::new([Scope::module("app")]));
        let mut task = running(&tally);
        assert!(tally.is_pending(&task));
        assert!(tally.consumed().is_empty());

        task.on_success(None).unwrap();
        assert_eq!(tally.pending_len(), 0);
        assert_eq!(tally.count(HAS_STARTED), Some(Quantity::Int(1)));
        assert_eq!(tally.count(HAS_SUCCEEDED), Some(Quantity::Int(1)));
        assert_eq!(tally.count(HAS_FAILED), None);
    }

    #[test]
    fn test_terminal_without_start_is_rejected() {
        let tally = Arc::new(Tally::new([Scope::module("app")]));
        let mut task = Task::new("untracked");
        task.on_start().unwrap();
        task.on_success(None).unwrap();

        let err = tally.on_success(&task).unwrap_err();
        assert!(matches!(err, LifecycleError::NotPending { tally: ref path, .. } if path == "app"));
        assert!(tally.consumed().is_empty());
    }

    #[test]
    fn test_start_of_non_running_task_is_rejected() {
        let tally = Tally::new([]);
        let task = Task::new("idle");
        assert_eq!(
            tally.on_start(&task).unwrap_err().as_label(),
            "task_not_running"
        );
        assert_eq!(tally.pending_len(), 0);
    }

    #[test]
    fn test_duplicate_start_is_rejected() {
        let tally = Arc::new(Tally::new([]));
        let task = running(&tally);
        assert_eq!(
            tally.on_start(&task).unwrap_err().as_label(),
            "tally_already_pending"
        );
        assert_eq!(tally.pending_len(), 1);
    }

    #[test]
    fn test_reset_clears_state_and_restarts_window() {
        let tally = Arc::new(Tally::new([]));
        let mut done = running(&tally);
        done.on_success(None).unwrap();
        let _in_flight = running(&tally);
        let before = tally.start_time();

        tally.reset();
        assert!(tally.consumed().is_empty());
        assert_eq!(tally.pending_len(), 0);
        assert!(tally.start_time() >= before);
        assert!(tally.report().is_empty());
    }

    #[test]
    fn test_report_keys_and_rates() {
        let tally = Arc::new(Tally::new([Scope::module("app"), Scope::class("Billing")]));
        let mut task = running(&tally);
        task.consume("rows", 2.5).unwrap();
        task.on_success(None).unwrap();

        let later = tally.start_time() + chrono::Duration::seconds(2);
        let report = tally.report_at(later);
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({
                "app.Billing.outcome.hasStarted": {"count": 1, "perSecond": 0.5},
                "app.Billing.outcome.hasSucceeded": {"count": 1, "perSecond": 0.5},
                "app.Billing.rows": {"count": 2.5, "perSecond": 1.25},
            })
        );
    }

    #[test]
    fn test_zero_window_reports_null_rate() {
        let tally = Arc::new(Tally::new([]));
        let mut task = running(&tally);
        task.on_failure("boom").unwrap();

        let report = tally.report_at(tally.start_time());
        let rate = report.get(HAS_FAILED).unwrap();
        assert_eq!(rate.count, Quantity::Int(1));
        assert_eq!(rate.per_second, None);
        assert_eq!(
            serde_json::to_value(rate).unwrap(),
            json!({"count": 1, "perSecond": null})
        );
    }

    #[test]
    fn test_tasks_sharing_an_id_are_counted_apart() {
        let config = Config {
            id_len: 1,
            ..Config::default()
        };
        let tally = Arc::new(Tally::with_config(config, []));
        let mut tasks: Vec<Task> = (0..40).map(|_| tally.track("t")).collect();
        let imported = Task::from_json(&tasks[0].to_json()).unwrap();
        assert_eq!(imported.id(), tasks[0].id());
        tasks.push(imported.notifies(tally.clone()));

        for task in &mut tasks {
            task.on_start().unwrap();
        }
        assert_eq!(tally.pending_len(), 41);
        for task in &mut tasks {
            task.on_success(None).unwrap();
        }
        assert_eq!(tally.pending_len(), 0);
        assert_eq!(tally.count(HAS_STARTED), Some(Quantity::Int(41)));
        assert_eq!(tally.count(HAS_SUCCEEDED), Some(Quantity::Int(41)));
    }

    #[test]
    fn test_child_forwards_to_parent() {
        let root = Arc::new(Tally::new([Scope::module("app")]));
        let leaf = Arc::new(root.child(Scope::function("charge")));
        assert_eq!(leaf.scopes().len(), 2);

        let mut task = running(&leaf);
        assert!(root.is_pending(&task));
        task.on_success(None).unwrap();
        assert_eq!(root.count(HAS_SUCCEEDED), Some(Quantity::Int(1)));
        assert_eq!(leaf.count(HAS_SUCCEEDED), Some(Quantity::Int(1)));
        assert!(leaf.report().get("app.charge.outcome.hasSucceeded").is_some());
        assert!(root.report().get("app.outcome.hasSucceeded").is_some());
    }
}
