//! # Task lifecycle status.
//!
//! ```text
//! Unknown ──on_start──► Run ──on_success──► Succeed
//!    │                   └────on_failure──► Fail
//!    └──(start skipped)──► Succeed | Fail
//! ```

use serde::{Deserialize, Serialize};

/// Lifecycle state of a [`Task`](crate::Task).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// Created, not started yet.
    #[default]
    Unknown,
    /// Between start and a terminal transition.
    Run,
    /// Terminal: the work raised an error.
    Fail,
    /// Terminal: the work completed.
    Succeed,
}

impl Status {
    /// True for [`Status::Succeed`] and [`Status::Fail`].
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Succeed | Status::Fail)
    }

    /// Emoji leading every log line of a task in this status.
    pub fn emoji(self) -> &'static str {
        match self {
            Status::Unknown => "🤷",
            Status::Run => "🏃",
            Status::Fail => "👎",
            Status::Succeed => "👍",
        }
    }

    /// Stable name, identical to the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Unknown => "Unknown",
            Status::Run => "Run",
            Status::Fail => "Fail",
            Status::Succeed => "Succeed",
        }
    }
}
