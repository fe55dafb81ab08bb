//! # Crate-wide configuration.
//!
//! Provides [`Config`], the settings shared by tasks and tallies.
//!
//! Config is passed explicitly:
//! 1. **Task creation**: `Task::with_config(purpose, &config)`
//! 2. **Tally creation**: `Tally::with_config(config, scopes)`
//!
//! ## Sentinel values
//! - `id_len = 0` → clamped to 1 (an id is never empty)
//! - `purpose_limit` / `returns_limit` below 5 → clamped to 5 (room for the ` ...` marker)
//! - `rate_floor = 0s` → only an exactly-zero window is treated as too short

use std::time::Duration;

/// Global configuration for tasks and tallies.
///
/// ## Field semantics
/// - `id_len`: length of generated task ids
/// - `purpose_limit`: display limit used by [`Task::purpose_abbrev`](crate::Task::purpose_abbrev)
/// - `returns_limit`: display limit used by [`Task::return_abbrev`](crate::Task::return_abbrev)
/// - `rate_floor`: shortest measurement window for which a tally reports a rate
///
/// ## Notes
/// All fields are public for flexibility. Prefer the helper accessors to avoid
/// sprinkling sentinel checks across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Number of characters in a generated task id.
    pub id_len: usize,

    /// Maximum characters of an abbreviated purpose, including the ` ...` marker.
    pub purpose_limit: usize,

    /// Maximum characters of an abbreviated return value, including the ` ...` marker.
    pub returns_limit: usize,

    /// Measurement windows shorter than this report no `perSecond` rate.
    ///
    /// - `Duration::ZERO` = only a zero-length window is insufficient
    /// - `> 0` = any window below the floor is insufficient
    pub rate_floor: Duration,
}

impl Config {
    /// Returns the id length clamped to a minimum of 1.
    #[inline]
    pub fn id_len(&self) -> usize {
        self.id_len.max(1)
    }

    /// Returns the purpose display limit clamped to a minimum of 5.
    #[inline]
    pub fn purpose_limit(&self) -> usize {
        self.purpose_limit.max(5)
    }

    /// Returns the return-value display limit clamped to a minimum of 5.
    #[inline]
    pub fn returns_limit(&self) -> usize {
        self.returns_limit.max(5)
    }

    /// Returns `true` if a window of `elapsed` is long enough to report a rate.
    #[inline]
    pub fn rate_window_ok(&self, elapsed: Duration) -> bool {
        !elapsed.is_zero() && elapsed >= self.rate_floor
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `id_len = 7`
    /// - `purpose_limit = 160`
    /// - `returns_limit = 80`
    /// - `rate_floor = 1ms`
    fn default() -> Self {
        Self {
            id_len: 7,
            purpose_limit: 160,
            returns_limit: 80,
            rate_floor: Duration::from_millis(1),
        }
    }
}
