//! # Lifecycle monitors.
//!
//! This module provides the [`Monitor`] trait and built-in implementations.
//!
//! ## Architecture
//! ```text
//! Task::on_*() ── MonitorSet::dispatch ──► Monitor::on_*(&Task)
//!                                              │
//!                                    ┌─────────┼──────────┐
//!                                    ▼         ▼          ▼
//!                                  Tally   LogWriter   Custom
//!                                    │
//!                                    └── MonitorSet::dispatch ──► parent Tally, ...
//! ```
//!
//! ## Monitor types
//! - **Aggregating** - keep counters and pending sets ([`Tally`])
//! - **Passive** - observe and report ([`LogWriter`], test recorders)

#[cfg(feature = "logging")]
mod log;
mod monitor;
mod set;
mod tally;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use monitor::{Monitor, Transition};
pub use set::MonitorSet;
pub use tally::{Rate, Tally, TallyReport};
