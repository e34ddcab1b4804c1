//! panelmon-core: telemetry polling engine behind desktop-panel applets.
//!
//! Provides:
//! - `collector`: raw counter readers for battery sysfs attributes and
//!   network interface counters, behind the `FileSystem` abstraction
//! - `metrics`: pure derivation of presentation metrics (percentage,
//!   time remaining, link activity, signal strength)
//! - `poller`: per-resource state machines, change notifications and the
//!   single-threaded `Scheduler` that drives them
//! - `alarm`: low-battery alarm command with an at-most-one-running guard
//! - `fmt`: tooltip and label helpers for GUI consumers

pub mod alarm;
pub mod collector;
pub mod fmt;
pub mod metrics;
pub mod poller;
