//! Per-resource polling, change notification and scheduling.
//!
//! Each started resource gets a [`monitor::Monitor`]: it samples through the
//! collector readers, derives the metrics, remembers the last status and
//! tells subscribers what changed. The [`Scheduler`] owns all monitors and
//! runs the ones that are due; it never spawns threads of its own.

pub mod config;
pub mod monitor;
pub mod notify;
pub mod scheduler;

pub use config::{BackoffPolicy, MonitorOptions, PollConfig};
pub use notify::{Callback, ChangedField, Notification};
pub use scheduler::Scheduler;

use serde::{Deserialize, Serialize};

use crate::collector::PollError;
use crate::metrics::{BatteryState, InterfaceState};

/// A monitorable resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum ResourceId {
    /// Power-supply device name, e.g. `BAT0`.
    Battery(String),
    /// Network interface name, e.g. `wlan0`.
    Interface(String),
}

impl ResourceId {
    pub fn name(&self) -> &str {
        match self {
            ResourceId::Battery(name) | ResourceId::Interface(name) => name,
        }
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceId::Battery(name) => write!(f, "battery {}", name),
            ResourceId::Interface(name) => write!(f, "interface {}", name),
        }
    }
}

/// Opaque reference to a started monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonitorHandle(pub u64);

impl std::fmt::Display for MonitorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Derived values of one successful poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Snapshot {
    Battery(BatteryState),
    Interface(InterfaceState),
}

/// Current status of a monitor.
///
/// An error and a derived snapshot never coexist: the error replaces the
/// snapshot until the next successful poll.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "lowercase")]
pub enum MonitorStatus {
    /// Not polled yet.
    #[default]
    Idle,
    Ready(Snapshot),
    Error(PollError),
}

impl MonitorStatus {
    pub fn snapshot(&self) -> Option<&Snapshot> {
        match self {
            MonitorStatus::Ready(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&PollError> {
        match self {
            MonitorStatus::Error(e) => Some(e),
            _ => None,
        }
    }

    pub fn battery(&self) -> Option<&BatteryState> {
        match self.snapshot() {
            Some(Snapshot::Battery(state)) => Some(state),
            _ => None,
        }
    }

    pub fn interface(&self) -> Option<&InterfaceState> {
        match self.snapshot() {
            Some(Snapshot::Interface(state)) => Some(state),
            _ => None,
        }
    }
}

/// Error type for scheduler calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorError {
    /// The handle was never issued or has been stopped.
    UnknownHandle(MonitorHandle),
}

impl std::fmt::Display for MonitorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitorError::UnknownHandle(handle) => write!(f, "unknown monitor {}", handle),
        }
    }
}

impl std::error::Error for MonitorError {}
