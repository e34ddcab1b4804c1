//! Change detection between consecutive monitor statuses.
//!
//! Notifications are edge-triggered: a tick that reproduces the previous
//! derived values raises nothing, however many counters moved underneath.

use serde::{Deserialize, Serialize};

use crate::metrics::{BatteryState, InterfaceState};
use crate::poller::{MonitorHandle, MonitorStatus, ResourceId, Snapshot};

/// Derived value that changed between two ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangedField {
    /// Moved between idle, ready and error.
    Status,
    /// The error kind or message changed (including set/cleared).
    Error,
    /// A different battery device is now being monitored.
    Device,
    Percentage,
    SecondsRemaining,
    Charging,
    ChargeState,
    Activity,
    Wireless,
    SignalStrength,
}

/// Delivered to subscribers when at least one derived value changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub handle: MonitorHandle,
    pub resource: ResourceId,
    pub changed: Vec<ChangedField>,
    pub status: MonitorStatus,
}

/// Subscriber callback.
pub type Callback = Box<dyn FnMut(&Notification) + Send>;

fn diff_battery(old: &BatteryState, new: &BatteryState, changed: &mut Vec<ChangedField>) {
    if old.name() != new.name() {
        changed.push(ChangedField::Device);
    }
    if old.percentage != new.percentage {
        changed.push(ChangedField::Percentage);
    }
    if old.seconds_remaining != new.seconds_remaining {
        changed.push(ChangedField::SecondsRemaining);
    }
    if old.charging != new.charging {
        changed.push(ChangedField::Charging);
    }
    if old.state != new.state {
        changed.push(ChangedField::ChargeState);
    }
}

fn diff_interface(old: &InterfaceState, new: &InterfaceState, changed: &mut Vec<ChangedField>) {
    if old.activity != new.activity {
        changed.push(ChangedField::Activity);
    }
    if old.wireless != new.wireless {
        changed.push(ChangedField::Wireless);
    }
    if old.signal_strength != new.signal_strength {
        changed.push(ChangedField::SignalStrength);
    }
}

/// Lists the derived values that differ between `old` and `new`.
pub fn diff_status(old: &MonitorStatus, new: &MonitorStatus) -> Vec<ChangedField> {
    let mut changed = Vec::new();

    match (old, new) {
        (MonitorStatus::Idle, MonitorStatus::Idle) => {}
        (MonitorStatus::Ready(a), MonitorStatus::Ready(b)) => match (a, b) {
            (Snapshot::Battery(a), Snapshot::Battery(b)) => diff_battery(a, b, &mut changed),
            (Snapshot::Interface(a), Snapshot::Interface(b)) => diff_interface(a, b, &mut changed),
            _ => changed.push(ChangedField::Status),
        },
        (MonitorStatus::Error(a), MonitorStatus::Error(b)) => {
            if a != b {
                changed.push(ChangedField::Error);
            }
        }
        (MonitorStatus::Error(_), _) | (_, MonitorStatus::Error(_)) => {
            changed.push(ChangedField::Status);
            changed.push(ChangedField::Error);
        }
        _ => changed.push(ChangedField::Status),
    }

    changed
}
