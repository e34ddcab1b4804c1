//! Per-monitor polling configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::alarm::AlarmConfig;
use crate::poller::ResourceId;

/// Default battery poll interval.
pub const BATTERY_POLL_INTERVAL: Duration = Duration::from_secs(9);
/// Default interface poll interval.
pub const INTERFACE_POLL_INTERVAL: Duration = Duration::from_secs(3);
/// Consecutive failed interface polls before slowing down.
pub const INTERFACE_POLLS_IN_ERROR: u32 = 10;
/// Interface poll interval while failing.
pub const INTERFACE_ERROR_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Slow-down policy for a resource that keeps failing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffPolicy {
    /// Consecutive failures before `error_interval` is used.
    pub polls_in_error: u32,
    pub error_interval: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            polls_in_error: INTERFACE_POLLS_IN_ERROR,
            error_interval: INTERFACE_ERROR_POLL_INTERVAL,
        }
    }
}

/// Effective settings of one monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    pub interval: Duration,
    /// Only interface monitors back off.
    pub backoff: Option<BackoffPolicy>,
    /// Only battery monitors have an alarm.
    pub alarm: Option<AlarmConfig>,
}

impl PollConfig {
    /// Defaults for the given kind of resource.
    pub fn for_resource(resource: &ResourceId) -> Self {
        match resource {
            ResourceId::Battery(_) => Self {
                interval: BATTERY_POLL_INTERVAL,
                backoff: None,
                alarm: Some(AlarmConfig::default()),
            },
            ResourceId::Interface(_) => Self {
                interval: INTERFACE_POLL_INTERVAL,
                backoff: Some(BackoffPolicy::default()),
                alarm: None,
            },
        }
    }

    /// Merges caller overrides.
    ///
    /// Options that do not apply to the resource kind (alarm settings on an
    /// interface, backoff settings on a battery) are ignored.
    pub fn apply(&mut self, options: &MonitorOptions) {
        if let Some(secs) = options.interval_secs {
            self.interval = Duration::from_secs(secs.max(1));
        }
        if let Some(alarm) = self.alarm.as_mut() {
            if let Some(minutes) = options.alarm_minutes {
                alarm.minutes = minutes;
            }
            if let Some(command) = &options.alarm_command {
                alarm.command = command.clone();
            }
        }
        if let Some(backoff) = self.backoff.as_mut() {
            if let Some(polls) = options.polls_in_error {
                backoff.polls_in_error = polls.max(1);
            }
            if let Some(secs) = options.error_interval_secs {
                backoff.error_interval = Duration::from_secs(secs.max(1));
            }
        }
    }
}

/// Caller-supplied overrides; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorOptions {
    pub interval_secs: Option<u64>,
    pub alarm_minutes: Option<u32>,
    pub alarm_command: Option<String>,
    pub polls_in_error: Option<u32>,
    pub error_interval_secs: Option<u64>,
}
