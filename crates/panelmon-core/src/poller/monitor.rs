//! Per-resource poll state machine.
//!
//! ```text
//!   Idle ──ok──▶ Ready ◀──ok── Error
//!     │            │             ▲
//!     └───err──────┴────err──────┘
//! ```
//!
//! A monitor never leaves `Error` on its own; the next successful poll
//! clears it. Battery monitors re-discover their device after it vanished,
//! so a hot-plugged battery is picked up on the following tick.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::alarm::{AlarmTrigger, CommandRunner, TriggerOutcome};
use crate::collector::traits::FileSystem;
use crate::collector::{
    BatteryReader, InterfaceReader, PollError, PollErrorKind, RawBattery, SourcePaths,
};
use crate::metrics::battery::has_charge_source;
use crate::metrics::{InterfaceState, derive_battery, derive_interface};
use crate::poller::config::{MonitorOptions, PollConfig};
use crate::poller::notify::{Callback, Notification, diff_status};
use crate::poller::{MonitorHandle, MonitorStatus, ResourceId, Snapshot};

struct BatterySource<F: FileSystem> {
    reader: BatteryReader<F>,
    preferred: String,
    /// Device currently bound; `None` until discovered or after it vanished.
    device: Option<String>,
    alarm: AlarmTrigger,
}

impl<F: FileSystem> BatterySource<F> {
    fn sample(&mut self, config: &PollConfig) -> Result<Snapshot, PollError> {
        let raw = match self.bound_read() {
            Err(e) if e.kind == PollErrorKind::ResourceNotFound && self.device.is_some() => {
                info!("Battery {} removed", self.device.as_deref().unwrap_or_default());
                self.device = None;
                // Another battery may already be present.
                self.bound_read()?
            }
            other => other?,
        };

        if !has_charge_source(&raw) {
            return Err(PollError::new(
                PollErrorKind::AttributeUnavailable,
                format!("battery {} reports no charge, energy or capacity", raw.name),
            ));
        }

        let state = derive_battery(raw);
        if let Some(alarm) = &config.alarm {
            match self.alarm.check(&state, alarm) {
                // Alarm threads run detached.
                Some(TriggerOutcome::Started(_)) => {}
                Some(TriggerOutcome::Busy) => {
                    debug!("{}: alarm still running, skipped", state.name())
                }
                // Already logged by the trigger.
                Some(TriggerOutcome::Failed) | None => {}
            }
        }
        Ok(Snapshot::Battery(state))
    }

    fn bound_read(&mut self) -> Result<RawBattery, PollError> {
        if self.device.is_none() {
            self.device = self.reader.discover(&self.preferred);
            if let Some(name) = &self.device {
                info!("Monitoring battery {}", name);
            }
        }
        match &self.device {
            Some(name) => self.reader.read(name),
            None => Err(PollError::not_found(format!(
                "battery {} not found",
                self.preferred
            ))),
        }
    }
}

struct InterfaceSource<F: FileSystem + Clone> {
    reader: InterfaceReader<F>,
    name: String,
    /// Last successfully derived state, kept across errors so the next
    /// delta is taken against the last good counters.
    last: Option<InterfaceState>,
}

impl<F: FileSystem + Clone> InterfaceSource<F> {
    fn sample(&mut self) -> Result<Snapshot, PollError> {
        let raw = self.reader.read(&self.name)?;
        let state = derive_interface(self.last.as_ref(), raw);
        debug!(
            "Interface {}: {:?}, counters {:?}",
            self.name, state.activity, state.counters
        );
        self.last = Some(state.clone());
        Ok(Snapshot::Interface(state))
    }
}

enum Source<F: FileSystem + Clone> {
    Battery(BatterySource<F>),
    Interface(InterfaceSource<F>),
}

/// One monitored resource: its reader, derived status, subscribers and timer.
pub struct Monitor<F: FileSystem + Clone> {
    handle: MonitorHandle,
    resource: ResourceId,
    source: Source<F>,
    config: PollConfig,
    status: MonitorStatus,
    subscribers: Vec<Callback>,
    consecutive_failures: u32,
    backing_off: bool,
    next_due: Instant,
}

impl<F: FileSystem + Clone> Monitor<F> {
    /// Creates a monitor that is due immediately.
    pub fn new(
        handle: MonitorHandle,
        resource: ResourceId,
        fs: F,
        paths: &SourcePaths,
        runner: Arc<dyn CommandRunner>,
        now: Instant,
    ) -> Self {
        let source = match &resource {
            ResourceId::Battery(name) => Source::Battery(BatterySource {
                reader: BatteryReader::new(fs, paths),
                preferred: name.clone(),
                device: None,
                alarm: AlarmTrigger::new(runner),
            }),
            ResourceId::Interface(name) => Source::Interface(InterfaceSource {
                reader: InterfaceReader::new(fs, paths),
                name: name.clone(),
                last: None,
            }),
        };

        Self {
            handle,
            config: PollConfig::for_resource(&resource),
            resource,
            source,
            status: MonitorStatus::Idle,
            subscribers: Vec::new(),
            consecutive_failures: 0,
            backing_off: false,
            next_due: now,
        }
    }

    pub fn handle(&self) -> MonitorHandle {
        self.handle
    }

    pub fn resource(&self) -> &ResourceId {
        &self.resource
    }

    pub fn status(&self) -> &MonitorStatus {
        &self.status
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    pub fn next_due(&self) -> Instant {
        self.next_due
    }

    /// Alarm trigger of a battery monitor.
    pub fn alarm(&self) -> Option<&AlarmTrigger> {
        match &self.source {
            Source::Battery(b) => Some(&b.alarm),
            Source::Interface(_) => None,
        }
    }

    /// Interval used to schedule the next tick.
    pub fn current_interval(&self) -> Duration {
        match (&self.config.backoff, self.backing_off) {
            (Some(policy), true) => policy.error_interval,
            _ => self.config.interval,
        }
    }

    pub fn is_backing_off(&self) -> bool {
        self.backing_off
    }

    pub fn subscribe(&mut self, callback: Callback) {
        self.subscribers.push(callback);
    }

    /// Merges new options; they apply from the next scheduled tick on.
    pub fn configure(&mut self, options: &MonitorOptions) {
        self.config.apply(options);
        debug!("{}: configuration updated: {:?}", self.resource, self.config);
    }

    fn record_success(&mut self) {
        self.consecutive_failures = 0;
        if self.backing_off {
            info!("{}: recovered, restoring poll interval", self.resource);
            self.backing_off = false;
        }
    }

    fn record_failure(&mut self) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        let Some(policy) = &self.config.backoff else {
            return;
        };
        if !self.backing_off && self.consecutive_failures >= policy.polls_in_error {
            info!(
                "{}: {} polls in error, slowing down to {:?}",
                self.resource, self.consecutive_failures, policy.error_interval
            );
            self.backing_off = true;
        }
    }

    /// Runs one poll-derive-notify cycle and schedules the next one.
    ///
    /// Returns the notification delivered to subscribers, if any value changed.
    pub fn tick(&mut self, now: Instant) -> Option<Notification> {
        let result = match &mut self.source {
            Source::Battery(b) => b.sample(&self.config),
            Source::Interface(i) => i.sample(),
        };

        let status = match result {
            Ok(snapshot) => {
                self.record_success();
                MonitorStatus::Ready(snapshot)
            }
            Err(e) => {
                debug!("{}: poll failed: {}", self.resource, e);
                self.record_failure();
                MonitorStatus::Error(e)
            }
        };

        let changed = diff_status(&self.status, &status);
        if matches!(
            (&self.status, &status),
            (MonitorStatus::Error(_), MonitorStatus::Ready(_))
        ) {
            info!("{}: error cleared", self.resource);
        } else if let MonitorStatus::Error(e) = &status
            && !changed.is_empty()
        {
            info!("{}: {}", self.resource, e);
        }

        self.status = status;
        self.next_due = now + self.current_interval();

        if changed.is_empty() {
            return None;
        }

        let notification = Notification {
            handle: self.handle,
            resource: self.resource.clone(),
            changed,
            status: self.status.clone(),
        };
        for callback in &mut self.subscribers {
            callback(&notification);
        }
        Some(notification)
    }
}
