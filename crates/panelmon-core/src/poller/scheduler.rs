//! Single-threaded driver for all monitors.
//!
//! The scheduler keeps no clock of its own: callers pass `now` to
//! [`Scheduler::run_due`] and sleep until [`Scheduler::next_deadline`].
//! Ticks run in handle order, so output is deterministic for a given time.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::alarm::{AlarmTrigger, CommandRunner, ShellRunner};
use crate::collector::traits::FileSystem;
use crate::collector::{BatteryReader, InterfaceReader, SourcePaths};
use crate::poller::config::MonitorOptions;
use crate::poller::monitor::Monitor;
use crate::poller::notify::{Callback, Notification};
use crate::poller::{MonitorError, MonitorHandle, MonitorStatus, ResourceId};

/// Owns the monitors and decides which one runs when.
pub struct Scheduler<F: FileSystem + Clone> {
    fs: F,
    paths: SourcePaths,
    runner: Arc<dyn CommandRunner>,
    monitors: BTreeMap<MonitorHandle, Monitor<F>>,
    next_handle: u64,
}

impl<F: FileSystem + Clone> Scheduler<F> {
    pub fn new(fs: F, paths: SourcePaths) -> Self {
        Self {
            fs,
            paths,
            runner: Arc::new(ShellRunner),
            monitors: BTreeMap::new(),
            next_handle: 1,
        }
    }

    /// Replaces the runner used for alarm commands of monitors started later.
    pub fn with_runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn paths(&self) -> &SourcePaths {
        &self.paths
    }

    /// Starts monitoring `resource`. The first poll is due immediately.
    pub fn start(&mut self, resource: ResourceId) -> MonitorHandle {
        self.start_at(resource, Instant::now())
    }

    /// Like [`Scheduler::start`], with an explicit first deadline.
    pub fn start_at(&mut self, resource: ResourceId, now: Instant) -> MonitorHandle {
        let handle = MonitorHandle(self.next_handle);
        self.next_handle += 1;

        info!("Starting monitor {} for {}", handle, resource);
        let monitor = Monitor::new(
            handle,
            resource,
            self.fs.clone(),
            &self.paths,
            Arc::clone(&self.runner),
            now,
        );
        self.monitors.insert(handle, monitor);
        handle
    }

    fn monitor(&self, handle: MonitorHandle) -> Result<&Monitor<F>, MonitorError> {
        self.monitors
            .get(&handle)
            .ok_or(MonitorError::UnknownHandle(handle))
    }

    fn monitor_mut(&mut self, handle: MonitorHandle) -> Result<&mut Monitor<F>, MonitorError> {
        self.monitors
            .get_mut(&handle)
            .ok_or(MonitorError::UnknownHandle(handle))
    }

    /// Last status of the monitor, `None` for an unknown handle.
    pub fn status(&self, handle: MonitorHandle) -> Option<&MonitorStatus> {
        self.monitors.get(&handle).map(Monitor::status)
    }

    pub fn resource(&self, handle: MonitorHandle) -> Option<&ResourceId> {
        self.monitors.get(&handle).map(Monitor::resource)
    }

    /// Handles of all running monitors, in start order.
    pub fn handles(&self) -> Vec<MonitorHandle> {
        self.monitors.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    /// Registers a callback invoked on every change of the monitor.
    pub fn subscribe(
        &mut self,
        handle: MonitorHandle,
        callback: Callback,
    ) -> Result<(), MonitorError> {
        self.monitor_mut(handle)?.subscribe(callback);
        Ok(())
    }

    /// Merges `options` into the monitor's configuration.
    ///
    /// The pending deadline is kept; a new interval applies from the next tick.
    pub fn configure(
        &mut self,
        handle: MonitorHandle,
        options: MonitorOptions,
    ) -> Result<(), MonitorError> {
        self.monitor_mut(handle)?.configure(&options);
        Ok(())
    }

    /// Stops and drops the monitor. A running alarm command is not interrupted.
    pub fn stop(&mut self, handle: MonitorHandle) -> Result<(), MonitorError> {
        let monitor = self
            .monitors
            .remove(&handle)
            .ok_or(MonitorError::UnknownHandle(handle))?;
        info!("Stopped monitor {} for {}", handle, monitor.resource());
        Ok(())
    }

    /// Polls the monitor right away and restarts its timer.
    pub fn poll_now(
        &mut self,
        handle: MonitorHandle,
    ) -> Result<Option<Notification>, MonitorError> {
        Ok(self.monitor_mut(handle)?.tick(Instant::now()))
    }

    /// Ticks every monitor whose deadline is at or before `now`.
    pub fn run_due(&mut self, now: Instant) -> Vec<Notification> {
        let mut notifications = Vec::new();
        for monitor in self.monitors.values_mut() {
            if monitor.next_due() <= now {
                if let Some(notification) = monitor.tick(now) {
                    notifications.push(notification);
                }
            }
        }
        if !notifications.is_empty() {
            debug!("{} monitor(s) changed", notifications.len());
        }
        notifications
    }

    /// Earliest pending deadline, `None` without monitors.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.monitors.values().map(Monitor::next_due).min()
    }

    /// Interval the monitor is currently scheduled with (backoff included).
    pub fn current_interval(&self, handle: MonitorHandle) -> Result<Duration, MonitorError> {
        Ok(self.monitor(handle)?.current_interval())
    }

    /// Alarm trigger of a battery monitor.
    pub fn alarm(&self, handle: MonitorHandle) -> Option<&AlarmTrigger> {
        self.monitors.get(&handle).and_then(Monitor::alarm)
    }

    /// Batteries present right now.
    pub fn list_batteries(&self) -> Vec<String> {
        BatteryReader::new(self.fs.clone(), &self.paths).list()
    }

    /// Interfaces present right now.
    pub fn list_interfaces(&self) -> Vec<String> {
        InterfaceReader::new(self.fs.clone(), &self.paths).list()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::AlarmError;
    use crate::collector::mock::{MockFs, net_dev_line};
    use crate::collector::PollErrorKind;
    use crate::metrics::Activity;
    use crate::poller::ChangedField;
    use std::sync::{Mutex, mpsc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingRunner {
        commands: Mutex<Vec<String>>,
        runs: AtomicUsize,
    }

    impl CommandRunner for CountingRunner {
        fn run(&self, command: &str) -> Result<(), AlarmError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            self.commands.lock().unwrap().push(command.to_string());
            Ok(())
        }
    }

    fn wait_for_alarm(scheduler: &Scheduler<MockFs>, handle: MonitorHandle) {
        let guard = Arc::clone(scheduler.alarm(handle).unwrap().guard());
        for _ in 0..500 {
            if guard.is_available() {
                return;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        panic!("alarm thread did not finish");
    }

    #[test]
    fn test_start_polls_immediately() {
        let fs = MockFs::wired_ethernet();
        let mut scheduler = Scheduler::new(fs, SourcePaths::default());
        let t0 = Instant::now();
        let handle = scheduler.start_at(ResourceId::Interface("eth0".into()), t0);
        assert_eq!(scheduler.status(handle), Some(&MonitorStatus::Idle));
        assert_eq!(scheduler.next_deadline(), Some(t0));

        let notifications = scheduler.run_due(t0);
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].handle, handle);
        assert_eq!(
            scheduler.status(handle).and_then(MonitorStatus::interface).map(|s| s.activity),
            Some(Activity::Idle)
        );
        assert_eq!(scheduler.next_deadline(), Some(t0 + Duration::from_secs(3)));
    }

    #[test]
    fn test_run_due_skips_pending_monitors() {
        let fs = MockFs::laptop_discharging();
        fs.set_net_dev(&[net_dev_line("eth0", 1, 1, 1, 1)]);
        fs.add_file("/sys/class/net/eth0/flags", "0x1043\n");

        let mut scheduler = Scheduler::new(fs.clone(), SourcePaths::default());
        let t0 = Instant::now();
        let battery = scheduler.start_at(ResourceId::Battery("BAT0".into()), t0);
        let eth0 = scheduler.start_at(ResourceId::Interface("eth0".into()), t0);
        assert_eq!(scheduler.run_due(t0).len(), 2);

        fs.set_net_dev(&[net_dev_line("eth0", 2, 2, 1, 1)]);
        let notifications = scheduler.run_due(t0 + Duration::from_secs(3));
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].handle, eth0);
        assert_eq!(notifications[0].changed, vec![ChangedField::Activity]);

        // Battery is due at 9 s, interface again at 6 s.
        assert_eq!(scheduler.next_deadline(), Some(t0 + Duration::from_secs(6)));
        scheduler.stop(eth0).unwrap();
        assert_eq!(scheduler.next_deadline(), Some(t0 + Duration::from_secs(9)));
        assert_eq!(scheduler.handles(), vec![battery]);
    }

    #[test]
    fn test_unknown_handles() {
        let mut scheduler = Scheduler::new(MockFs::new(), SourcePaths::default());
        let missing = MonitorHandle(42);
        assert_eq!(scheduler.status(missing), None);
        assert_eq!(scheduler.stop(missing), Err(MonitorError::UnknownHandle(missing)));
        assert!(scheduler.poll_now(missing).is_err());
        assert!(scheduler.subscribe(missing, Box::new(|_: &Notification| {})).is_err());
        assert!(
            scheduler
                .configure(missing, MonitorOptions::default())
                .is_err()
        );
        assert_eq!(scheduler.next_deadline(), None);
    }

    #[test]
    fn test_stopped_handle_is_not_reused() {
        let mut scheduler = Scheduler::new(MockFs::wired_ethernet(), SourcePaths::default());
        let first = scheduler.start(ResourceId::Interface("eth0".into()));
        scheduler.stop(first).unwrap();
        let second = scheduler.start(ResourceId::Interface("eth0".into()));
        assert_ne!(first, second);
        assert_eq!(scheduler.status(first), None);
    }

    #[test]
    fn test_configure_changes_interval_from_next_tick() {
        let mut scheduler = Scheduler::new(MockFs::wired_ethernet(), SourcePaths::default());
        let t0 = Instant::now();
        let handle = scheduler.start_at(ResourceId::Interface("eth0".into()), t0);
        scheduler.run_due(t0);

        scheduler
            .configure(
                handle,
                MonitorOptions {
                    interval_secs: Some(1),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(scheduler.next_deadline(), Some(t0 + Duration::from_secs(3)));

        let t1 = t0 + Duration::from_secs(3);
        scheduler.run_due(t1);
        assert_eq!(scheduler.next_deadline(), Some(t1 + Duration::from_secs(1)));
        assert_eq!(scheduler.current_interval(handle), Ok(Duration::from_secs(1)));
    }

    #[test]
    fn test_interface_backoff_and_recovery() {
        let fs = MockFs::wired_ethernet();
        let mut scheduler = Scheduler::new(fs.clone(), SourcePaths::default());
        let mut now = Instant::now();
        let handle = scheduler.start_at(ResourceId::Interface("eth0".into()), now);

        fs.remove_file("/proc/net/dev");
        let first = scheduler.run_due(now);
        assert_eq!(
            scheduler.status(handle).and_then(MonitorStatus::error).map(|e| e.kind),
            Some(PollErrorKind::Statistics)
        );
        assert_eq!(first[0].changed, vec![ChangedField::Status, ChangedField::Error]);

        for _ in 1..10 {
            now += scheduler.current_interval(handle).unwrap();
            // Same error every time: no repeated notification.
            assert!(scheduler.run_due(now).is_empty());
        }
        assert_eq!(scheduler.current_interval(handle), Ok(Duration::from_secs(30)));

        fs.set_net_dev(&[net_dev_line("eth0", 10, 10, 10, 10)]);
        now += Duration::from_secs(30);
        let recovered = scheduler.run_due(now);
        assert_eq!(recovered.len(), 1);
        assert!(scheduler.status(handle).and_then(MonitorStatus::interface).is_some());
        assert_eq!(scheduler.current_interval(handle), Ok(Duration::from_secs(3)));
    }

    #[test]
    fn test_low_battery_runs_alarm_once_per_tick() {
        let fs = MockFs::laptop_discharging();
        // 3600 * 50 / 1000 = 180 s left
        fs.add_power_supply("/sys/class/power_supply", "BAT0", &[("charge_now", "50000")]);

        let runner = Arc::new(CountingRunner::default());
        let mut scheduler =
            Scheduler::new(fs.clone(), SourcePaths::default()).with_runner(runner.clone());
        let t0 = Instant::now();
        let handle = scheduler.start_at(ResourceId::Battery("BAT0".into()), t0);
        scheduler
            .configure(
                handle,
                MonitorOptions {
                    alarm_command: Some("xmessage low".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        scheduler.run_due(t0);
        wait_for_alarm(&scheduler, handle);
        assert_eq!(runner.runs.load(Ordering::SeqCst), 1);
        assert_eq!(runner.commands.lock().unwrap()[0], "xmessage low");

        // Plugged in: no further alarm.
        fs.add_power_supply(
            "/sys/class/power_supply",
            "BAT0",
            &[("status", "Charging"), ("current_now", "2000000")],
        );
        scheduler.run_due(t0 + Duration::from_secs(9));
        wait_for_alarm(&scheduler, handle);
        assert_eq!(runner.runs.load(Ordering::SeqCst), 1);
    }

    /// Blocks every run until the test releases it.
    struct GatedRunner {
        runs: AtomicUsize,
        release: Mutex<mpsc::Receiver<()>>,
    }

    impl CommandRunner for GatedRunner {
        fn run(&self, _command: &str) -> Result<(), AlarmError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            let _ = self.release.lock().unwrap().recv();
            Ok(())
        }
    }

    #[test]
    fn test_alarm_still_running_skips_trigger() {
        let fs = MockFs::laptop_discharging();
        fs.add_power_supply("/sys/class/power_supply", "BAT0", &[("charge_now", "50000")]);

        let (release, gate) = mpsc::channel();
        let runner = Arc::new(GatedRunner {
            runs: AtomicUsize::new(0),
            release: Mutex::new(gate),
        });
        let mut scheduler =
            Scheduler::new(fs, SourcePaths::default()).with_runner(runner.clone());
        let t0 = Instant::now();
        let handle = scheduler.start_at(ResourceId::Battery("BAT0".into()), t0);
        scheduler
            .configure(
                handle,
                MonitorOptions {
                    alarm_command: Some("xmessage low".into()),
                    ..Default::default()
                },
            )
            .unwrap();

        scheduler.run_due(t0);
        // Still low, but the first command has not returned yet.
        scheduler.run_due(t0 + Duration::from_secs(9));
        assert!(scheduler.status(handle).and_then(MonitorStatus::battery).is_some());

        release.send(()).unwrap();
        wait_for_alarm(&scheduler, handle);
        assert_eq!(runner.runs.load(Ordering::SeqCst), 1);

        release.send(()).unwrap();
        scheduler.run_due(t0 + Duration::from_secs(18));
        wait_for_alarm(&scheduler, handle);
        assert_eq!(runner.runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_list_resources() {
        let fs = MockFs::laptop_discharging();
        fs.set_net_dev(&[net_dev_line("lo", 1, 1, 1, 1), net_dev_line("wlan0", 1, 1, 1, 1)]);
        let scheduler = Scheduler::new(fs, SourcePaths::default());
        assert_eq!(scheduler.list_batteries(), vec!["BAT0".to_string()]);
        assert_eq!(
            scheduler.list_interfaces(),
            vec!["lo".to_string(), "wlan0".to_string()]
        );
    }
}
