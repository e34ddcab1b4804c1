//! Low-battery alarm.
//!
//! The alarm runs an external command on its own thread so the polling loop
//! never waits for it. An [`AlarmGuard`] makes sure at most one command runs
//! at a time: a trigger while one is still running is dropped, not queued.

use std::io;
use std::process::{Command, ExitStatus};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::metrics::BatteryState;

/// Default minutes-left threshold.
pub const DEFAULT_ALARM_MINUTES: u32 = 5;

/// Default alarm command: a desktop notification.
pub const DEFAULT_ALARM_COMMAND: &str = "notify-send \"Battery low\" --icon=battery-caution";

/// Alarm settings of a battery monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmConfig {
    /// Fire when fewer than this many whole minutes remain.
    pub minutes: u32,
    /// Shell command to run.
    pub command: String,
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            minutes: DEFAULT_ALARM_MINUTES,
            command: DEFAULT_ALARM_COMMAND.to_string(),
        }
    }
}

/// Error type for alarm command failures.
#[derive(Debug)]
pub enum AlarmError {
    /// The command could not be started.
    Spawn(io::Error),
    /// The command ran but did not succeed.
    ExitStatus(ExitStatus),
}

impl std::fmt::Display for AlarmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlarmError::Spawn(e) => write!(f, "failed to spawn: {}", e),
            AlarmError::ExitStatus(status) => write!(f, "exited with {}", status),
        }
    }
}

impl std::error::Error for AlarmError {}

impl From<io::Error> for AlarmError {
    fn from(e: io::Error) -> Self {
        AlarmError::Spawn(e)
    }
}

/// Binary permit guarding alarm execution.
#[derive(Debug, Default)]
pub struct AlarmGuard {
    busy: AtomicBool,
}

impl AlarmGuard {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Takes the permit if nobody holds it. Never blocks.
    pub fn try_acquire(self: &Arc<Self>) -> Option<AlarmPermit> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| AlarmPermit {
                guard: Arc::clone(self),
            })
    }

    pub fn is_available(&self) -> bool {
        !self.busy.load(Ordering::Acquire)
    }
}

/// Held while an alarm command runs; releases the guard when dropped.
#[derive(Debug)]
pub struct AlarmPermit {
    guard: Arc<AlarmGuard>,
}

impl Drop for AlarmPermit {
    fn drop(&mut self) {
        self.guard.busy.store(false, Ordering::Release);
    }
}

/// Executes alarm commands.
pub trait CommandRunner: Send + Sync {
    /// Runs `command` to completion.
    fn run(&self, command: &str) -> Result<(), AlarmError>;
}

/// Runs commands through `sh -c`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    fn run(&self, command: &str) -> Result<(), AlarmError> {
        let status = Command::new("sh").arg("-c").arg(command).status()?;
        if status.success() {
            Ok(())
        } else {
            Err(AlarmError::ExitStatus(status))
        }
    }
}

/// Result of a trigger attempt.
#[derive(Debug)]
pub enum TriggerOutcome {
    /// The command was started on a detached thread.
    Started(JoinHandle<()>),
    /// Another alarm is still running; this attempt was dropped.
    Busy,
    /// The alarm thread could not be created.
    Failed,
}

impl TriggerOutcome {
    pub fn is_started(&self) -> bool {
        matches!(self, TriggerOutcome::Started(_))
    }
}

/// Whether the battery state calls for the alarm.
///
/// Requires a discharging battery with a positive rate and a known time
/// estimate below `minutes` (whole minutes, rounded down).
pub fn should_alarm(state: &BatteryState, minutes: u32) -> bool {
    if state.charging || state.rate().is_none_or(|r| r == 0) {
        return false;
    }
    state
        .seconds_remaining
        .is_some_and(|secs| secs / 60 < u64::from(minutes))
}

/// Fires alarm commands under an [`AlarmGuard`].
#[derive(Clone)]
pub struct AlarmTrigger {
    guard: Arc<AlarmGuard>,
    runner: Arc<dyn CommandRunner>,
}

impl Default for AlarmTrigger {
    fn default() -> Self {
        Self::new(Arc::new(ShellRunner))
    }
}

impl AlarmTrigger {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            guard: AlarmGuard::new(),
            runner,
        }
    }

    pub fn guard(&self) -> &Arc<AlarmGuard> {
        &self.guard
    }

    /// Starts `command` unless an alarm is already running.
    pub fn fire(&self, command: &str) -> TriggerOutcome {
        let Some(permit) = self.guard.try_acquire() else {
            return TriggerOutcome::Busy;
        };

        let runner = Arc::clone(&self.runner);
        let command = command.to_string();
        info!("Running alarm command \"{}\"", command);

        let spawned = std::thread::Builder::new()
            .name("battery-alarm".to_string())
            .spawn(move || {
                let _permit = permit;
                if let Err(e) = runner.run(&command) {
                    warn!("Failed to execute alarm command \"{}\": {}", command, e);
                }
            });

        match spawned {
            Ok(handle) => TriggerOutcome::Started(handle),
            Err(e) => {
                warn!("Failed to start alarm thread: {}", e);
                TriggerOutcome::Failed
            }
        }
    }

    /// Fires the configured alarm if `state` crosses the threshold.
    ///
    /// Returns `None` when the threshold is not crossed.
    pub fn check(&self, state: &BatteryState, config: &AlarmConfig) -> Option<TriggerOutcome> {
        should_alarm(state, config.minutes).then(|| self.fire(&config.command))
    }
}
