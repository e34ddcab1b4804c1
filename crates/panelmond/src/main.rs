//! panelmond - Battery and network interface monitor daemon.
//!
//! Polls the selected batteries and interfaces, runs the low-battery alarm
//! and reports every change either as a log line or as a JSON line on stdout.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::{SecondsFormat, Utc};
use clap::Parser;
use serde::Serialize;
use tracing::{Level, debug, info, warn};
use tracing_subscriber::EnvFilter;

use panelmon_core::collector::{RealFs, SourcePaths};
use panelmon_core::fmt::{interface_tooltip, status_label};
use panelmon_core::poller::{MonitorOptions, MonitorStatus, Notification, ResourceId, Scheduler};

/// Battery and network interface monitor daemon.
#[derive(Parser, Debug)]
#[command(name = "panelmond", about = "Battery and network interface monitor", version)]
struct Args {
    /// Battery to monitor (falls back to the first battery found).
    #[arg(short, long, value_name = "NAME")]
    battery: Option<String>,

    /// Network interface to monitor. May be repeated.
    #[arg(short = 'i', long = "interface", value_name = "IFACE")]
    interfaces: Vec<String>,

    /// Poll interval in seconds for every monitor.
    /// Defaults to 9 for batteries and 3 for interfaces.
    #[arg(long)]
    interval: Option<u64>,

    /// Run the alarm command when fewer minutes than this are left.
    #[arg(long, value_name = "MINUTES")]
    alarm_minutes: Option<u32>,

    /// Shell command run by the low-battery alarm.
    #[arg(long, value_name = "CMD")]
    alarm_command: Option<String>,

    /// Path to the power-supply class directory.
    #[arg(long, default_value = "/sys/class/power_supply")]
    power_supply_path: String,

    /// Path to /proc filesystem (for testing/mocking).
    #[arg(long, default_value = "/proc")]
    proc_path: String,

    /// Path to the network class directory.
    #[arg(long, default_value = "/sys/class/net")]
    sys_net_path: String,

    /// Print changes as JSON lines on stdout.
    #[arg(long)]
    json: bool,

    /// List available batteries and interfaces, then exit.
    #[arg(long)]
    list: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn source_paths(&self) -> SourcePaths {
        SourcePaths {
            power_supply: self.power_supply_path.clone(),
            sys_net: self.sys_net_path.clone(),
            proc: self.proc_path.clone(),
        }
    }

    fn monitor_options(&self) -> MonitorOptions {
        MonitorOptions {
            interval_secs: self.interval,
            alarm_minutes: self.alarm_minutes,
            alarm_command: self.alarm_command.clone(),
            ..Default::default()
        }
    }
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Default level is INFO. Use -q for quiet mode (errors only).
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let mut filter = EnvFilter::from_default_env();
    for target in ["panelmond", "panelmon_core"] {
        if let Ok(directive) = format!("{}={}", target, level).parse() {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Picks the resources to monitor.
///
/// Without an explicit selection every battery and every non-loopback
/// interface is monitored.
fn select_resources(args: &Args, batteries: &[String], interfaces: &[String]) -> Vec<ResourceId> {
    if args.battery.is_some() || !args.interfaces.is_empty() {
        return args
            .battery
            .iter()
            .map(|b| ResourceId::Battery(b.clone()))
            .chain(args.interfaces.iter().map(|i| ResourceId::Interface(i.clone())))
            .collect();
    }

    batteries
        .iter()
        .map(|b| ResourceId::Battery(b.clone()))
        .chain(
            interfaces
                .iter()
                .filter(|i| i.as_str() != "lo")
                .map(|i| ResourceId::Interface(i.clone())),
        )
        .collect()
}

/// One line of `--json` output.
#[derive(Serialize)]
struct EventLine<'a> {
    time: String,
    #[serde(flatten)]
    notification: &'a Notification,
}

fn event_line(
    notification: &Notification,
    time: chrono::DateTime<Utc>,
) -> serde_json::Result<String> {
    serde_json::to_string(&EventLine {
        time: time.to_rfc3339_opts(SecondsFormat::Secs, true),
        notification,
    })
}

/// Describes a notification for the log.
fn describe(notification: &Notification) -> String {
    match &notification.status {
        MonitorStatus::Error(e) => format!("{}: error: {}", notification.resource, e),
        status => match status.interface() {
            Some(iface) => interface_tooltip(iface),
            None => format!("{}: {}", notification.resource, status_label(status)),
        },
    }
}

fn report(notification: &Notification, json: bool) {
    if !json {
        info!("{}", describe(notification));
        return;
    }
    match event_line(notification, Utc::now()) {
        Ok(line) => println!("{}", line),
        Err(e) => warn!("Failed to serialize notification: {}", e),
    }
}

fn main() {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    let paths = args.source_paths();
    let mut scheduler = Scheduler::new(RealFs::new(), paths.clone());

    if args.list {
        for battery in scheduler.list_batteries() {
            println!("battery {}", battery);
        }
        for iface in scheduler.list_interfaces() {
            println!("interface {}", iface);
        }
        return;
    }

    info!("panelmond {} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Config: power_supply={}, sys_net={}, proc={}",
        paths.power_supply, paths.sys_net, paths.proc
    );

    let resources = select_resources(
        &args,
        &scheduler.list_batteries(),
        &scheduler.list_interfaces(),
    );
    if resources.is_empty() {
        warn!("Nothing to monitor");
        return;
    }

    let options = args.monitor_options();
    for resource in resources {
        let handle = scheduler.start(resource);
        if let Err(e) = scheduler.configure(handle, options.clone()) {
            warn!("Failed to configure monitor {}: {}", handle, e);
        }
    }

    // Setup graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    }) {
        warn!("Failed to set Ctrl-C handler: {}", e);
    }

    info!("Starting polling loop");

    while running.load(Ordering::SeqCst) {
        for notification in scheduler.run_due(Instant::now()) {
            report(&notification, args.json);
        }

        let Some(deadline) = scheduler.next_deadline() else {
            break;
        };
        debug!(
            "Next poll in {:?}",
            deadline.saturating_duration_since(Instant::now())
        );

        // Sleep with periodic checks for shutdown signal
        let sleep_interval = Duration::from_millis(100);
        while running.load(Ordering::SeqCst) {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining == Duration::ZERO {
                break;
            }
            std::thread::sleep(remaining.min(sleep_interval));
        }
    }

    for handle in scheduler.handles() {
        let _ = scheduler.stop(handle);
    }
    info!("Shutting down...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use panelmon_core::collector::mock::MockFs;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("panelmond").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);
        assert_eq!(args.source_paths(), SourcePaths::default());
        assert_eq!(args.monitor_options(), MonitorOptions::default());
        assert!(!args.json);
    }

    #[test]
    fn test_options_from_flags() {
        let args = parse(&[
            "--battery",
            "BAT1",
            "-i",
            "eth0",
            "--interface",
            "wlan0",
            "--interval",
            "5",
            "--alarm-minutes",
            "10",
            "--alarm-command",
            "beep",
        ]);
        let options = args.monitor_options();
        assert_eq!(options.interval_secs, Some(5));
        assert_eq!(options.alarm_minutes, Some(10));
        assert_eq!(options.alarm_command.as_deref(), Some("beep"));
        assert_eq!(
            select_resources(&args, &[], &[]),
            vec![
                ResourceId::Battery("BAT1".into()),
                ResourceId::Interface("eth0".into()),
                ResourceId::Interface("wlan0".into()),
            ]
        );
    }

    #[test]
    fn test_auto_selection_skips_loopback() {
        let args = parse(&[]);
        let selected = select_resources(
            &args,
            &["BAT0".to_string()],
            &["lo".to_string(), "wlan0".to_string()],
        );
        assert_eq!(
            selected,
            vec![
                ResourceId::Battery("BAT0".into()),
                ResourceId::Interface("wlan0".into()),
            ]
        );
    }

    #[test]
    fn test_event_line_json() {
        let mut scheduler = Scheduler::new(MockFs::wired_ethernet(), SourcePaths::default());
        let handle = scheduler.start(ResourceId::Interface("eth0".into()));
        let notification = scheduler.poll_now(handle).unwrap().unwrap();

        let time = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let line = event_line(&notification, time).unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();

        assert_eq!(value["time"], "2024-05-01T12:00:00Z");
        assert_eq!(value["resource"]["kind"], "interface");
        assert_eq!(value["resource"]["name"], "eth0");
        assert_eq!(value["changed"][0], "status");
        assert_eq!(value["status"]["status"], "ready");
        assert_eq!(value["status"]["value"]["activity"], "idle");
        assert_eq!(describe(&notification), "eth0: Idle");
    }
}
