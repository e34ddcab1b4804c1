//! Text helpers for panel tooltips and labels.
//!
//! Pure functions over derived state; nothing here polls or caches.

use crate::metrics::{Activity, BatteryState, InterfaceState};
use crate::poller::MonitorStatus;

// ---------------------------------------------------------------------------
// Durations and sizes
// ---------------------------------------------------------------------------

/// Format seconds as `H:MM`, dropping leftover seconds.
///
/// `4500` → `"1:15"`, `59` → `"0:00"`
pub fn format_duration_hm(secs: u64) -> String {
    format!("{}:{:02}", secs / 3600, (secs % 3600) / 60)
}

/// Format byte count as human-readable size.
///
/// `"1.5 GiB"`, `"100.3 MiB"`, `"50.0 KiB"`, `"512 B"`
pub fn format_bytes(bytes: u64) -> String {
    let f = bytes as f64;
    if bytes >= 1024 * 1024 * 1024 {
        format!("{:.1} GiB", f / (1024.0 * 1024.0 * 1024.0))
    } else if bytes >= 1024 * 1024 {
        format!("{:.1} MiB", f / (1024.0 * 1024.0))
    } else if bytes >= 1024 {
        format!("{:.1} KiB", f / 1024.0)
    } else {
        format!("{} B", bytes)
    }
}

// ---------------------------------------------------------------------------
// Battery
// ---------------------------------------------------------------------------

/// One-line battery tooltip.
///
/// Charging: `"Battery: 57% charged, 1:05 until full"`.
/// Discharging: `"Battery: 57% charged, 1:05 left"`. Without a time estimate,
/// or when full, only the percentage is shown.
pub fn battery_tooltip(state: &BatteryState) -> String {
    let head = format!("Battery: {}% charged", state.percentage);
    match state.seconds_remaining {
        Some(secs) if state.charging => {
            format!("{}, {} until full", head, format_duration_hm(secs))
        }
        Some(secs) if state.percentage < 100 => {
            format!("{}, {} left", head, format_duration_hm(secs))
        }
        _ => head,
    }
}

/// Extended details: one line per known raw attribute.
pub fn battery_details(state: &BatteryState) -> Vec<String> {
    let raw = &state.raw;
    let rows: [(&str, Option<u64>, &str); 8] = [
        ("Energy full design", raw.energy_full_design, "mWh"),
        ("Energy full", raw.energy_full, "mWh"),
        ("Energy now", raw.energy_now, "mWh"),
        ("Power now", raw.power_now, "mW"),
        ("Charge full design", raw.charge_full_design, "mAh"),
        ("Charge full", raw.charge_full, "mAh"),
        ("Charge now", raw.charge_now, "mAh"),
        ("Current now", raw.current_now, "mA"),
    ];

    let mut lines: Vec<String> = rows
        .iter()
        .filter_map(|(label, value, unit)| value.map(|v| format!("{}: {} {}", label, v, unit)))
        .collect();
    if let Some(mv) = raw.voltage_now {
        lines.push(format!("Voltage: {:.3} V", mv as f64 / 1000.0));
    }
    lines
}

/// Tooltip followed by the extended details, newline-separated.
pub fn battery_tooltip_extended(state: &BatteryState) -> String {
    let mut text = battery_tooltip(state);
    for line in battery_details(state) {
        text.push_str("\n  ");
        text.push_str(&line);
    }
    text
}

// ---------------------------------------------------------------------------
// Interfaces
// ---------------------------------------------------------------------------

pub fn activity_label(activity: Activity) -> &'static str {
    match activity {
        Activity::Disconnected => "Disconnected",
        Activity::Idle => "Idle",
        Activity::Tx => "Sending",
        Activity::Rx => "Receiving",
        Activity::TxRx => "Sending/Receiving",
    }
}

/// Short label for any monitor status; errors read as `"Error"`.
pub fn status_label(status: &MonitorStatus) -> String {
    match status {
        MonitorStatus::Idle => "Idle".to_string(),
        MonitorStatus::Error(_) => "Error".to_string(),
        MonitorStatus::Ready(_) => match (status.battery(), status.interface()) {
            (Some(battery), _) => battery_tooltip(battery),
            (_, Some(iface)) => activity_label(iface.activity).to_string(),
            _ => String::new(),
        },
    }
}

/// Interface tooltip: name, activity and, for wireless links, the signal.
pub fn interface_tooltip(state: &InterfaceState) -> String {
    let mut text = format!("{}: {}", state.name, activity_label(state.activity));
    if state.wireless {
        text.push_str(&format!(", signal {}%", state.signal_strength));
    }
    text
}

/// Address and counter lines for an interface details view.
pub fn interface_details(state: &InterfaceState) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(addr) = &state.hw_address {
        lines.push(format!("Hardware address: {}", addr));
    }
    if let Some(inet4) = &state.inet4 {
        let rows = [
            ("IP address", inet4.address),
            ("Destination", inet4.destination),
            ("Broadcast", inet4.broadcast),
            ("Netmask", inet4.netmask),
        ];
        for (label, addr) in rows {
            if let Some(addr) = addr {
                lines.push(format!("{}: {}", label, addr));
            }
        }
    }
    if let Some(c) = &state.counters {
        lines.push(format!(
            "Received: {} packets, {}",
            c.in_packets,
            format_bytes(c.in_bytes)
        ));
        lines.push(format!(
            "Sent: {} packets, {}",
            c.out_packets,
            format_bytes(c.out_bytes)
        ));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::interface::InterfaceCounters;
    use crate::collector::procfs::Ipv4Details;
    use std::net::Ipv4Addr;
    use crate::collector::{PollError, RawBattery};
    use crate::metrics::{SignalBucket, derive_battery};
    use crate::poller::Snapshot;

    fn battery(status: &str, charge_now: u64, current_now: u64) -> BatteryState {
        derive_battery(RawBattery {
            name: "BAT0".to_string(),
            status: status.to_string(),
            charge_now: Some(charge_now),
            charge_full: Some(5000),
            current_now: Some(current_now),
            voltage_now: Some(11800),
            ..Default::default()
        })
    }

    fn iface(activity: Activity, link: Option<u8>) -> InterfaceState {
        InterfaceState {
            name: "wlan0".to_string(),
            counters: Some(InterfaceCounters {
                in_packets: 4000,
                out_packets: 3000,
                in_bytes: 5_000_000,
                out_bytes: 700,
            }),
            activity,
            wireless: link.is_some(),
            signal_strength: link.unwrap_or(0),
            signal: SignalBucket::from_strength(link.unwrap_or(0)),
            hw_address: Some("a0:88:b4:01:02:03".to_string()),
            inet4: None,
        }
    }

    #[test]
    fn test_format_duration_hm() {
        assert_eq!(format_duration_hm(0), "0:00");
        assert_eq!(format_duration_hm(59), "0:00");
        assert_eq!(format_duration_hm(3900), "1:05");
        assert_eq!(format_duration_hm(36000), "10:00");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KiB");
        assert_eq!(format_bytes(5_000_000), "4.8 MiB");
    }

    #[test]
    fn test_battery_tooltips() {
        // 3600 * 2500 / 1000 = 9000 s
        assert_eq!(
            battery_tooltip(&battery("Discharging", 2500, 1000)),
            "Battery: 50% charged, 2:30 left"
        );
        // 3600 * 2500 / 2000 = 4500 s
        assert_eq!(
            battery_tooltip(&battery("Charging", 2500, 2000)),
            "Battery: 50% charged, 1:15 until full"
        );
        assert_eq!(
            battery_tooltip(&battery("Full", 5000, 0)),
            "Battery: 100% charged"
        );
    }

    #[test]
    fn test_battery_details_lists_known_fields() {
        let lines = battery_details(&battery("Discharging", 2500, 1000));
        assert_eq!(
            lines,
            vec![
                "Charge full: 5000 mAh",
                "Charge now: 2500 mAh",
                "Current now: 1000 mA",
                "Voltage: 11.800 V",
            ]
        );
        let text = battery_tooltip_extended(&battery("Discharging", 2500, 1000));
        assert!(text.starts_with("Battery: 50% charged"));
        assert_eq!(text.lines().count(), 5);
    }

    #[test]
    fn test_labels() {
        assert_eq!(activity_label(Activity::TxRx), "Sending/Receiving");
        assert_eq!(status_label(&MonitorStatus::Idle), "Idle");
        assert_eq!(
            status_label(&MonitorStatus::Error(PollError::not_found("gone"))),
            "Error"
        );
        assert_eq!(
            status_label(&MonitorStatus::Ready(Snapshot::Interface(iface(
                Activity::Rx,
                None
            )))),
            "Receiving"
        );
    }

    #[test]
    fn test_interface_text() {
        assert_eq!(
            interface_tooltip(&iface(Activity::Idle, Some(88))),
            "wlan0: Idle, signal 88%"
        );
        assert_eq!(interface_tooltip(&iface(Activity::Tx, None)), "wlan0: Sending");
        let lines = interface_details(&iface(Activity::Idle, None));
        assert_eq!(lines[0], "Hardware address: a0:88:b4:01:02:03");
        assert_eq!(lines[1], "Received: 4000 packets, 4.8 MiB");
        assert_eq!(lines[2], "Sent: 3000 packets, 700 B");
    }

    #[test]
    fn test_interface_details_with_ipv4() {
        let mut state = iface(Activity::Idle, Some(54));
        state.inet4 = Some(Ipv4Details {
            address: Some(Ipv4Addr::new(192, 168, 2, 17)),
            destination: None,
            broadcast: Some(Ipv4Addr::new(192, 168, 2, 255)),
            netmask: Some(Ipv4Addr::new(255, 255, 255, 0)),
        });
        let lines = interface_details(&state);
        assert_eq!(
            &lines[1..4],
            [
                "IP address: 192.168.2.17",
                "Broadcast: 192.168.2.255",
                "Netmask: 255.255.255.0",
            ]
        );
        assert_eq!(lines.len(), 6);
    }
}
