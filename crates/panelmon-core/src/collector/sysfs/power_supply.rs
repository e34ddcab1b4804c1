//! Battery attribute reader for `/sys/class/power_supply/<name>/`.
//!
//! Every attribute is read on its own. A missing or unparsable file only
//! blanks that one field; the sample as a whole fails only when the device
//! directory itself is gone.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::collector::SourcePaths;
use crate::collector::error::PollError;
use crate::collector::traits::FileSystem;

/// Raw attributes of one power-supply device.
///
/// Energy/charge/power/current/voltage values are in milli-units
/// (mWh, mAh, mW, mA, mV); the kernel exports micro-units.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawBattery {
    /// Device directory name (BAT0, CMB1, ...).
    pub name: String,
    pub charge_now: Option<u64>,
    pub charge_full: Option<u64>,
    pub charge_full_design: Option<u64>,
    pub energy_now: Option<u64>,
    pub energy_full: Option<u64>,
    pub energy_full_design: Option<u64>,
    pub current_now: Option<u64>,
    pub power_now: Option<u64>,
    pub voltage_now: Option<u64>,
    /// Percentage reported by the driver itself (`capacity`), not scaled.
    pub capacity: Option<u64>,
    /// Content of the `type` attribute.
    pub kind: Option<String>,
    /// `status` (or `state`) attribute; inferred as "available"/"unavailable"
    /// when the driver exposes neither.
    pub status: String,
}

impl RawBattery {
    /// Whether the device reports itself as a battery.
    ///
    /// Devices without a `type` attribute are assumed to be batteries.
    pub fn is_battery(&self) -> bool {
        is_battery_kind(self.kind.as_deref())
    }
}

fn is_battery_kind(kind: Option<&str>) -> bool {
    kind.is_none_or(|k| k.eq_ignore_ascii_case("battery"))
}

/// Parses a micro-unit attribute and converts it to milli-units.
fn parse_milli(content: &str) -> Option<i64> {
    content.trim().parse::<i64>().ok().map(|v| v / 1000)
}

/// Plain capacities: negative values carry no information.
fn capacity_value(value: Option<i64>) -> Option<u64> {
    value.and_then(|v| u64::try_from(v).ok())
}

/// Rates (`current_now`, `power_now`).
///
/// Some drivers report -1 (after scaling) when the rate is unknown, others
/// report discharge as a negative rate. -1 is treated as unavailable and
/// anything below it is taken by absolute value.
fn rate_value(value: Option<i64>) -> Option<u64> {
    match value? {
        -1 => None,
        v if v < -1 => Some(v.unsigned_abs()),
        v => Some(v as u64),
    }
}

/// Reads battery attributes through a [`FileSystem`].
pub struct BatteryReader<F: FileSystem> {
    fs: F,
    root: PathBuf,
}

impl<F: FileSystem> BatteryReader<F> {
    /// Creates a reader rooted at `paths.power_supply`.
    pub fn new(fs: F, paths: &SourcePaths) -> Self {
        Self {
            fs,
            root: PathBuf::from(&paths.power_supply),
        }
    }

    /// Returns the directory of the named device.
    pub fn device_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn read_attr(&self, dir: &Path, attr: &str) -> Option<String> {
        self.fs
            .read_to_string(&dir.join(attr))
            .ok()
            .map(|s| s.trim().to_string())
    }

    fn read_milli(&self, dir: &Path, attr: &str) -> Option<i64> {
        self.read_attr(dir, attr).and_then(|s| parse_milli(&s))
    }

    /// Reads all attributes of the named device.
    ///
    /// Fails with `ResourceNotFound` only if the device directory is missing.
    pub fn read(&self, name: &str) -> Result<RawBattery, PollError> {
        let dir = self.device_path(name);
        if !self.fs.exists(&dir) {
            return Err(PollError::not_found(format!(
                "power supply {} not found in {}",
                name,
                self.root.display()
            )));
        }

        let mut raw = RawBattery {
            name: name.to_string(),
            charge_now: capacity_value(self.read_milli(&dir, "charge_now")),
            energy_now: capacity_value(self.read_milli(&dir, "energy_now")),
            current_now: rate_value(self.read_milli(&dir, "current_now")),
            power_now: rate_value(self.read_milli(&dir, "power_now")),
            charge_full: capacity_value(self.read_milli(&dir, "charge_full")),
            energy_full: capacity_value(self.read_milli(&dir, "energy_full")),
            charge_full_design: capacity_value(self.read_milli(&dir, "charge_full_design")),
            energy_full_design: capacity_value(self.read_milli(&dir, "energy_full_design")),
            voltage_now: capacity_value(self.read_milli(&dir, "voltage_now")),
            capacity: self
                .read_attr(&dir, "capacity")
                .and_then(|s| s.parse::<u64>().ok()),
            kind: self.read_attr(&dir, "type"),
            status: String::new(),
        };

        raw.status = match self
            .read_attr(&dir, "status")
            .or_else(|| self.read_attr(&dir, "state"))
        {
            Some(status) => status,
            None => {
                let any_capacity = raw.charge_now.is_some()
                    || raw.energy_now.is_some()
                    || raw.charge_full.is_some()
                    || raw.energy_full.is_some();
                if any_capacity { "available" } else { "unavailable" }.to_string()
            }
        };

        Ok(raw)
    }

    /// Whether the named device exists and is a battery.
    pub fn is_battery(&self, name: &str) -> bool {
        let dir = self.device_path(name);
        self.fs.exists(&dir) && is_battery_kind(self.read_attr(&dir, "type").as_deref())
    }

    /// Lists all power-supply devices that are batteries, sorted by name.
    pub fn list(&self) -> Vec<String> {
        let entries = match self.fs.read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Cannot list {}: {}", self.root.display(), e);
                return Vec::new();
            }
        };

        let mut names: Vec<String> = entries
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(str::to_string))
            .filter(|name| self.is_battery(name))
            .collect();
        names.sort();
        names
    }

    /// Picks the battery to monitor.
    ///
    /// Uses `preferred` when it is present and a battery, otherwise falls back
    /// to the first battery in name order.
    pub fn discover(&self, preferred: &str) -> Option<String> {
        if self.is_battery(preferred) {
            return Some(preferred.to_string());
        }

        let fallback = self.list().into_iter().next();
        match &fallback {
            Some(name) => warn!("Battery {} not found, using {}", preferred, name),
            None => debug!("No battery found in {}", self.root.display()),
        }
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;

    const ROOT: &str = "/sys/class/power_supply";

    fn reader(fs: &MockFs) -> BatteryReader<MockFs> {
        BatteryReader::new(fs.clone(), &SourcePaths::default())
    }

    #[test]
    fn test_read_scales_micro_units() {
        let fs = MockFs::new();
        fs.add_power_supply(
            ROOT,
            "BAT0",
            &[
                ("type", "Battery"),
                ("status", "Discharging"),
                ("charge_now", "2500000"),
                ("charge_full", "5000000"),
                ("current_now", "1000000"),
                ("voltage_now", "11800000"),
            ],
        );

        let raw = reader(&fs).read("BAT0").unwrap();
        assert_eq!(raw.charge_now, Some(2500));
        assert_eq!(raw.charge_full, Some(5000));
        assert_eq!(raw.current_now, Some(1000));
        assert_eq!(raw.voltage_now, Some(11800));
        assert_eq!(raw.energy_now, None);
        assert_eq!(raw.power_now, None);
        assert_eq!(raw.status, "Discharging");
        assert!(raw.is_battery());
    }

    #[test]
    fn test_energy_only_battery() {
        let fs = MockFs::energy_battery();
        let raw = reader(&fs).read("BAT1").unwrap();
        assert_eq!(raw.energy_now, Some(30000));
        assert_eq!(raw.energy_full, Some(60000));
        assert_eq!(raw.power_now, Some(15000));
        assert_eq!(raw.charge_now, None);
        assert_eq!(raw.current_now, None);

        let state = crate::metrics::derive_battery(raw);
        assert_eq!(state.percentage, 50);
        // 3600 * 30000 / 15000
        assert_eq!(state.seconds_remaining, Some(7200));
        assert!(!state.charging);
    }

    #[test]
    fn test_negative_current_handling() {
        let fs = MockFs::new();
        fs.add_power_supply(ROOT, "BAT0", &[("current_now", "-1000"), ("power_now", "-7500000")]);
        let raw = reader(&fs).read("BAT0").unwrap();
        // -1000 µA scales to -1, which drivers use for "unknown".
        assert_eq!(raw.current_now, None);
        assert_eq!(raw.power_now, Some(7500));

        fs.add_power_supply(ROOT, "BAT0", &[("current_now", "-1500000")]);
        let raw = reader(&fs).read("BAT0").unwrap();
        assert_eq!(raw.current_now, Some(1500));
    }

    #[test]
    fn test_unparsable_attribute_is_unavailable() {
        let fs = MockFs::new();
        fs.add_power_supply(
            ROOT,
            "BAT0",
            &[("charge_now", "garbage"), ("charge_full", "4000000"), ("capacity", "")],
        );
        let raw = reader(&fs).read("BAT0").unwrap();
        assert_eq!(raw.charge_now, None);
        assert_eq!(raw.charge_full, Some(4000));
        assert_eq!(raw.capacity, None);
    }

    #[test]
    fn test_status_inference() {
        let fs = MockFs::new();
        fs.add_power_supply(ROOT, "BAT0", &[("energy_full", "50000000")]);
        fs.add_power_supply(ROOT, "BAT1", &[("voltage_now", "12000000")]);
        fs.add_power_supply(ROOT, "BAT2", &[("state", "charging")]);

        let r = reader(&fs);
        assert_eq!(r.read("BAT0").unwrap().status, "available");
        assert_eq!(r.read("BAT1").unwrap().status, "unavailable");
        assert_eq!(r.read("BAT2").unwrap().status, "charging");
    }

    #[test]
    fn test_missing_device_is_not_found() {
        let fs = MockFs::new();
        fs.add_dir(ROOT);
        let err = reader(&fs).read("BAT0").unwrap_err();
        assert_eq!(err.kind, crate::collector::PollErrorKind::ResourceNotFound);
    }

    #[test]
    fn test_discover_prefers_named_battery() {
        let fs = MockFs::new();
        fs.add_power_supply(ROOT, "AC", &[("type", "Mains")]);
        fs.add_power_supply(ROOT, "BAT1", &[("type", "Battery")]);
        fs.add_power_supply(ROOT, "BAT0", &[("type", "Battery")]);

        let r = reader(&fs);
        assert_eq!(r.discover("BAT1").as_deref(), Some("BAT1"));
        assert_eq!(r.discover("BAT7").as_deref(), Some("BAT0"));
        assert_eq!(r.discover("AC").as_deref(), Some("BAT0"));
        assert_eq!(r.list(), vec!["BAT0".to_string(), "BAT1".to_string()]);
    }

    #[test]
    fn test_discover_without_batteries() {
        let fs = MockFs::new();
        fs.add_power_supply(ROOT, "AC", &[("type", "Mains")]);
        assert_eq!(reader(&fs).discover("BAT0"), None);
        assert!(reader(&MockFs::new()).list().is_empty());
    }
}
