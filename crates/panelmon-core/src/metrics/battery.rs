//! Battery metric derivation: charge percentage, time remaining and the
//! charging classification.
//!
//! The fallback orders and the "zero current means charging" rule mirror
//! how real drivers misbehave; keep them as they are.

use serde::{Deserialize, Serialize};

use crate::collector::RawBattery;

/// Rates at or below this are treated as "no rate" (normalized milli-units).
pub const MIN_PRESENT_RATE: f64 = 0.01;

/// Full-charge capacity (mAh) assumed for devices that only report a
/// percentage (e.g. the Pinebook battery controller).
pub const CAPACITY_ONLY_CHARGE_FULL: u64 = 10000;

/// Status strings that count as "charging" for display purposes.
const CHARGING_STATUSES: [&str; 4] = ["Unknown", "Full", "Charging", "Not Charging"];

/// Coarse state tag derived from the status attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChargeState {
    Charging,
    Discharging,
    Full,
    Unknown,
}

impl ChargeState {
    pub fn from_status(status: &str) -> Self {
        if status.eq_ignore_ascii_case("charging") {
            ChargeState::Charging
        } else if status.eq_ignore_ascii_case("discharging") {
            ChargeState::Discharging
        } else if status.eq_ignore_ascii_case("full") {
            ChargeState::Full
        } else {
            ChargeState::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChargeState::Charging => "charging",
            ChargeState::Discharging => "discharging",
            ChargeState::Full => "full",
            ChargeState::Unknown => "unknown",
        }
    }
}

/// Derived battery snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatteryState {
    /// Raw attributes, with synthesized charge values for capacity-only devices.
    pub raw: RawBattery,
    /// Charge level, always within 0..=100.
    pub percentage: u8,
    /// Time until empty (discharging) or full (charging); only present when
    /// a usable nonzero rate is known.
    pub seconds_remaining: Option<u64>,
    /// Display classification, see [`is_charging`].
    pub charging: bool,
    pub state: ChargeState,
}

impl BatteryState {
    pub fn name(&self) -> &str {
        &self.raw.name
    }

    /// Present current draw in mA, if known.
    pub fn rate(&self) -> Option<u64> {
        self.raw.current_now
    }
}

/// Per-mille ratio of a `(now, full)` pair when both halves are known.
fn ratio_permille(now: Option<u64>, full: Option<u64>) -> Option<u64> {
    match (now, full) {
        (Some(now), Some(full)) if full > 0 => Some(now.saturating_mul(1000) / full),
        _ => None,
    }
}

/// Computes the charge level in per-mille.
///
/// Tries charge, then energy, then the driver's own `capacity` percentage.
/// In the last case the raw sample gets a synthesized charge pair so that
/// later time estimates have something to work with.
fn charge_permille(raw: &mut RawBattery) -> u64 {
    if let Some(p) = ratio_permille(raw.charge_now, raw.charge_full) {
        return p;
    }
    if let Some(p) = ratio_permille(raw.energy_now, raw.energy_full) {
        return p;
    }
    match raw.capacity {
        Some(value) if value <= 100 => {
            raw.charge_full = Some(CAPACITY_ONLY_CHARGE_FULL);
            raw.charge_now = Some((value * CAPACITY_ONLY_CHARGE_FULL + 50) / 100);
            value * 10
        }
        _ => 0,
    }
}

/// Rounds per-mille to a percentage and clamps it to 100.
pub fn permille_to_percentage(permille: u64) -> u8 {
    ((permille + 5) / 10).min(100) as u8
}

/// Display classification of the battery as "charging".
///
/// A zero `current_now` also counts: several drivers report a zero rate
/// while the battery is in fact charging.
pub fn is_charging(status: Option<&str>, current_now: Option<u64>) -> bool {
    let Some(status) = status else {
        return true;
    };
    CHARGING_STATUSES
        .iter()
        .any(|s| status.eq_ignore_ascii_case(s))
        || current_now == Some(0)
}

fn has_rate(rate: Option<u64>) -> Option<u64> {
    rate.filter(|&r| r as f64 > MIN_PRESENT_RATE)
}

/// `3600 * amount / rate`, or `None` when the product does not fit.
fn hours_to_seconds(amount: u64, rate: u64) -> Option<u64> {
    amount.checked_mul(3600).map(|a| a / rate)
}

/// Seconds until full (charging) or empty (discharging).
///
/// Each computation only uses a field pair when both halves are known;
/// otherwise the next fallback is tried. Absurdly large attributes give
/// `None` rather than a wrapped estimate.
pub fn seconds_remaining(raw: &RawBattery) -> Option<u64> {
    if raw.current_now.is_none() && raw.power_now.is_none() {
        return None;
    }

    let current = has_rate(raw.current_now);
    let power = raw.power_now.filter(|&p| p > 0);

    if raw.status.eq_ignore_ascii_case("charging") {
        if let (Some(rate), Some(now), Some(full)) = (current, raw.charge_now, raw.charge_full) {
            return hours_to_seconds(full.saturating_sub(now), rate);
        }
        if let (Some(rate), Some(now), Some(full)) = (power, raw.energy_now, raw.energy_full) {
            return hours_to_seconds(full.saturating_sub(now), rate);
        }
        None
    } else if raw.status.eq_ignore_ascii_case("discharging") {
        if let (Some(rate), Some(now)) = (current, raw.charge_now) {
            return hours_to_seconds(now, rate);
        }
        if let (Some(rate), Some(now)) = (power, raw.energy_now) {
            return hours_to_seconds(now, rate);
        }
        None
    } else {
        None
    }
}

/// Whether any percentage source is present: a charge pair, an energy
/// pair or a usable `capacity` attribute.
pub fn has_charge_source(raw: &RawBattery) -> bool {
    ratio_permille(raw.charge_now, raw.charge_full).is_some()
        || ratio_permille(raw.energy_now, raw.energy_full).is_some()
        || raw.capacity.is_some_and(|c| c <= 100)
}

/// Derives the presentation state from one raw sample.
pub fn derive_battery(mut raw: RawBattery) -> BatteryState {
    let percentage = permille_to_percentage(charge_permille(&mut raw));
    let charging = is_charging(Some(&raw.status), raw.current_now);
    let seconds_remaining = seconds_remaining(&raw);
    let state = ChargeState::from_status(&raw.status);

    BatteryState {
        raw,
        percentage,
        seconds_remaining,
        charging,
        state,
    }
}
