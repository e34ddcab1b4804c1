//! Interface metric derivation: link activity and wireless signal strength.

use serde::{Deserialize, Serialize};

use crate::collector::RawInterface;
use crate::collector::interface::InterfaceCounters;
use crate::collector::procfs::Ipv4Details;

/// Link quality that maps to 100% signal strength.
const LINK_QUALITY_MAX: f64 = 92.0;

/// Traffic direction observed between two consecutive samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Activity {
    Disconnected,
    Idle,
    Tx,
    Rx,
    TxRx,
}

impl Activity {
    /// Combines the per-direction observations.
    pub fn from_directions(tx: bool, rx: bool) -> Self {
        match (tx, rx) {
            (false, false) => Activity::Idle,
            (true, true) => Activity::TxRx,
            (true, false) => Activity::Tx,
            (false, true) => Activity::Rx,
        }
    }
}

/// Signal strength bucket used for icon selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalBucket {
    /// 0–24%
    Weak,
    /// 25–49%
    Fair,
    /// 50–74%
    Good,
    /// 75–100%
    Excellent,
}

impl SignalBucket {
    pub fn from_strength(percent: u8) -> Self {
        match percent {
            0..=24 => SignalBucket::Weak,
            25..=49 => SignalBucket::Fair,
            50..=74 => SignalBucket::Good,
            _ => SignalBucket::Excellent,
        }
    }
}

/// Converts a wireless link quality into a 0..=100 strength on a log scale.
pub fn signal_strength(link: u64) -> u8 {
    if link == 0 {
        return 0;
    }
    let percent = ((link as f64).ln() / LINK_QUALITY_MAX.ln() * 100.0).round_ties_even();
    percent.clamp(0.0, 100.0) as u8
}

/// Activity from the delta between two consecutive counter samples.
///
/// Only increases in packet counts matter; byte counts and absolute
/// levels are ignored. Without a previous sample there is no delta.
pub fn derive_activity(
    previous: Option<&InterfaceCounters>,
    current: &InterfaceCounters,
) -> Activity {
    let Some(prev) = previous else {
        return Activity::Idle;
    };
    let rx = current.in_packets > prev.in_packets;
    let tx = current.out_packets > prev.out_packets;
    Activity::from_directions(tx, rx)
}

/// Derived interface snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceState {
    pub name: String,
    /// Counters from the last successful sample that had them.
    pub counters: Option<InterfaceCounters>,
    pub activity: Activity,
    pub wireless: bool,
    /// 0..=100, zero for wired interfaces.
    pub signal_strength: u8,
    pub signal: SignalBucket,
    pub hw_address: Option<String>,
    pub inet4: Option<Ipv4Details>,
}

/// Derives the interface state from the previous state and a new sample.
pub fn derive_interface(previous: Option<&InterfaceState>, raw: RawInterface) -> InterfaceState {
    let prev_counters = previous.and_then(|p| p.counters.as_ref());

    let (activity, counters) = match raw.counters {
        Some(current) if raw.is_connected() => {
            (derive_activity(prev_counters, &current), Some(current))
        }
        _ => (Activity::Disconnected, prev_counters.copied()),
    };

    let signal_strength = raw.link_quality.map(signal_strength).unwrap_or(0);

    InterfaceState {
        name: raw.name,
        counters,
        activity,
        wireless: raw.link_quality.is_some(),
        signal_strength,
        signal: SignalBucket::from_strength(signal_strength),
        hw_address: raw.hw_address,
        inet4: raw.inet4,
    }
}
