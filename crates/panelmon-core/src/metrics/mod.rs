//! Pure derivation of presentation metrics from raw samples.
//!
//! Nothing in here touches the filesystem or keeps state; the poller feeds
//! in the previous derived value where a delta is needed.

pub mod battery;
pub mod network;

pub use battery::{BatteryState, ChargeState, derive_battery};
pub use network::{Activity, InterfaceState, SignalBucket, derive_interface};
