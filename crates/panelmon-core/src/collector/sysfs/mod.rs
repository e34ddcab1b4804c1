//! Readers for the `/sys/class` device trees.

pub mod net;
pub mod power_supply;

pub use net::{IFF_BROADCAST, IFF_POINTOPOINT, IFF_RUNNING, IFF_UP, NetClassReader};
pub use power_supply::{BatteryReader, RawBattery};
