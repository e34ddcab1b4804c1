//! Raw counter readers for Linux sysfs and procfs.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         readers                              │
//! │  ┌──────────────────────┐   ┌─────────────────────────────┐  │
//! │  │  BatteryReader       │   │     InterfaceReader         │  │
//! │  │  - power_supply/*/   │   │  - /sys/class/net/*/flags   │  │
//! │  │                      │   │  - /proc/net/dev            │  │
//! │  │                      │   │  - /proc/net/wireless       │  │
//! │  └──────────┬───────────┘   └──────────────┬──────────────┘  │
//! │             └──────────────┬───────────────┘                 │
//! │                     ┌──────▼──────┐                          │
//! │                     │  FileSystem │ (trait)                  │
//! │                     └──────┬──────┘                          │
//! └────────────────────────────┼─────────────────────────────────┘
//!                    ┌─────────┴─────────┐
//!             ┌──────▼──────┐     ┌──────▼──────┐
//!             │   RealFs    │     │   MockFs    │
//!             └─────────────┘     └─────────────┘
//! ```
//!
//! Readers hold no state between calls; the delta logic lives in
//! [`crate::metrics`] and the per-resource memory in [`crate::poller`].
//!
//! ```
//! use panelmon_core::collector::{BatteryReader, MockFs, SourcePaths};
//!
//! let fs = MockFs::laptop_discharging();
//! let reader = BatteryReader::new(fs, &SourcePaths::default());
//! let raw = reader.read("BAT0").unwrap();
//! assert_eq!(raw.status, "Discharging");
//! ```

mod error;
pub mod interface;
pub mod mock;
pub mod procfs;
pub mod sysfs;
pub mod traits;

pub use error::{PollError, PollErrorKind};
pub use interface::{InterfaceReader, RawInterface};
pub use mock::MockFs;
pub use sysfs::{BatteryReader, RawBattery};
pub use traits::{FileSystem, RealFs};

use serde::{Deserialize, Serialize};

/// Roots of the kernel views the readers consume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePaths {
    /// Power-supply class directory.
    pub power_supply: String,
    /// Network class directory (interface flags and addresses).
    pub sys_net: String,
    /// Base path to the proc filesystem.
    pub proc: String,
}

impl Default for SourcePaths {
    fn default() -> Self {
        Self {
            power_supply: "/sys/class/power_supply".to_string(),
            sys_net: "/sys/class/net".to_string(),
            proc: "/proc".to_string(),
        }
    }
}
