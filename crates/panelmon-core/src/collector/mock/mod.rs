//! Mock filesystem and pre-built sysfs/procfs scenarios for tests.

mod filesystem;
mod scenarios;

pub use filesystem::MockFs;
pub use scenarios::{net_dev_line, route_line};
