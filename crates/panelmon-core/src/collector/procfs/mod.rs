//! Parsers for the `/proc/net` tables.

pub mod inet;
pub mod parser;

pub use inet::Ipv4Details;
pub use parser::{NetDevStats, ParseError};
