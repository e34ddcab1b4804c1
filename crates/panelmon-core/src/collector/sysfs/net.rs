//! Interface attributes from `/sys/class/net/<iface>/`.
//!
//! The `flags` attribute mirrors what `SIOCGIFFLAGS` returns, formatted as
//! a hex number (`0x1003`).

use std::path::PathBuf;

use crate::collector::SourcePaths;
use crate::collector::error::{PollError, PollErrorKind};
use crate::collector::traits::FileSystem;

/// Interface is administratively up.
pub const IFF_UP: u32 = 0x1;
/// Interface has a valid broadcast address.
pub const IFF_BROADCAST: u32 = 0x2;
/// Interface is a point-to-point link.
pub const IFF_POINTOPOINT: u32 = 0x10;
/// Interface has a carrier (resources allocated, link running).
pub const IFF_RUNNING: u32 = 0x40;

/// Parses the hex `flags` attribute.
pub fn parse_flags(content: &str) -> Option<u32> {
    let s = content.trim();
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u32::from_str_radix(digits, 16).ok()
}

/// Reads per-interface attributes under the network class directory.
pub struct NetClassReader<F: FileSystem> {
    fs: F,
    root: PathBuf,
}

impl<F: FileSystem> NetClassReader<F> {
    pub fn new(fs: F, paths: &SourcePaths) -> Self {
        Self {
            fs,
            root: PathBuf::from(&paths.sys_net),
        }
    }

    /// Reads the interface flags.
    ///
    /// A missing interface directory is `ResourceNotFound`; an unreadable or
    /// malformed flags attribute is `SocketOrIoctl`.
    pub fn flags(&self, iface: &str) -> Result<u32, PollError> {
        let dir = self.root.join(iface);
        if !self.fs.exists(&dir) {
            return Err(PollError::not_found(format!(
                "interface {} not found in {}",
                iface,
                self.root.display()
            )));
        }

        let content = self.fs.read_to_string(&dir.join("flags")).map_err(|e| {
            PollError::new(
                PollErrorKind::SocketOrIoctl,
                format!("cannot read flags of {}: {}", iface, e),
            )
        })?;

        parse_flags(&content).ok_or_else(|| {
            PollError::new(
                PollErrorKind::SocketOrIoctl,
                format!("malformed flags for {}: '{}'", iface, content.trim()),
            )
        })
    }

    /// Hardware address, if the interface exposes a non-empty one.
    pub fn hw_address(&self, iface: &str) -> Option<String> {
        let content = self
            .fs
            .read_to_string(&self.root.join(iface).join("address"))
            .ok()?;
        let addr = content.trim();
        if addr.is_empty() || addr == "00:00:00:00:00:00" {
            None
        } else {
            Some(addr.to_string())
        }
    }
}
