//! Network interface sampler.
//!
//! One sample combines the interface flags (`/sys/class/net/<iface>/flags`),
//! the cumulative packet/byte counters (`/proc/net/dev`) and the wireless
//! link quality (`/proc/net/wireless`). IPv4 details come from
//! `/proc/net/route` and `/proc/net/fib_trie` when available.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::collector::SourcePaths;
use crate::collector::error::{PollError, PollErrorKind};
use crate::collector::procfs::inet::{Ipv4Details, inet4_details, parse_fib_trie, parse_route};
use crate::collector::procfs::parser::{net_dev_stats_for, parse_net_dev, wireless_link_for};
use crate::collector::sysfs::{IFF_RUNNING, IFF_UP, NetClassReader};
use crate::collector::traits::FileSystem;

/// Cumulative interface counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceCounters {
    pub in_packets: u64,
    pub out_packets: u64,
    pub in_bytes: u64,
    pub out_bytes: u64,
}

/// One raw sample of an interface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawInterface {
    pub name: String,
    pub flags: u32,
    /// `None` when the interface is down (counters are not read then).
    pub counters: Option<InterfaceCounters>,
    /// Wireless link quality; `None` for wired interfaces.
    pub link_quality: Option<u64>,
    pub hw_address: Option<String>,
    /// `None` when the interface has no IPv4 address or the tables are
    /// unreadable.
    pub inet4: Option<Ipv4Details>,
}

impl RawInterface {
    /// Up and running, i.e. able to carry traffic.
    pub fn is_connected(&self) -> bool {
        self.flags & IFF_UP != 0 && self.flags & IFF_RUNNING != 0
    }
}

/// Reads interface samples through a [`FileSystem`].
pub struct InterfaceReader<F: FileSystem + Clone> {
    fs: F,
    net: NetClassReader<F>,
    net_dev: PathBuf,
    wireless: PathBuf,
    route: PathBuf,
    fib_trie: PathBuf,
}

impl<F: FileSystem + Clone> InterfaceReader<F> {
    pub fn new(fs: F, paths: &SourcePaths) -> Self {
        let proc = PathBuf::from(&paths.proc);
        Self {
            net: NetClassReader::new(fs.clone(), paths),
            fs,
            net_dev: proc.join("net/dev"),
            wireless: proc.join("net/wireless"),
            route: proc.join("net/route"),
            fib_trie: proc.join("net/fib_trie"),
        }
    }

    /// Takes one sample of `iface`.
    ///
    /// The first failing stage decides the error kind: missing interface
    /// (`ResourceNotFound`), flags (`SocketOrIoctl`), counters
    /// (`Statistics`), wireless table (`WirelessDetails`).
    pub fn read(&self, iface: &str) -> Result<RawInterface, PollError> {
        let flags = self.net.flags(iface)?;
        let mut raw = RawInterface {
            name: iface.to_string(),
            flags,
            ..Default::default()
        };

        debug!(
            "Interface {} is {}up and {}running",
            iface,
            if flags & IFF_UP != 0 { "" } else { "not " },
            if flags & IFF_RUNNING != 0 { "" } else { "not " }
        );

        if raw.is_connected() {
            raw.counters = Some(self.read_counters(iface)?);
        }
        raw.link_quality = self.read_link_quality(iface)?;
        raw.hw_address = self.net.hw_address(iface);
        raw.inet4 = self.read_inet4(iface, flags);

        Ok(raw)
    }

    fn read_counters(&self, iface: &str) -> Result<InterfaceCounters, PollError> {
        let content = self.fs.read_to_string(&self.net_dev).map_err(|e| {
            PollError::new(
                PollErrorKind::Statistics,
                format!("Cannot open {}: {}", self.net_dev.display(), e),
            )
        })?;

        let stats = net_dev_stats_for(&content, iface)
            .map_err(|e| PollError::new(PollErrorKind::Statistics, e.message))?;

        Ok(InterfaceCounters {
            in_packets: stats.rx_packets,
            out_packets: stats.tx_packets,
            in_bytes: stats.rx_bytes,
            out_bytes: stats.tx_bytes,
        })
    }

    /// A missing wireless table just means no wireless extensions.
    fn read_link_quality(&self, iface: &str) -> Result<Option<u64>, PollError> {
        let Ok(content) = self.fs.read_to_string(&self.wireless) else {
            return Ok(None);
        };
        wireless_link_for(&content, iface)
            .map_err(|e| PollError::new(PollErrorKind::WirelessDetails, e.message))
    }

    /// Address details never fail a sample; missing tables just drop them.
    fn read_inet4(&self, iface: &str, flags: u32) -> Option<Ipv4Details> {
        let routes = match self.fs.read_to_string(&self.route).map(|c| parse_route(&c)) {
            Ok(Ok(routes)) => routes,
            Ok(Err(e)) => {
                debug!("Ignoring {}: {}", self.route.display(), e);
                return None;
            }
            Err(e) => {
                debug!("Cannot open {}: {}", self.route.display(), e);
                return None;
            }
        };
        let fib = match self.fs.read_to_string(&self.fib_trie) {
            Ok(content) => parse_fib_trie(&content),
            Err(e) => {
                debug!("Cannot open {}: {}", self.fib_trie.display(), e);
                return None;
            }
        };
        inet4_details(&routes, &fib, iface, flags)
    }

    /// Lists interface names known to `/proc/net/dev`.
    pub fn list(&self) -> Vec<String> {
        match self.fs.read_to_string(&self.net_dev) {
            Ok(content) => parse_net_dev(&content)
                .map(|devices| devices.into_iter().map(|d| d.interface).collect())
                .unwrap_or_default(),
            Err(e) => {
                debug!("Cannot list interfaces from {}: {}", self.net_dev.display(), e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::mock::MockFs;
    use std::net::Ipv4Addr;

    fn reader(fs: &MockFs) -> InterfaceReader<MockFs> {
        InterfaceReader::new(fs.clone(), &SourcePaths::default())
    }

    #[test]
    fn test_read_wired_interface() {
        let fs = MockFs::wired_ethernet();
        let raw = reader(&fs).read("eth0").unwrap();

        assert!(raw.is_connected());
        let counters = raw.counters.unwrap();
        assert_eq!(counters.in_packets, 5678);
        assert_eq!(counters.out_packets, 4321);
        assert_eq!(counters.in_bytes, 9876543);
        assert_eq!(counters.out_bytes, 87654321);
        assert_eq!(raw.link_quality, None);
        assert_eq!(raw.hw_address.as_deref(), Some("52:54:00:12:34:56"));

        let inet4 = raw.inet4.unwrap();
        assert_eq!(inet4.address, Some(Ipv4Addr::new(192, 168, 2, 17)));
        assert_eq!(inet4.netmask, Some(Ipv4Addr::new(255, 255, 255, 0)));
        assert_eq!(inet4.broadcast, Some(Ipv4Addr::new(192, 168, 2, 255)));
        assert_eq!(inet4.destination, None);
    }

    #[test]
    fn test_missing_route_tables_drop_inet4() {
        let fs = MockFs::wired_ethernet();
        fs.remove_file("/proc/net/fib_trie");
        let raw = reader(&fs).read("eth0").unwrap();
        assert_eq!(raw.inet4, None);
        assert!(raw.counters.is_some());

        let fs = MockFs::wired_ethernet();
        fs.add_file("/proc/net/route", "garbage\n");
        assert_eq!(reader(&fs).read("eth0").unwrap().inet4, None);
    }

    #[test]
    fn test_read_wireless_interface() {
        let fs = MockFs::wireless_laptop();
        let raw = reader(&fs).read("wlan0").unwrap();
        assert_eq!(raw.link_quality, Some(54));
    }

    #[test]
    fn test_down_interface_skips_counters() {
        let fs = MockFs::wired_ethernet();
        fs.add_file("/sys/class/net/eth0/flags", "0x1002\n");
        // Even a broken counter table must not matter while the link is down.
        fs.remove_file("/proc/net/dev");

        let raw = reader(&fs).read("eth0").unwrap();
        assert!(!raw.is_connected());
        assert_eq!(raw.counters, None);
    }

    #[test]
    fn test_error_kinds() {
        let fs = MockFs::wired_ethernet();
        let r = reader(&fs);

        assert_eq!(
            r.read("eth9").unwrap_err().kind,
            PollErrorKind::ResourceNotFound
        );

        fs.add_file("/sys/class/net/eth1/flags", "0x1043\n");
        assert_eq!(r.read("eth1").unwrap_err().kind, PollErrorKind::Statistics);

        fs.remove_file("/proc/net/dev");
        let err = r.read("eth0").unwrap_err();
        assert_eq!(err.kind, PollErrorKind::Statistics);
        assert!(err.message.starts_with("Cannot open"));
    }

    #[test]
    fn test_malformed_wireless_table() {
        let fs = MockFs::wired_ethernet();
        fs.add_file("/proc/net/wireless", "bogus\nbogus\n");
        let err = reader(&fs).read("eth0").unwrap_err();
        assert_eq!(err.kind, PollErrorKind::WirelessDetails);
    }

    #[test]
    fn test_list_interfaces() {
        let fs = MockFs::wired_ethernet();
        assert_eq!(reader(&fs).list(), vec!["lo".to_string(), "eth0".to_string()]);
        assert!(reader(&MockFs::new()).list().is_empty());
    }
}
