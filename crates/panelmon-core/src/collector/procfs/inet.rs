//! IPv4 configuration of an interface from `/proc/net/route` and
//! `/proc/net/fib_trie`.
//!
//! The route table gives the directly attached networks of each interface.
//! The FIB trie lists every local and broadcast address the kernel knows.
//! Matching the two yields the interface address, its netmask and its
//! broadcast address without issuing address ioctls.
//!
//! Route table values are hex words in host byte order:
//!
//! ```text
//! Iface   Destination Gateway  Flags RefCnt Use Metric Mask     MTU Window IRTT
//! eth0    0002A8C0    00000000 0001  0      0   100    00FFFFFF 0   0      0
//! ```

use std::collections::BTreeSet;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::collector::procfs::parser::ParseError;
use crate::collector::sysfs::{IFF_BROADCAST, IFF_POINTOPOINT};

/// Route is usable.
const RTF_UP: u32 = 0x1;

/// IPv4 details of one interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ipv4Details {
    pub address: Option<Ipv4Addr>,
    /// Peer address, point-to-point links only.
    pub destination: Option<Ipv4Addr>,
    /// Broadcast address, broadcast-capable links only.
    pub broadcast: Option<Ipv4Addr>,
    pub netmask: Option<Ipv4Addr>,
}

/// One line of `/proc/net/route`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub iface: String,
    pub destination: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub flags: u32,
    pub mask: Ipv4Addr,
}

impl RouteEntry {
    /// Up and reachable without a gateway.
    fn is_direct(&self) -> bool {
        self.flags & RTF_UP != 0 && self.gateway.is_unspecified()
    }

    fn is_host(&self) -> bool {
        self.mask == Ipv4Addr::BROADCAST
    }

    fn contains(&self, addr: Ipv4Addr) -> bool {
        network_of(addr, self.mask) == self.destination
    }
}

fn network_of(addr: Ipv4Addr, mask: Ipv4Addr) -> Ipv4Addr {
    Ipv4Addr::from(u32::from(addr) & u32::from(mask))
}

fn parse_hex_addr(field: &str) -> Option<Ipv4Addr> {
    u32::from_str_radix(field, 16)
        .ok()
        .map(|v| Ipv4Addr::from(v.to_ne_bytes()))
}

/// Parses `/proc/net/route`.
///
/// Column positions come from the header line.
pub fn parse_route(content: &str) -> Result<Vec<RouteEntry>, ParseError> {
    let mut lines = content.lines();
    let header: Vec<&str> = lines
        .next()
        .ok_or_else(|| ParseError::new("route table is empty"))?
        .split_whitespace()
        .collect();

    let column = |name: &str| {
        header
            .iter()
            .position(|h| *h == name)
            .ok_or_else(|| ParseError::new(format!("route table has no {} column", name)))
    };
    let iface = column("Iface")?;
    let destination = column("Destination")?;
    let gateway = column("Gateway")?;
    let flags = column("Flags")?;
    let mask = column("Mask")?;

    let mut routes = Vec::new();
    for line in lines {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() {
            continue;
        }
        let field = |i: usize| {
            fields
                .get(i)
                .copied()
                .ok_or_else(|| ParseError::new(format!("short route line: '{}'", line)))
        };
        let addr = |i: usize| {
            let f = field(i)?;
            parse_hex_addr(f).ok_or_else(|| ParseError::new(format!("bad route address '{}'", f)))
        };

        let raw_flags = field(flags)?;
        routes.push(RouteEntry {
            iface: field(iface)?.to_string(),
            destination: addr(destination)?,
            gateway: addr(gateway)?,
            flags: u32::from_str_radix(raw_flags, 16)
                .map_err(|_| ParseError::new(format!("bad route flags '{}'", raw_flags)))?,
            mask: addr(mask)?,
        });
    }
    Ok(routes)
}

/// Local and broadcast addresses listed in `/proc/net/fib_trie`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FibAddresses {
    pub local: BTreeSet<Ipv4Addr>,
    pub broadcast: BTreeSet<Ipv4Addr>,
}

/// Parses the leaves of `/proc/net/fib_trie`.
///
/// A leaf is a `|-- ADDR` line followed by `/LEN SCOPE TYPE` lines:
///
/// ```text
///            |-- 192.168.2.17
///               /32 host LOCAL
/// ```
///
/// Both the main and the local table are scanned; addresses repeat between
/// them, hence the sets.
pub fn parse_fib_trie(content: &str) -> FibAddresses {
    let mut found = FibAddresses::default();
    let mut leaf: Option<Ipv4Addr> = None;

    for line in content.lines() {
        let line = line.trim();
        if let Some(addr) = line.strip_prefix("|--") {
            leaf = addr.trim().parse().ok();
        } else if line.starts_with('/') {
            let Some(addr) = leaf else { continue };
            match line.split_whitespace().last() {
                Some("LOCAL") => {
                    found.local.insert(addr);
                }
                Some("BROADCAST") => {
                    found.broadcast.insert(addr);
                }
                _ => {}
            }
        } else {
            leaf = None;
        }
    }
    found
}

/// Matches route entries and FIB addresses for `iface`.
///
/// The address is the first local address that falls inside one of the
/// interface's directly attached networks; that network's mask is the
/// netmask. Returns `None` when no address matches.
pub fn inet4_details(
    routes: &[RouteEntry],
    fib: &FibAddresses,
    iface: &str,
    flags: u32,
) -> Option<Ipv4Details> {
    let direct: Vec<&RouteEntry> = routes
        .iter()
        .filter(|r| r.iface == iface && r.is_direct())
        .collect();

    let (route, address) = direct.iter().filter(|r| !r.is_host()).find_map(|r| {
        fib.local
            .iter()
            .find(|a| r.contains(**a) && **a != r.destination)
            .map(|a| (*r, *a))
    })?;

    let broadcast = if flags & IFF_BROADCAST != 0 {
        fib.broadcast
            .iter()
            .find(|b| route.contains(**b) && **b != route.destination)
            .copied()
    } else {
        None
    };

    let destination = if flags & IFF_POINTOPOINT != 0 {
        direct.iter().find(|r| r.is_host()).map(|r| r.destination)
    } else {
        None
    };

    Some(Ipv4Details {
        address: Some(address),
        destination,
        broadcast,
        netmask: Some(route.mask),
    })
}
