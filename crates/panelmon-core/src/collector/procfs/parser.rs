//! Parsers for `/proc/net/dev` and `/proc/net/wireless`.
//!
//! These are pure functions over file content. Column positions are located
//! from the header line instead of being hard-coded, so kernels that add or
//! reorder columns keep working; a header without the expected columns is
//! reported as an unknown format.

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// Splits `"  eth0: 123 456 ..."` into the interface name and the rest.
///
/// Leading whitespace is skipped; the name ends at the first ':'.
fn split_iface_line(line: &str) -> Option<(&str, &str)> {
    let (name, rest) = line.trim_start().split_once(':')?;
    Some((name.trim(), rest))
}

/// Tokens of the second header line after the leading "face" column.
fn header_tokens(line: &str) -> impl Iterator<Item = &str> {
    line.split(|c: char| c == '|' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .skip(1)
}

// ============ Network Device Stats Parser ============

/// Positions of the counters this crate uses, relative to the first field
/// after the interface name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetDevColumns {
    pub rx_bytes: usize,
    pub rx_packets: usize,
    pub tx_bytes: usize,
    pub tx_packets: usize,
}

/// Locates the receive and transmit `bytes`/`packets` columns.
///
/// Format of the second header line:
///  face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
pub fn parse_net_dev_header(line: &str) -> Option<NetDevColumns> {
    let mut bytes = Vec::new();
    let mut packets = Vec::new();

    for (i, token) in header_tokens(line).enumerate() {
        match token {
            "bytes" => bytes.push(i),
            "packets" => packets.push(i),
            _ => {}
        }
    }

    if bytes.len() < 2 || packets.len() < 2 {
        return None;
    }

    Some(NetDevColumns {
        rx_bytes: bytes[0],
        rx_packets: packets[0],
        tx_bytes: bytes[1],
        tx_packets: packets[1],
    })
}

/// Cumulative counters of one interface from `/proc/net/dev`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetDevStats {
    /// Interface name (eth0, lo, etc.)
    pub interface: String,
    pub rx_bytes: u64,
    pub rx_packets: u64,
    pub tx_bytes: u64,
    pub tx_packets: u64,
}

fn parse_net_dev_fields(
    interface: &str,
    fields: &str,
    cols: &NetDevColumns,
) -> Option<NetDevStats> {
    let values: Vec<&str> = fields.split_whitespace().collect();
    let get = |idx: usize| -> Option<u64> { values.get(idx)?.parse().ok() };

    Some(NetDevStats {
        interface: interface.to_string(),
        rx_bytes: get(cols.rx_bytes)?,
        rx_packets: get(cols.rx_packets)?,
        tx_bytes: get(cols.tx_bytes)?,
        tx_packets: get(cols.tx_packets)?,
    })
}

fn net_dev_columns(content: &str) -> Result<NetDevColumns, ParseError> {
    content
        .lines()
        .nth(1)
        .and_then(parse_net_dev_header)
        .ok_or_else(|| ParseError::new("Could not parse /proc/net/dev. Unknown format."))
}

/// Parses every well-formed interface line of `/proc/net/dev`.
///
/// Format:
/// Inter-|   Receive                                                |  Transmit
///  face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
///    lo: 1234567     1234    0    0    0     0          0         0  1234567     1234    0    0    0     0       0          0
pub fn parse_net_dev(content: &str) -> Result<Vec<NetDevStats>, ParseError> {
    let cols = net_dev_columns(content)?;

    Ok(content
        .lines()
        .skip(2)
        .filter_map(split_iface_line)
        .filter_map(|(name, fields)| parse_net_dev_fields(name, fields, &cols))
        .collect())
}

/// Extracts the counters of a single interface.
///
/// Fails when the format is unknown, when the interface line is malformed,
/// or when the interface is not listed at all.
pub fn net_dev_stats_for(content: &str, iface: &str) -> Result<NetDevStats, ParseError> {
    let cols = net_dev_columns(content)?;

    for line in content.lines().skip(2) {
        let Some((name, fields)) = split_iface_line(line) else {
            continue;
        };
        if name != iface {
            continue;
        }
        return parse_net_dev_fields(name, fields, &cols).ok_or_else(|| {
            ParseError::new(format!(
                "Could not parse interface statistics from '{}'. \
                 prx_idx = {}; ptx_idx = {}; brx_idx = {}; btx_idx = {};",
                line.trim(),
                cols.rx_packets,
                cols.tx_packets,
                cols.rx_bytes,
                cols.tx_bytes
            ))
        });
    }

    Err(ParseError::new(format!(
        "Could not find information on interface '{}' in /proc/net/dev",
        iface
    )))
}

// ============ Wireless Details Parser ============

/// Locates the `link` quality column in the second header line.
///
/// Format:
///  face | tus | link level noise |  nwid  crypt   frag  retry   misc | beacon | 22
pub fn parse_wireless_header(line: &str) -> Option<usize> {
    header_tokens(line).position(|t| t == "link")
}

/// Link quality values carry a trailing '.' ("54.") when the driver
/// reports them as updated since the last read.
fn parse_link_quality(token: &str) -> Option<u64> {
    let value: f64 = token.trim_end_matches('.').parse().ok()?;
    if value.is_finite() && value >= 0.0 {
        Some(value as u64)
    } else {
        Some(0)
    }
}

/// Extracts the link quality of a single interface from `/proc/net/wireless`.
///
/// Returns `Ok(None)` when the interface is not listed, i.e. is not wireless.
pub fn wireless_link_for(content: &str, iface: &str) -> Result<Option<u64>, ParseError> {
    let link_idx = content
        .lines()
        .nth(1)
        .and_then(parse_wireless_header)
        .ok_or_else(|| ParseError::new("Could not parse /proc/net/wireless. Unknown format."))?;

    for line in content.lines().skip(2) {
        let Some((name, details)) = split_iface_line(line) else {
            continue;
        };
        if name != iface {
            continue;
        }
        return details
            .split_whitespace()
            .nth(link_idx)
            .and_then(parse_link_quality)
            .map(Some)
            .ok_or_else(|| {
                ParseError::new(format!(
                    "Could not parse wireless details from '{}'. link_idx = {};",
                    line.trim(),
                    link_idx
                ))
            });
    }

    Ok(None)
}
