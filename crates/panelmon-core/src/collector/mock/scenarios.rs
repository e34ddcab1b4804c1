//! Pre-built mock filesystem scenarios for testing.
//!
//! These scenarios provide realistic sysfs/procfs states for a laptop
//! battery and for wired and wireless interfaces.

use std::net::Ipv4Addr;

use super::filesystem::MockFs;

const POWER_SUPPLY: &str = "/sys/class/power_supply";

const NET_DEV_HEADER: &str = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
";

const WIRELESS_HEADER: &str = "\
Inter-| sta-|   Quality        |   Discarded packets               | Missed | WE
 face | tus | link level noise |  nwid  crypt   frag  retry   misc | beacon | 22
";

const ROUTE_HEADER: &str =
    "Iface\tDestination\tGateway \tFlags\tRefCnt\tUse\tMetric\tMask\t\tMTU\tWindow\tIRTT\n";

const WIRED_FIB_TRIE: &str = "\
Main:
  +-- 0.0.0.0/0 3 0 5
     |-- 0.0.0.0
        /0 universe UNICAST
     +-- 192.168.2.0/24 2 0 2
        +-- 192.168.2.0/26 2 0 2
           |-- 192.168.2.0
              /24 link UNICAST
           |-- 192.168.2.17
              /32 host LOCAL
        |-- 192.168.2.255
           /32 link BROADCAST
Local:
  +-- 0.0.0.0/0 3 0 5
     +-- 127.0.0.0/8 2 0 2
        |-- 127.0.0.1
           /32 host LOCAL
     |-- 192.168.2.17
        /32 host LOCAL
";

/// Formats one `/proc/net/route` row; addresses are host-order hex words.
pub fn route_line(
    iface: &str,
    destination: Ipv4Addr,
    gateway: Ipv4Addr,
    flags: u32,
    mask: Ipv4Addr,
) -> String {
    let hex = |a: Ipv4Addr| format!("{:08X}", u32::from_ne_bytes(a.octets()));
    format!(
        "{}\t{}\t{}\t{:04X}\t0\t0\t100\t{}\t0\t0\t0\n",
        iface,
        hex(destination),
        hex(gateway),
        flags,
        hex(mask)
    )
}

/// Formats one `/proc/net/dev` row.
pub fn net_dev_line(
    iface: &str,
    rx_bytes: u64,
    rx_packets: u64,
    tx_bytes: u64,
    tx_packets: u64,
) -> String {
    format!(
        "{:>6}: {} {} 0 0 0 0 0 0 {} {} 0 0 0 0 0 0\n",
        iface, rx_bytes, rx_packets, tx_bytes, tx_packets
    )
}

impl MockFs {
    /// A laptop on battery: BAT0 at 50% charge, draining 1 A, plus an
    /// offline AC adapter.
    pub fn laptop_discharging() -> Self {
        let fs = Self::new();
        fs.add_power_supply(POWER_SUPPLY, "AC", &[("type", "Mains"), ("online", "0")]);
        fs.add_power_supply(
            POWER_SUPPLY,
            "BAT0",
            &[
                ("type", "Battery"),
                ("status", "Discharging"),
                ("present", "1"),
                ("charge_now", "2500000"),
                ("charge_full", "5000000"),
                ("charge_full_design", "5200000"),
                ("current_now", "1000000"),
                ("voltage_now", "11800000"),
                ("capacity", "50"),
            ],
        );
        fs
    }

    /// The same laptop plugged in, charging at 2 A.
    pub fn laptop_charging() -> Self {
        let fs = Self::laptop_discharging();
        fs.add_power_supply(POWER_SUPPLY, "AC", &[("online", "1")]);
        fs.add_power_supply(
            POWER_SUPPLY,
            "BAT0",
            &[("status", "Charging"), ("current_now", "2000000")],
        );
        fs
    }

    /// A battery that only exposes energy attributes (mWh/mW).
    pub fn energy_battery() -> Self {
        let fs = Self::new();
        fs.add_power_supply(
            POWER_SUPPLY,
            "BAT1",
            &[
                ("type", "Battery"),
                ("status", "Discharging"),
                ("energy_now", "30000000"),
                ("energy_full", "60000000"),
                ("energy_full_design", "62000000"),
                ("power_now", "15000000"),
                ("voltage_now", "12100000"),
            ],
        );
        fs
    }

    /// Updates the `/proc/net/dev` table with the given rows.
    pub fn set_net_dev(&self, rows: &[String]) {
        let mut content = NET_DEV_HEADER.to_string();
        for row in rows {
            content.push_str(row);
        }
        self.add_file("/proc/net/dev", content);
    }

    /// Replaces `/proc/net/route` with the given rows.
    pub fn set_routes(&self, rows: &[String]) {
        let mut content = ROUTE_HEADER.to_string();
        for row in rows {
            content.push_str(row);
        }
        self.add_file("/proc/net/route", content);
    }

    /// A desktop with loopback and an up-and-running `eth0` at
    /// 192.168.2.17/24 behind the gateway 192.168.2.1.
    pub fn wired_ethernet() -> Self {
        let fs = Self::new();
        fs.set_net_dev(&[
            net_dev_line("lo", 1234567, 1234, 1234567, 1234),
            net_dev_line("eth0", 9876543, 5678, 87654321, 4321),
        ]);
        fs.add_file("/sys/class/net/lo/flags", "0x9\n");
        fs.add_file("/sys/class/net/lo/address", "00:00:00:00:00:00\n");
        fs.add_file("/sys/class/net/eth0/flags", "0x1043\n");
        fs.add_file("/sys/class/net/eth0/address", "52:54:00:12:34:56\n");
        fs.set_routes(&[
            route_line(
                "eth0",
                Ipv4Addr::UNSPECIFIED,
                Ipv4Addr::new(192, 168, 2, 1),
                0x3,
                Ipv4Addr::UNSPECIFIED,
            ),
            route_line(
                "eth0",
                Ipv4Addr::new(192, 168, 2, 0),
                Ipv4Addr::UNSPECIFIED,
                0x1,
                Ipv4Addr::new(255, 255, 255, 0),
            ),
        ]);
        fs.add_file("/proc/net/fib_trie", WIRED_FIB_TRIE);
        fs
    }

    /// A laptop associated to an access point on `wlan0`.
    pub fn wireless_laptop() -> Self {
        let fs = Self::new();
        fs.set_net_dev(&[
            net_dev_line("lo", 1000, 10, 1000, 10),
            net_dev_line("wlan0", 5000000, 4000, 700000, 3000),
        ]);
        fs.add_file("/sys/class/net/wlan0/flags", "0x1043\n");
        fs.add_file("/sys/class/net/wlan0/address", "a0:88:b4:01:02:03\n");
        fs.set_wireless_link("wlan0", 54);
        fs
    }

    /// Updates the `/proc/net/wireless` link quality of one interface.
    pub fn set_wireless_link(&self, iface: &str, link: u64) {
        let content = format!(
            "{}{:>6}: 0000   {}.  -56.  -256        0      0      0      0      0        0\n",
            WIRELESS_HEADER, iface, link
        );
        self.add_file("/proc/net/wireless", content);
    }
}
