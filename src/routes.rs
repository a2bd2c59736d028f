//! Kernel forwarding-table snapshots.
//!
//! Parses the `route -n` text captured from a router into typed entries.
//! Header lines are skipped; anything else that fails to parse is an error
//! so a truncated or garbled capture is visible instead of silently empty.

use std::fmt;
use std::net::Ipv4Addr;

use regex::Regex;

/// Forwarding-table parse failure.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RouteParseError {
    #[error("unrecognized route line: '{0}'")]
    BadLine(String),
}

/// One kernel route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub destination: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub genmask: Ipv4Addr,
    pub flags: String,
    pub metric: u32,
    pub iface: String,
}

impl RouteEntry {
    /// A default route: all-zero destination with a gateway set.
    pub fn is_default(&self) -> bool {
        self.destination.is_unspecified() && !self.gateway.is_unspecified()
    }
}

/// A parsed forwarding-table snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTable {
    pub entries: Vec<RouteEntry>,
}

impl RouteTable {
    /// Parse the output of `route -n`.
    pub fn parse(text: &str) -> Result<Self, RouteParseError> {
        let line_re = Regex::new(
            r"^(\d{1,3}(?:\.\d{1,3}){3})\s+(\d{1,3}(?:\.\d{1,3}){3})\s+(\d{1,3}(?:\.\d{1,3}){3})\s+(\S+)\s+(\d+)\s+\d+\s+\d+\s+(\S+)$",
        )
        .unwrap();

        let mut entries = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty()
                || line.starts_with("Kernel IP routing table")
                || line.starts_with("Destination")
            {
                continue;
            }

            let caps = line_re
                .captures(line)
                .ok_or_else(|| RouteParseError::BadLine(line.to_string()))?;
            let bad = || RouteParseError::BadLine(line.to_string());
            entries.push(RouteEntry {
                destination: caps[1].parse().map_err(|_| bad())?,
                gateway: caps[2].parse().map_err(|_| bad())?,
                genmask: caps[3].parse().map_err(|_| bad())?,
                flags: caps[4].to_string(),
                metric: caps[5].parse().map_err(|_| bad())?,
                iface: caps[6].to_string(),
            });
        }
        Ok(Self { entries })
    }
}

impl fmt::Display for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<16} {:<16} {:<16} {:<6} {:<7} Iface",
            "Destination", "Gateway", "Genmask", "Flags", "Metric"
        )?;
        for entry in &self.entries {
            writeln!(
                f,
                "{:<16} {:<16} {:<16} {:<6} {:<7} {}",
                entry.destination.to_string(),
                entry.gateway.to_string(),
                entry.genmask.to_string(),
                entry.flags,
                entry.metric,
                entry.iface
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = "\
Kernel IP routing table
Destination     Gateway         Genmask         Flags Metric Ref    Use Iface
0.0.0.0         192.168.0.1     0.0.0.0         UG    0      0        0 h1-eth0
192.168.0.0     0.0.0.0         255.255.255.0   U     0      0        0 h1-eth0
192.168.5.0     192.168.0.1     255.255.255.252 UG    20     0        0 h1-eth0
";

    #[test]
    fn test_parse_snapshot() {
        let table = RouteTable::parse(SNAPSHOT).unwrap();
        assert_eq!(table.entries.len(), 3);

        let default = &table.entries[0];
        assert!(default.is_default());
        assert_eq!(default.gateway, Ipv4Addr::new(192, 168, 0, 1));
        assert_eq!(default.flags, "UG");
        assert_eq!(default.iface, "h1-eth0");

        let connected = &table.entries[1];
        assert!(!connected.is_default());
        assert_eq!(connected.genmask, Ipv4Addr::new(255, 255, 255, 0));
        assert_eq!(table.entries[2].metric, 20);
    }

    #[test]
    fn test_parse_empty_capture() {
        let table = RouteTable::parse("Kernel IP routing table\n").unwrap();
        assert!(table.entries.is_empty());
    }

    #[test]
    fn test_garbled_line_is_an_error() {
        let err = RouteTable::parse("not a route at all\n").unwrap_err();
        assert_eq!(err, RouteParseError::BadLine("not a route at all".to_string()));
    }

    #[test]
    fn test_display_round() {
        let table = RouteTable::parse(SNAPSHOT).unwrap();
        let text = table.to_string();
        assert!(text.contains("192.168.5.0"));
        assert!(text.contains("h1-eth0"));
    }
}
