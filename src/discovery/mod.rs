//! Host Discovery - liveness sweeps over a /24-style address range
//!
//! An `AddressRange` is expanded into dotted-quad hosts, each host is checked by a
//! `ReachabilityProbe`, and the resulting `HostRecord`s are ordered numerically.

pub mod engine;
pub mod methods;

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

pub use engine::{HostSweeper, SweepProgress};
pub use methods::IcmpProbe;

/// Hostname sentinel for hosts without a resolved name
pub const UNRESOLVED_HOSTNAME: &str = "-";

const MIN_OCTET: i64 = 1;
const MAX_OCTET: i64 = 254;

/// Range of host octets appended to a base prefix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRange {
    base_prefix: String,
    start: u8,
    end: u8,
    worker_budget: usize,
}

impl AddressRange {
    /// Build a range; out-of-bounds octets are clamped into 1..=254, never rejected.
    pub fn new(base_prefix: impl Into<String>, start: i64, end: i64, worker_budget: usize) -> Self {
        Self {
            base_prefix: base_prefix.into(),
            start: start.clamp(MIN_OCTET, MAX_OCTET) as u8,
            end: end.clamp(MIN_OCTET, MAX_OCTET) as u8,
            worker_budget: worker_budget.max(1),
        }
    }

    pub fn base_prefix(&self) -> &str {
        &self.base_prefix
    }

    pub fn start(&self) -> u8 {
        self.start
    }

    pub fn end(&self) -> u8 {
        self.end
    }

    pub fn worker_budget(&self) -> usize {
        self.worker_budget
    }

    /// Number of addresses; zero when start > end
    pub fn len(&self) -> usize {
        if self.start > self.end {
            0
        } else {
            (self.end - self.start) as usize + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Effective pool size: min(worker_budget, address count)
    pub fn parallelism(&self) -> usize {
        self.worker_budget.min(self.len()).max(1)
    }

    /// Expand into host strings in ascending octet order
    pub fn addresses(&self) -> Vec<String> {
        (self.start..=self.end)
            .map(|octet| format!("{}{}", self.base_prefix, octet))
            .collect()
    }
}

impl Default for AddressRange {
    fn default() -> Self {
        Self::new("192.168.1.", 1, 20, 50)
    }
}

/// Liveness record for a single address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRecord {
    pub ip: String,
    pub hostname: String,
    pub alive: bool,
}

impl HostRecord {
    pub fn new(ip: impl Into<String>, hostname: Option<String>, alive: bool) -> Self {
        Self {
            ip: ip.into(),
            hostname: hostname.unwrap_or_else(|| UNRESOLVED_HOSTNAME.to_string()),
            alive,
        }
    }

    pub fn unreachable(ip: impl Into<String>) -> Self {
        Self::new(ip, None, false)
    }

    /// Numeric octets of the address; unparsable parts count as 0
    pub fn sort_key(&self) -> [u32; 4] {
        let mut key = [0u32; 4];
        for (slot, part) in key.iter_mut().zip(self.ip.split('.')) {
            *slot = part.trim().parse().unwrap_or(0);
        }
        key
    }
}

/// Sort hosts by numeric IP, so 192.168.1.2 precedes 192.168.1.10
pub fn sort_hosts(hosts: &mut [HostRecord]) {
    hosts.sort_by_key(HostRecord::sort_key);
}

/// Liveness and name lookup for a single IPv4 address
#[async_trait::async_trait]
pub trait ReachabilityProbe: Send + Sync {
    /// Whether the host answered within the deadline. Never fails.
    async fn is_alive(&self, ip: Ipv4Addr) -> bool;

    /// Best-effort reverse name
    async fn resolve_name(&self, ip: Ipv4Addr) -> Option<String>;

    /// Probe one address string. Unparsable addresses are reported unreachable.
    async fn probe_host(&self, address: &str) -> HostRecord {
        let ip = match address.parse::<Ipv4Addr>() {
            Ok(ip) => ip,
            Err(_) => {
                log::debug!("{} is not an IPv4 address, marking unreachable", address);
                return HostRecord::unreachable(address);
            }
        };

        if !self.is_alive(ip).await {
            return HostRecord::unreachable(address);
        }

        let hostname = self.resolve_name(ip).await;
        HostRecord::new(address, hostname, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_clamping() {
        let range = AddressRange::new("10.0.0.", 0, 300, 8);
        assert_eq!(range.start(), 1);
        assert_eq!(range.end(), 254);
        assert_eq!(range.len(), 254);
    }

    #[test]
    fn test_inverted_range_is_empty() {
        let range = AddressRange::new("10.0.0.", 9, 3, 8);
        assert!(range.is_empty());
        assert!(range.addresses().is_empty());
    }

    #[test]
    fn test_parallelism_is_bounded_by_address_count() {
        assert_eq!(AddressRange::new("10.0.0.", 1, 3, 50).parallelism(), 3);
        assert_eq!(AddressRange::new("10.0.0.", 1, 100, 8).parallelism(), 8);
        assert_eq!(AddressRange::new("10.0.0.", 1, 3, 0).worker_budget(), 1);
    }

    #[test]
    fn test_addresses_are_expanded_in_order() {
        let range = AddressRange::new("172.16.5.", 8, 11, 2);
        assert_eq!(
            range.addresses(),
            vec!["172.16.5.8", "172.16.5.9", "172.16.5.10", "172.16.5.11"]
        );
    }

    #[test]
    fn test_numeric_sort() {
        let mut hosts = vec![
            HostRecord::unreachable("192.168.1.10"),
            HostRecord::unreachable("192.168.1.2"),
            HostRecord::unreachable("192.168.1.1"),
        ];
        sort_hosts(&mut hosts);
        let ips: Vec<_> = hosts.iter().map(|h| h.ip.as_str()).collect();
        assert_eq!(ips, vec!["192.168.1.1", "192.168.1.2", "192.168.1.10"]);
    }

    #[test]
    fn test_unreachable_uses_sentinel() {
        let host = HostRecord::unreachable("10.0.0.1");
        assert_eq!(host.hostname, UNRESOLVED_HOSTNAME);
        assert!(!host.alive);
    }
}
