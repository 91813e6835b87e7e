//! Discovery methods implementation - ICMP echo via the system ping, reverse DNS

use super::*;
use crate::config::ScanConfig;
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::TokioResolver;
use std::net::{IpAddr, Ipv4Addr};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

/// ICMP-based reachability probe
#[derive(Clone)]
pub struct IcmpProbe {
    ping_path: String,
    ping_timeout: Duration,
    dns_timeout: Duration,
    resolver: Option<TokioResolver>,
}

impl IcmpProbe {
    pub fn new(ping_timeout: Duration, dns_timeout: Duration) -> Self {
        let resolver = match TokioResolver::builder(TokioConnectionProvider::default()) {
            Ok(builder) => Some(builder.build()),
            Err(e) => {
                log::warn!("Reverse DNS disabled, no system resolver: {}", e);
                None
            }
        };

        Self {
            ping_path: "ping".to_string(),
            ping_timeout,
            dns_timeout,
            resolver,
        }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self::new(config.ping_timeout(), config.dns_timeout()).with_ping_path(config.ping_path.clone())
    }

    pub fn with_ping_path(mut self, path: impl Into<String>) -> Self {
        self.ping_path = path.into();
        self
    }

    /// `-W` takes whole seconds on Linux iputils
    fn deadline_secs(&self) -> u64 {
        let millis = self.ping_timeout.as_millis() as u64;
        millis.div_ceil(1000).max(1)
    }

    async fn ping_host(&self, target: Ipv4Addr) -> std::io::Result<bool> {
        let status = Command::new(&self.ping_path)
            .arg("-c")
            .arg("1")
            .arg("-W")
            .arg(self.deadline_secs().to_string())
            .arg(target.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await?;

        Ok(status.success())
    }
}

impl Default for IcmpProbe {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_millis(500))
    }
}

#[async_trait::async_trait]
impl ReachabilityProbe for IcmpProbe {
    async fn is_alive(&self, ip: Ipv4Addr) -> bool {
        // ping enforces its own deadline; the outer bound covers a hung process
        let outer = self.ping_timeout + Duration::from_secs(1);
        let alive = match timeout(outer, self.ping_host(ip)).await {
            Ok(Ok(alive)) => alive,
            Ok(Err(e)) => {
                log::debug!("ping {} failed to run: {}", ip, e);
                false
            }
            Err(_) => false,
        };

        log::debug!("{} alive={}", ip, alive);
        alive
    }

    async fn resolve_name(&self, ip: Ipv4Addr) -> Option<String> {
        let resolver = self.resolver.as_ref()?;

        let lookup = match timeout(self.dns_timeout, resolver.reverse_lookup(IpAddr::V4(ip))).await {
            Ok(Ok(lookup)) => lookup,
            Ok(Err(e)) => {
                log::trace!("reverse lookup for {} failed: {}", ip, e);
                return None;
            }
            Err(_) => {
                log::trace!("reverse lookup for {} timed out", ip);
                return None;
            }
        };

        lookup
            .iter()
            .map(|name| name.to_string().trim_end_matches('.').to_string())
            .find(|name| !name.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline_rounds_up_to_seconds() {
        let probe = IcmpProbe::new(Duration::from_millis(1500), Duration::from_millis(500));
        assert_eq!(probe.deadline_secs(), 2);

        let probe = IcmpProbe::new(Duration::from_millis(200), Duration::from_millis(500));
        assert_eq!(probe.deadline_secs(), 1);
    }

    #[tokio::test]
    async fn test_missing_ping_binary_is_not_alive() {
        let probe = IcmpProbe::default().with_ping_path("/nonexistent/ping-binary");
        let host = probe.probe_host("127.0.0.1").await;
        assert!(!host.alive);
        assert_eq!(host.hostname, UNRESOLVED_HOSTNAME);
    }
}
