//! Stress tests for the gatecheck host sweeper
//! Worker-pool bounds and ordering under load

use async_trait::async_trait;
use gatecheck::discovery::{sort_hosts, AddressRange, HostRecord, HostSweeper, ReachabilityProbe};
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[cfg(test)]
mod stress_tests {
    use super::*;
    use proptest::prelude::*;

    /// Tracks how many liveness checks overlap
    #[derive(Default)]
    struct CountingProber {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ReachabilityProbe for CountingProber {
        async fn is_alive(&self, ip: Ipv4Addr) -> bool {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.calls.fetch_add(1, Ordering::SeqCst);

            // Uneven latency so completion order differs from address order
            let jitter = (ip.octets()[3] % 7) as u64;
            tokio::time::sleep(Duration::from_millis(5 + jitter * 3)).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            ip.octets()[3] % 3 == 0
        }

        async fn resolve_name(&self, ip: Ipv4Addr) -> Option<String> {
            Some(format!("host-{}", ip.octets()[3]))
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_full_subnet_respects_worker_budget() {
        let prober = Arc::new(CountingProber::default());
        let sweeper = HostSweeper::from_shared(Arc::clone(&prober));
        let range = AddressRange::new("172.16.0.", 1, 254, 16);

        let hosts = sweeper.sweep(&range).await;

        assert_eq!(hosts.len(), 254);
        assert_eq!(prober.calls.load(Ordering::SeqCst), 254);
        assert!(prober.peak.load(Ordering::SeqCst) <= 16);
        assert!(prober.peak.load(Ordering::SeqCst) > 1);

        let alive = hosts.iter().filter(|h| h.alive).count();
        assert_eq!(alive, (1..=254).filter(|n| n % 3 == 0).count());
        assert!(hosts.iter().filter(|h| !h.alive).all(|h| h.hostname == "-"));
        assert_eq!(hosts[2].hostname, "host-3");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_budget_larger_than_range() {
        let prober = Arc::new(CountingProber::default());
        let sweeper = HostSweeper::from_shared(Arc::clone(&prober));
        let range = AddressRange::new("172.16.0.", 1, 5, 500);

        assert_eq!(range.parallelism(), 5);
        let hosts = sweeper.sweep(&range).await;

        assert_eq!(hosts.len(), 5);
        assert!(prober.peak.load(Ordering::SeqCst) <= 5);
    }

    proptest! {
        #[test]
        fn prop_range_is_clamped(start in -1000i64..1000, end in -1000i64..1000, budget in 0usize..400) {
            let range = AddressRange::new("10.0.0.", start, end, budget);

            prop_assert!((1..=254).contains(&range.start()));
            prop_assert!((1..=254).contains(&range.end()));
            prop_assert!(range.worker_budget() >= 1);
            prop_assert!(range.parallelism() >= 1);
            prop_assert_eq!(range.addresses().len(), range.len());
        }

        #[test]
        fn prop_sort_is_numeric(mut octets in proptest::collection::vec(1u8..=254, 0..60)) {
            let mut hosts: Vec<HostRecord> = octets
                .iter()
                .map(|o| HostRecord::unreachable(format!("192.168.1.{}", o)))
                .collect();
            sort_hosts(&mut hosts);

            octets.sort_unstable();
            let sorted: Vec<String> = octets.iter().map(|o| format!("192.168.1.{}", o)).collect();
            let ips: Vec<String> = hosts.into_iter().map(|h| h.ip).collect();
            prop_assert_eq!(ips, sorted);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_sweep_covers_range_in_order(start in 1i64..=254, len in 0i64..40, budget in 1usize..20) {
            let end = (start + len).min(254);
            let runtime = tokio::runtime::Runtime::new().unwrap();
            let hosts = runtime.block_on(async {
                let sweeper = HostSweeper::new(CountingProber::default());
                sweeper.sweep(&AddressRange::new("10.9.8.", start, end, budget)).await
            });

            let expected: Vec<String> = (start..=end).map(|n| format!("10.9.8.{}", n)).collect();
            let ips: Vec<String> = hosts.iter().map(|h| h.ip.clone()).collect();
            prop_assert_eq!(ips, expected);
        }
    }
}
