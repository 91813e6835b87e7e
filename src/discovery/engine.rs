//! Host Discovery Engine - bounded worker pool over an address range

use super::*;
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One completed probe during a streaming sweep
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepProgress {
    pub processed: usize,
    pub total: usize,
    pub host: HostRecord,
}

/// Main host discovery engine
pub struct HostSweeper<P> {
    prober: Arc<P>,
}

impl<P> Clone for HostSweeper<P> {
    fn clone(&self) -> Self {
        Self {
            prober: Arc::clone(&self.prober),
        }
    }
}

impl<P: ReachabilityProbe + 'static> HostSweeper<P> {
    pub fn new(prober: P) -> Self {
        Self {
            prober: Arc::new(prober),
        }
    }

    pub fn from_shared(prober: Arc<P>) -> Self {
        Self { prober }
    }

    /// Stream hosts in completion order with processed/total counters.
    ///
    /// At most `range.parallelism()` probes are in flight. Dropping the stream
    /// stops dispatching; probes already running finish on their own deadline.
    pub fn sweep_stream(&self, range: &AddressRange) -> impl Stream<Item = SweepProgress> + Send + 'static {
        let total = range.len();
        let workers = range.parallelism();
        let prober = Arc::clone(&self.prober);

        log::info!(
            "Sweeping {}{}-{} ({} hosts, {} workers)",
            range.base_prefix(),
            range.start(),
            range.end(),
            total,
            workers
        );

        stream::iter(range.addresses())
            .map(move |address| {
                let prober = Arc::clone(&prober);
                async move { probe_isolated(prober, address).await }
            })
            .buffer_unordered(workers)
            .enumerate()
            .map(move |(index, host)| SweepProgress {
                processed: index + 1,
                total,
                host,
            })
    }

    /// Probe every address and return records sorted by numeric IP
    pub async fn sweep(&self, range: &AddressRange) -> Vec<HostRecord> {
        let mut hosts: Vec<HostRecord> = self
            .sweep_stream(range)
            .map(|progress| progress.host)
            .collect()
            .await;

        sort_hosts(&mut hosts);

        let alive = hosts.iter().filter(|h| h.alive).count();
        log::info!("Sweep complete: {}/{} hosts alive", alive, hosts.len());
        hosts
    }
}

/// Run one probe on its own task so a panicking prober only loses its own host
async fn probe_isolated<P: ReachabilityProbe + 'static>(prober: Arc<P>, address: String) -> HostRecord {
    let task_address = address.clone();
    let handle = tokio::spawn(async move { prober.probe_host(&task_address).await });

    match handle.await {
        Ok(host) => host,
        Err(e) => {
            log::warn!("Probe for {} aborted: {}", address, crate::ScanError::from(e));
            HostRecord::unreachable(address)
        }
    }
}
