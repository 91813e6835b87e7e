//! Gatecheck - LAN host discovery and exposure auditing
//!
//! Sweeps an IPv4 /24 slice for live hosts and runs a fixed battery of
//! exposure probes (HTTP, Basic-Auth, sensitive files, SSH, FTP) against a
//! single target, classifying every result into an actionable finding.

pub mod config;
pub mod discovery;
pub mod error;
pub mod findings;
pub mod output;
pub mod probes;
pub mod scanner;

// Re-export commonly used types
pub use config::ScanConfig;
pub use discovery::{AddressRange, HostRecord, HostSweeper, IcmpProbe, ReachabilityProbe, SweepProgress};
pub use error::{ScanError, ScanResult};
pub use findings::{classify, Finding, Severity};
pub use output::{scan_report, sweep_report, write_ndjson, ScanUnit, SweepUnit};
pub use probes::{AuthTransport, Credential, ExposureProbes, LoginOutcome, NetworkProbes, ProbeResult};
pub use scanner::{ExposurePipeline, ScanStep, ScanTarget};

pub type Result<T> = std::result::Result<T, ScanError>;
