//! Configuration module for the gatecheck engine

use crate::discovery::AddressRange;
use crate::probes::ssh::SshCapability;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure for sweeps and exposure scans
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Address prefix for sweeps, e.g. "192.168.1."
    pub base: String,

    /// First host octet of the sweep
    pub start: i64,

    /// Last host octet of the sweep
    pub end: i64,

    /// Worker budget for the sweep pool
    pub workers: usize,

    /// Liveness ping deadline in milliseconds
    pub ping_timeout_ms: u64,

    /// Reverse DNS deadline in milliseconds
    pub dns_timeout_ms: u64,

    /// Timeout for native HTTP requests in milliseconds
    pub http_timeout_ms: u64,

    /// Timeout for the external curl process in milliseconds
    pub curl_timeout_ms: u64,

    /// SSH connect/auth timeout in milliseconds
    pub ssh_timeout_ms: u64,

    /// FTP session timeout in milliseconds
    pub ftp_timeout_ms: u64,

    pub ssh_port: u16,

    pub ftp_port: u16,

    /// curl binary used by the external Basic-Auth transport
    pub curl_path: String,

    /// ping binary used by the liveness check
    pub ping_path: String,

    /// Allow SSH probing when the build supports it
    pub ssh_enabled: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            base: "192.168.1.".to_string(),
            start: 1,
            end: 20,
            workers: 50,
            ping_timeout_ms: 1000,
            dns_timeout_ms: 500,
            http_timeout_ms: 5000,
            curl_timeout_ms: 6000,
            ssh_timeout_ms: 5000,
            ftp_timeout_ms: 5000,
            ssh_port: 22,
            ftp_port: 21,
            curl_path: "curl".to_string(),
            ping_path: "ping".to_string(),
            ssh_enabled: true,
        }
    }
}

impl ScanConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sweep range
    pub fn with_range(mut self, base: impl Into<String>, start: i64, end: i64) -> Self {
        self.base = base.into();
        self.start = start;
        self.end = end;
        self
    }

    /// Set the sweep worker budget
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_http_timeout(mut self, timeout_ms: u64) -> Self {
        self.http_timeout_ms = timeout_ms;
        self
    }

    pub fn with_ssh_port(mut self, port: u16) -> Self {
        self.ssh_port = port;
        self
    }

    pub fn with_ftp_port(mut self, port: u16) -> Self {
        self.ftp_port = port;
        self
    }

    pub fn with_curl_path(mut self, path: impl Into<String>) -> Self {
        self.curl_path = path.into();
        self
    }

    /// Force the SSH capability on or off
    pub fn with_ssh_capability(mut self, capability: SshCapability) -> Self {
        self.ssh_enabled = capability.is_available();
        self
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }

    pub fn dns_timeout(&self) -> Duration {
        Duration::from_millis(self.dns_timeout_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    pub fn curl_timeout(&self) -> Duration {
        Duration::from_millis(self.curl_timeout_ms)
    }

    pub fn ssh_timeout(&self) -> Duration {
        Duration::from_millis(self.ssh_timeout_ms)
    }

    pub fn ftp_timeout(&self) -> Duration {
        Duration::from_millis(self.ftp_timeout_ms)
    }

    /// Clamped sweep range built from this configuration
    pub fn address_range(&self) -> AddressRange {
        AddressRange::new(self.base.clone(), self.start, self.end, self.workers)
    }

    /// SSH capability of this build, narrowed by `ssh_enabled`
    pub fn ssh_capability(&self) -> SshCapability {
        if self.ssh_enabled {
            SshCapability::detect()
        } else {
            SshCapability::Unavailable
        }
    }

    /// Load configuration from TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| crate::ScanError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let config: ScanConfig = toml::from_str(&content)
            .map_err(|e| crate::ScanError::ConfigError(format!("Failed to parse TOML: {}", e)))?;

        Ok(config)
    }

    /// Load configuration from ~/.gatecheck.toml, falling back to defaults
    pub fn load_default_config() -> Self {
        let home_dir = dirs::home_dir().unwrap_or_else(|| std::path::PathBuf::from("."));
        let config_path = home_dir.join(".gatecheck.toml");

        if config_path.exists() {
            match Self::from_toml_file(&config_path) {
                Ok(config) => {
                    log::info!("Loaded config from {}", config_path.display());
                    return config;
                }
                Err(e) => log::warn!("Ignoring {}: {}", config_path.display(), e),
            }
        }

        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.base.is_empty() {
            return Err(crate::ScanError::ConfigError("Base prefix cannot be empty".to_string()));
        }

        if self.workers == 0 {
            return Err(crate::ScanError::ConfigError("Worker count must be greater than 0".to_string()));
        }

        let timeouts = [
            ("ping_timeout_ms", self.ping_timeout_ms),
            ("dns_timeout_ms", self.dns_timeout_ms),
            ("http_timeout_ms", self.http_timeout_ms),
            ("curl_timeout_ms", self.curl_timeout_ms),
            ("ssh_timeout_ms", self.ssh_timeout_ms),
            ("ftp_timeout_ms", self.ftp_timeout_ms),
        ];
        if let Some((name, _)) = timeouts.iter().find(|(_, value)| *value == 0) {
            return Err(crate::ScanError::ConfigError(format!("{} must be greater than 0", name)));
        }

        Ok(())
    }
}
