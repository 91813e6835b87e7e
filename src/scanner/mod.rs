//! Scanner module containing the exposure probing pipeline

pub mod pipeline;

use crate::findings::Finding;
use crate::probes::ProbeResult;
use crate::{Result, ScanError};
use reqwest::Url;
use serde::{Deserialize, Serialize};

pub use pipeline::{ExposurePipeline, PlannedProbe};

/// Normalised scan target: a bare host or URL, `http://` assumed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTarget {
    requested: String,
    base_url: String,
    host: String,
}

impl ScanTarget {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ScanError::InvalidTarget("target cannot be empty".to_string()));
        }

        let lowered = trimmed.to_ascii_lowercase();
        let with_scheme = if lowered.starts_with("http://") || lowered.starts_with("https://") {
            trimmed.to_string()
        } else {
            format!("http://{}", trimmed)
        };

        let url = Url::parse(&with_scheme)
            .map_err(|e| ScanError::InvalidTarget(format!("{}: {}", trimmed, e)))?;

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .map(|h| h.trim_start_matches('[').trim_end_matches(']').to_string())
            .ok_or_else(|| ScanError::InvalidTarget(format!("{}: missing host", trimmed)))?;

        Ok(Self {
            requested: trimmed.to_string(),
            base_url: url.origin().ascii_serialization(),
            host,
        })
    }

    /// Target as the caller wrote it
    pub fn requested(&self) -> &str {
        &self.requested
    }

    /// scheme://host[:port], without path
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Bare host for SSH/FTP probes
    pub fn host(&self) -> &str {
        &self.host
    }
}

/// One classified pipeline step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStep {
    /// 1-based, contiguous within one scan
    pub step: usize,
    pub description: String,
    pub finding: Finding,
}

impl ScanStep {
    pub fn result(&self) -> &ProbeResult {
        &self.finding.source
    }
}
