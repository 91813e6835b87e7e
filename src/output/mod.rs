//! Output: incremental progress reporting for sweeps and exposure scans
//!
//! The reporter turns the lazy sweep/pipeline streams into units for an
//! external consumer. Every report ends with exactly one terminal unit with
//! `done = true`, also when the underlying stream fails or panics.

use crate::discovery::{sort_hosts, AddressRange, HostRecord, HostSweeper, ReachabilityProbe, SweepProgress};
use crate::findings::{Finding, Severity};
use crate::probes::ExposureProbes;
use crate::scanner::{ExposurePipeline, ScanStep, ScanTarget};
use crate::ScanError;
use colored::*;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Sweep report unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SweepUnit {
    Progress {
        processed: usize,
        total: usize,
        host: HostRecord,
    },
    Complete {
        hosts: Vec<HostRecord>,
        done: bool,
    },
    Failed {
        error: String,
        done: bool,
    },
}

impl SweepUnit {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SweepUnit::Progress { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SweepUnit::Failed { .. })
    }
}

/// Exposure scan report unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScanUnit {
    Progress {
        step: usize,
        total: usize,
        description: String,
        finding: Finding,
        /// Findings produced so far, including this one
        findings: usize,
        /// Findings so far at warning severity or above
        issues: usize,
    },
    Complete {
        target: String,
        findings: Vec<Finding>,
        done: bool,
    },
    Failed {
        target: String,
        error: String,
        done: bool,
    },
}

impl ScanUnit {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ScanUnit::Progress { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ScanUnit::Failed { .. })
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("scan aborted: {}", msg)
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("scan aborted: {}", msg)
    } else {
        "scan aborted: internal error".to_string()
    }
}

/// Poll the next item, turning a panic inside the stream into an error message
async fn next_guarded<S>(inner: &mut S) -> Result<Option<S::Item>, String>
where
    S: Stream + Unpin,
{
    AssertUnwindSafe(inner.next()).catch_unwind().await.map_err(panic_message)
}

enum Phase<S, A> {
    Running(S, A),
    Finished,
}

/// Progress unit per host, then the full host list sorted by numeric IP
pub fn report_sweep<S>(progress: S) -> impl Stream<Item = SweepUnit> + Send
where
    S: Stream<Item = SweepProgress> + Send + 'static,
{
    let start: Phase<BoxStream<'static, SweepProgress>, Vec<HostRecord>> = Phase::Running(progress.boxed(), Vec::new());

    stream::unfold(start, |phase| async move {
        let (mut inner, mut hosts) = match phase {
            Phase::Running(inner, hosts) => (inner, hosts),
            Phase::Finished => return None,
        };

        match next_guarded(&mut inner).await {
            Ok(Some(SweepProgress { processed, total, host })) => {
                hosts.push(host.clone());
                Some((SweepUnit::Progress { processed, total, host }, Phase::Running(inner, hosts)))
            }
            Ok(None) => {
                sort_hosts(&mut hosts);
                Some((SweepUnit::Complete { hosts, done: true }, Phase::Finished))
            }
            Err(error) => {
                log::error!("Sweep failed: {}", error);
                Some((SweepUnit::Failed { error, done: true }, Phase::Finished))
            }
        }
    })
}

struct ScanState {
    target: String,
    total: usize,
    findings: Vec<Finding>,
}

/// Progress unit per step, then the complete finding list. The first error
/// (or panic) ends the report with a `Failed` unit instead.
pub fn report_scan<S>(target: String, total: usize, steps: S) -> impl Stream<Item = ScanUnit> + Send
where
    S: Stream<Item = crate::Result<ScanStep>> + Send + 'static,
{
    let state = ScanState {
        target,
        total,
        findings: Vec::new(),
    };
    let start: Phase<BoxStream<'static, crate::Result<ScanStep>>, ScanState> = Phase::Running(steps.boxed(), state);

    stream::unfold(start, |phase| async move {
        let (mut inner, mut state) = match phase {
            Phase::Running(inner, state) => (inner, state),
            Phase::Finished => return None,
        };

        let failure = match next_guarded(&mut inner).await {
            Ok(Some(Ok(ScanStep { step, description, finding }))) => {
                state.findings.push(finding.clone());
                let issues = state.findings.iter().filter(|f| f.severity >= Severity::Warning).count();
                let unit = ScanUnit::Progress {
                    step,
                    total: state.total,
                    description,
                    finding,
                    findings: state.findings.len(),
                    issues,
                };
                return Some((unit, Phase::Running(inner, state)));
            }
            Ok(None) => {
                let unit = ScanUnit::Complete {
                    target: state.target,
                    findings: state.findings,
                    done: true,
                };
                return Some((unit, Phase::Finished));
            }
            Ok(Some(Err(e))) => e.to_string(),
            Err(panic) => panic,
        };

        log::error!("Exposure scan of {} failed: {}", state.target, failure);
        let unit = ScanUnit::Failed {
            target: state.target,
            error: failure,
            done: true,
        };
        Some((unit, Phase::Finished))
    })
}

/// Parse `raw_target` and report a full pipeline run against it
pub fn scan_report<P>(pipeline: &ExposurePipeline<P>, raw_target: &str) -> BoxStream<'static, ScanUnit>
where
    P: ExposureProbes + 'static,
{
    match ScanTarget::parse(raw_target) {
        Ok(target) => {
            let steps = pipeline.run(&target).map(Ok);
            report_scan(target.requested().to_string(), pipeline.step_count(), steps).boxed()
        }
        Err(e) => {
            log::error!("Rejected scan target {:?}: {}", raw_target, e);
            let unit = ScanUnit::Failed {
                target: raw_target.trim().to_string(),
                error: e.to_string(),
                done: true,
            };
            stream::iter(vec![unit]).boxed()
        }
    }
}

/// Report a sweep of `range`
pub fn sweep_report<P>(sweeper: &HostSweeper<P>, range: &AddressRange) -> BoxStream<'static, SweepUnit>
where
    P: ReachabilityProbe + 'static,
{
    report_sweep(sweeper.sweep_stream(range)).boxed()
}

fn transport_closed(err: std::io::Error) -> ScanError {
    ScanError::OutputError(format!("report transport closed: {}", err))
}

/// Write each unit as one JSON line, flushing after every unit.
///
/// A write failure stops pulling from `units`, which cancels the remaining
/// sweep or scan.
pub async fn write_ndjson<W, S, T>(writer: &mut W, units: S) -> crate::Result<usize>
where
    W: AsyncWrite + Unpin,
    S: Stream<Item = T>,
    T: Serialize,
{
    let mut units = Box::pin(units);
    let mut written = 0;

    while let Some(unit) = units.next().await {
        let mut line = serde_json::to_vec(&unit)?;
        line.push(b'\n');
        writer.write_all(&line).await.map_err(transport_closed)?;
        writer.flush().await.map_err(transport_closed)?;
        written += 1;
    }

    Ok(written)
}

/// Severity label colored for terminal output
pub fn severity_label(severity: Severity) -> ColoredString {
    let label = format!("[{}]", severity.as_str().to_uppercase());
    match severity {
        Severity::Info => label.bright_blue(),
        Severity::Warning => label.bright_yellow(),
        Severity::High => label.bright_red(),
        Severity::Critical => label.red().bold(),
    }
}

/// One-line terminal rendering of a host record
pub fn format_host(host: &HostRecord) -> String {
    let state = if host.alive { "up".bright_green() } else { "down".bright_black() };
    format!("{:<16} {:<6} {}", host.ip, state, host.hostname)
}

/// Terminal rendering of a scan step with its remediation steps
pub fn format_step(step: usize, total: usize, finding: &Finding) -> String {
    let mut out = format!(
        "[{:>2}/{}] {} {} - {}",
        step,
        total,
        severity_label(finding.severity),
        finding.description,
        finding.summary
    );
    for action in &finding.remediation {
        out.push_str(&format!("\n          -> {}", action));
    }
    out
}
