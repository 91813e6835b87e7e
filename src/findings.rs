//! Finding classification - severity, summary and remediation for probe results

use crate::probes::{LoginOutcome, ProbeResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity level for findings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Warning,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classified, actionable reading of one probe result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub summary: String,
    pub remediation: Vec<String>,
    pub description: String,
    pub source: ProbeResult,
}

impl Finding {
    /// True when the finding carries remediation steps
    pub fn is_actionable(&self) -> bool {
        !self.remediation.is_empty()
    }
}

fn status_text(status: Option<u16>) -> String {
    status.map(|s| s.to_string()).unwrap_or_else(|| "n/a".to_string())
}

/// Map a probe result to a finding. Pure: no I/O, same input gives the same output.
pub fn classify(result: &ProbeResult, description: &str) -> Finding {
    let (severity, summary, remediation) = match result {
        ProbeResult::BasicAuth {
            credential,
            status_code,
            success,
            error,
            ..
        } => {
            if *success {
                (
                    Severity::High,
                    format!("Login possible with: {} / {}", credential.username, credential.password),
                    vec![
                        format!("Change the password for \"{}\" immediately or disable the account", credential.username),
                        "Enforce HTTPS and put Basic-Auth behind additional authentication or a VPN".to_string(),
                        "Review access logs for suspicious activity".to_string(),
                    ],
                )
            } else if status_code.map_or(false, |s| s >= 400) {
                (
                    Severity::Info,
                    format!("Access denied ({} / {})", credential.username, credential.password),
                    Vec::new(),
                )
            } else if let Some(error) = error {
                (Severity::Warning, format!("Test failed: {}", error), Vec::new())
            } else {
                (Severity::Info, "No action needed".to_string(), Vec::new())
            }
        }

        ProbeResult::BackdoorFile {
            path,
            status_code,
            found,
            ..
        } => {
            if *found {
                (
                    Severity::Critical,
                    format!("File reachable: {} (HTTP {})", path, status_text(*status_code)),
                    vec![
                        format!("Remove or block \"{}\" from the web root immediately", path),
                        "Isolate the server and investigate it forensically if needed".to_string(),
                        "Rotate all secrets, keys and passwords".to_string(),
                    ],
                )
            } else {
                (Severity::Info, format!("File not reachable: {}", path), Vec::new())
            }
        }

        ProbeResult::HttpAccess { status_code, .. } => match status_code {
            Some(status) if *status < 400 => (
                Severity::Info,
                format!("HTTP reachable (status {})", status),
                vec!["Enforce HTTPS and review security headers (HSTS)".to_string()],
            ),
            _ => (
                Severity::Info,
                format!("Not reachable or error (status {})", status_text(*status_code)),
                Vec::new(),
            ),
        },

        ProbeResult::SshAccess { credential, outcome, .. } | ProbeResult::FtpAccess { credential, outcome, .. } => {
            let proto = if matches!(result, ProbeResult::SshAccess { .. }) { "SSH" } else { "FTP" };
            match outcome {
                LoginOutcome::Success => (
                    Severity::Critical,
                    format!("{} login possible with: {} / {}", proto, credential.username, credential.password),
                    vec![
                        format!("Change the password for \"{}\" immediately or lock the account", credential.username),
                        "Disable password authentication (SSH) and allow keys only".to_string(),
                        "Restrict access to the service ports and review logins".to_string(),
                    ],
                ),
                LoginOutcome::Unavailable => (
                    Severity::Info,
                    format!("{} test skipped (no {} client support)", proto, proto),
                    Vec::new(),
                ),
                LoginOutcome::Rejected | LoginOutcome::Failed(_) => (
                    Severity::Info,
                    format!("{} login not possible ({} / {})", proto, credential.username, credential.password),
                    Vec::new(),
                ),
            }
        }

        ProbeResult::Unknown => (Severity::Info, "Unknown finding".to_string(), Vec::new()),
    };

    Finding {
        severity,
        summary,
        remediation,
        description: description.to_string(),
        source: result.clone(),
    }
}
