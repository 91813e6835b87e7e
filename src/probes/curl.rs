//! External-process Basic-Auth transport (system curl)

use super::*;
use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

pub const CURL_NOT_INSTALLED: &str = "curl not installed";

/// Extract the `%{http_code}` value; `000` means curl never got a response
pub fn parse_http_code(stdout: &str) -> Option<u16> {
    let code = stdout.trim();
    if code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    match code.parse::<u16>() {
        Ok(0) | Err(_) => None,
        Ok(status) => Some(status),
    }
}

/// Why a curl run produced no usable status
enum CurlFailure {
    NotInstalled,
    Unusable(String),
}

/// Basic-Auth through a curl child process
#[derive(Clone)]
pub struct CurlBasicAuth {
    program: String,
    timeout: Duration,
    fallback: Option<Arc<dyn BasicAuthStrategy>>,
}

impl CurlBasicAuth {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
            fallback: None,
        }
    }

    /// Strategy used when curl runs but yields no usable status
    pub fn with_fallback(mut self, fallback: Arc<dyn BasicAuthStrategy>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    async fn run(&self, url: &str, credential: &Credential) -> Result<u16, CurlFailure> {
        let mut command = Command::new(&self.program);
        command
            .arg("-s")
            .arg("-o")
            .arg("/dev/null")
            .arg("-w")
            .arg("%{http_code}")
            .arg("--max-time")
            .arg(self.timeout.as_secs().max(1).to_string())
            .arg("-u")
            .arg(format!("{}:{}", credential.username, credential.password))
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let output = match timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) if e.kind() == ErrorKind::NotFound => return Err(CurlFailure::NotInstalled),
            Ok(Err(e)) => return Err(CurlFailure::Unusable(format!("failed to run curl: {}", e))),
            Err(_) => return Err(CurlFailure::Unusable(format!("curl timed out after {:?}", self.timeout))),
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_http_code(&stdout).ok_or_else(|| CurlFailure::Unusable(format!("unexpected curl output {:?}", stdout.trim())))
    }

    fn result(&self, url: &str, credential: &Credential, status_code: Option<u16>, error: Option<String>) -> ProbeResult {
        ProbeResult::BasicAuth {
            transport: AuthTransport::External,
            url: url.to_string(),
            credential: credential.clone(),
            status_code,
            success: status_code.map(|s| s < 400).unwrap_or(false),
            error,
        }
    }
}

/// Mark a native result as the answer to an external attempt
fn relabel_as_fallback(result: ProbeResult) -> ProbeResult {
    match result {
        ProbeResult::BasicAuth {
            url,
            credential,
            status_code,
            success,
            error,
            ..
        } => ProbeResult::BasicAuth {
            transport: AuthTransport::ExternalFallback,
            url,
            credential,
            status_code,
            success,
            error,
        },
        other => other,
    }
}

#[async_trait::async_trait]
impl BasicAuthStrategy for CurlBasicAuth {
    fn transport(&self) -> AuthTransport {
        AuthTransport::External
    }

    async fn attempt(&self, url: &str, credential: &Credential) -> ProbeResult {
        match self.run(url, credential).await {
            Ok(status) => self.result(url, credential, Some(status), None),
            Err(CurlFailure::NotInstalled) => {
                log::debug!("{} not found, external Basic-Auth unavailable", self.program);
                self.result(url, credential, None, Some(CURL_NOT_INSTALLED.to_string()))
            }
            Err(CurlFailure::Unusable(reason)) => match &self.fallback {
                Some(fallback) => {
                    log::debug!("curl unusable for {} ({}), using {} transport", url, reason, fallback.transport().label());
                    relabel_as_fallback(fallback.attempt(url, credential).await)
                }
                None => self.result(url, credential, None, Some(reason)),
            },
        }
    }
}
