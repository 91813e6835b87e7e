//! Exposure probes - single network checks against one target
//!
//! Every probe performs one bounded network interaction and reports what
//! happened as a `ProbeResult`. Probes never return errors; timeouts, refused
//! connections and rejected logins are all part of the result.

pub mod curl;
pub mod ftp;
pub mod http;
pub mod ssh;

use crate::config::ScanConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub use curl::CurlBasicAuth;
pub use ftp::FtpProbe;
pub use http::{HttpProbe, ReqwestBasicAuth};
pub use ssh::{SshCapability, SshProbe};

/// Well-known weak credential pairs, tried in this order
pub const DEFAULT_CREDENTIALS: [(&str, &str); 11] = [
    ("guest", "guest"),
    ("admin", "admin"),
    ("admin", "12345"),
    ("admin", "password"),
    ("administrator", "administrator"),
    ("root", "root"),
    ("root", "12345"),
    ("test", "test"),
    ("anonymous", "anonymous"),
    ("gast", "gast"),
    ("user", "user"),
];

/// Web paths that should never be reachable on a production host
pub const BACKDOOR_FILES: [&str; 11] = [
    "/shell.php",
    "/backdoor.php",
    "/cmd.php",
    "/.htaccess",
    "/config.php",
    "/webshell.php",
    "/admin.php",
    "/wp-admin/",
    "/phpmyadmin/",
    "/.env",
    "/web.config",
];

/// Username/password pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.username, self.password)
    }
}

/// The fixed credential catalogue as owned values
pub fn default_credentials() -> Vec<Credential> {
    DEFAULT_CREDENTIALS
        .iter()
        .map(|(user, pass)| Credential::new(*user, *pass))
        .collect()
}

pub fn default_backdoor_paths() -> Vec<String> {
    BACKDOOR_FILES.iter().map(|p| p.to_string()).collect()
}

/// Transport used for a Basic-Auth attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthTransport {
    /// In-process HTTP client
    Native,
    /// System curl process
    External,
    /// curl ran but its output was unusable; the native client answered instead
    ExternalFallback,
}

impl AuthTransport {
    pub fn label(&self) -> &'static str {
        match self {
            AuthTransport::Native => "native",
            AuthTransport::External => "curl",
            AuthTransport::ExternalFallback => "curl-fallback",
        }
    }
}

/// Outcome of an SSH or FTP login attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum LoginOutcome {
    Success,
    /// The server answered and refused the credential
    Rejected,
    /// This build or configuration cannot perform the probe at all
    Unavailable,
    /// Transport or protocol failure before a verdict
    Failed(String),
}

impl LoginOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, LoginOutcome::Success)
    }
}

/// Raw outcome of one probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProbeResult {
    HttpAccess {
        url: String,
        status_code: Option<u16>,
        accessible: bool,
        #[serde(default)]
        headers: BTreeMap<String, String>,
        error: Option<String>,
    },
    BasicAuth {
        transport: AuthTransport,
        url: String,
        credential: Credential,
        status_code: Option<u16>,
        success: bool,
        error: Option<String>,
    },
    BackdoorFile {
        path: String,
        url: String,
        status_code: Option<u16>,
        found: bool,
        error: Option<String>,
    },
    SshAccess {
        host: String,
        port: u16,
        credential: Credential,
        outcome: LoginOutcome,
    },
    FtpAccess {
        host: String,
        port: u16,
        credential: Credential,
        outcome: LoginOutcome,
    },
    /// Result kind this build does not know (only produced by deserialisation)
    #[serde(other)]
    Unknown,
}

impl ProbeResult {
    /// Wire tag of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            ProbeResult::HttpAccess { .. } => "http_access",
            ProbeResult::BasicAuth { .. } => "basic_auth",
            ProbeResult::BackdoorFile { .. } => "backdoor_file",
            ProbeResult::SshAccess { .. } => "ssh_access",
            ProbeResult::FtpAccess { .. } => "ftp_access",
            ProbeResult::Unknown => "unknown",
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ProbeResult::HttpAccess { error, .. }
            | ProbeResult::BasicAuth { error, .. }
            | ProbeResult::BackdoorFile { error, .. } => error.as_deref(),
            ProbeResult::SshAccess { outcome, .. } | ProbeResult::FtpAccess { outcome, .. } => match outcome {
                LoginOutcome::Failed(msg) => Some(msg.as_str()),
                _ => None,
            },
            ProbeResult::Unknown => None,
        }
    }
}

/// One Basic-Auth transport
#[async_trait::async_trait]
pub trait BasicAuthStrategy: Send + Sync {
    fn transport(&self) -> AuthTransport;

    async fn attempt(&self, url: &str, credential: &Credential) -> ProbeResult;
}

/// The probe set the exposure pipeline drives
#[async_trait::async_trait]
pub trait ExposureProbes: Send + Sync {
    /// Unauthenticated GET of the target root
    async fn http_access(&self, url: &str) -> ProbeResult;

    /// Basic-Auth attempt over the chosen transport
    async fn basic_auth(&self, transport: AuthTransport, url: &str, credential: &Credential) -> ProbeResult;

    /// Existence check for one sensitive path below `base_url`
    async fn backdoor_file(&self, base_url: &str, path: &str) -> ProbeResult;

    async fn ssh_access(&self, host: &str, credential: &Credential) -> ProbeResult;

    async fn ftp_access(&self, host: &str, credential: &Credential) -> ProbeResult;
}

/// Probes backed by real network clients
pub struct NetworkProbes {
    http: HttpProbe,
    native_auth: Arc<ReqwestBasicAuth>,
    external_auth: CurlBasicAuth,
    ssh: SshProbe,
    ftp: FtpProbe,
}

impl NetworkProbes {
    pub fn new(config: &ScanConfig) -> crate::Result<Self> {
        let http = HttpProbe::new(config.http_timeout())?;
        let native_auth = Arc::new(ReqwestBasicAuth::new(config.http_timeout())?);
        let external_auth = CurlBasicAuth::new(config.curl_path.clone(), config.curl_timeout())
            .with_fallback(native_auth.clone());
        let ssh = SshProbe::new(config.ssh_port, config.ssh_timeout(), config.ssh_capability());
        let ftp = FtpProbe::new(config.ftp_port, config.ftp_timeout());

        log::debug!("SSH capability: {:?}", ssh.capability());

        Ok(Self {
            http,
            native_auth,
            external_auth,
            ssh,
            ftp,
        })
    }

    fn strategy(&self, transport: AuthTransport) -> &dyn BasicAuthStrategy {
        match transport {
            AuthTransport::Native => self.native_auth.as_ref(),
            AuthTransport::External | AuthTransport::ExternalFallback => &self.external_auth,
        }
    }
}

#[async_trait::async_trait]
impl ExposureProbes for NetworkProbes {
    async fn http_access(&self, url: &str) -> ProbeResult {
        self.http.access(url).await
    }

    async fn basic_auth(&self, transport: AuthTransport, url: &str, credential: &Credential) -> ProbeResult {
        self.strategy(transport).attempt(url, credential).await
    }

    async fn backdoor_file(&self, base_url: &str, path: &str) -> ProbeResult {
        self.http.backdoor_file(base_url, path).await
    }

    async fn ssh_access(&self, host: &str, credential: &Credential) -> ProbeResult {
        self.ssh.attempt(host, credential).await
    }

    async fn ftp_access(&self, host: &str, credential: &Credential) -> ProbeResult {
        self.ftp.attempt(host, credential).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogue_sizes() {
        assert_eq!(default_credentials().len(), 11);
        assert_eq!(default_backdoor_paths().len(), 11);
        assert_eq!(default_credentials()[0], Credential::new("guest", "guest"));
        assert!(default_backdoor_paths().contains(&"/.env".to_string()));
    }

    #[test]
    fn test_result_tagging() {
        let result = ProbeResult::SshAccess {
            host: "10.0.0.5".to_string(),
            port: 22,
            credential: Credential::new("root", "root"),
            outcome: LoginOutcome::Failed("connection refused".to_string()),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["type"], "ssh_access");
        assert_eq!(json["outcome"]["status"], "failed");
        assert_eq!(result.error(), Some("connection refused"));
    }

    #[test]
    fn test_unrecognised_tag_deserialises_as_unknown() {
        let result: ProbeResult = serde_json::from_str(r#"{"type":"telnet_access"}"#).unwrap();
        assert_eq!(result, ProbeResult::Unknown);
        assert_eq!(result.kind(), "unknown");
    }
}
