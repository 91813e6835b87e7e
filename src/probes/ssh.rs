//! SSH credential probe
//!
//! Built on libssh2 when the `ssh` feature is enabled. Whether the probe may run
//! is decided by an `SshCapability` handed in at construction, so the skipped
//! branch is reachable from tests and configuration alike.

use super::*;
use std::time::Duration;

/// Whether this process can open SSH sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SshCapability {
    Available,
    Unavailable,
}

impl SshCapability {
    /// Capability compiled into this build
    pub fn detect() -> Self {
        if cfg!(feature = "ssh") {
            SshCapability::Available
        } else {
            SshCapability::Unavailable
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, SshCapability::Available)
    }
}

#[derive(Debug, Clone)]
pub struct SshProbe {
    port: u16,
    timeout: Duration,
    capability: SshCapability,
}

impl SshProbe {
    pub fn new(port: u16, timeout: Duration, capability: SshCapability) -> Self {
        Self {
            port,
            timeout,
            capability,
        }
    }

    pub fn capability(&self) -> SshCapability {
        self.capability
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn attempt(&self, host: &str, credential: &Credential) -> ProbeResult {
        let outcome = if self.capability.is_available() {
            self.login(host, credential).await
        } else {
            LoginOutcome::Unavailable
        };

        ProbeResult::SshAccess {
            host: host.to_string(),
            port: self.port,
            credential: credential.clone(),
            outcome,
        }
    }

    #[cfg(feature = "ssh")]
    async fn login(&self, host: &str, credential: &Credential) -> LoginOutcome {
        let host = host.to_string();
        let port = self.port;
        let limit = self.timeout();
        let credential = credential.clone();

        // libssh2 is blocking; the session timeout does not cover a slow resolver
        let handle = tokio::task::spawn_blocking(move || session::password_login(&host, port, limit, &credential));

        match tokio::time::timeout(limit, handle).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => LoginOutcome::Failed(crate::ScanError::from(e).to_string()),
            Err(_) => LoginOutcome::Failed(format!("timed out after {:?}", limit)),
        }
    }

    #[cfg(not(feature = "ssh"))]
    async fn login(&self, _host: &str, _credential: &Credential) -> LoginOutcome {
        LoginOutcome::Unavailable
    }
}

#[cfg(feature = "ssh")]
mod session {
    use super::{Credential, LoginOutcome};
    use ssh2::{ErrorCode, Session};
    use std::net::{TcpStream, ToSocketAddrs};
    use std::time::Duration;

    /// LIBSSH2_ERROR_AUTHENTICATION_FAILED
    const AUTH_FAILED: i32 = -18;

    pub(super) fn password_login(host: &str, port: u16, timeout: Duration, credential: &Credential) -> LoginOutcome {
        let addr = match (host, port).to_socket_addrs().map(|mut addrs| addrs.next()) {
            Ok(Some(addr)) => addr,
            Ok(None) => return LoginOutcome::Failed(format!("{} did not resolve", host)),
            Err(e) => return LoginOutcome::Failed(format!("failed to resolve {}: {}", host, e)),
        };

        let tcp = match TcpStream::connect_timeout(&addr, timeout) {
            Ok(tcp) => tcp,
            Err(e) => return LoginOutcome::Failed(format!("connect failed: {}", e)),
        };
        let _ = tcp.set_read_timeout(Some(timeout));
        let _ = tcp.set_write_timeout(Some(timeout));

        let mut sess = match Session::new() {
            Ok(sess) => sess,
            Err(e) => return LoginOutcome::Failed(format!("failed to create SSH session: {}", e)),
        };
        sess.set_tcp_stream(tcp);
        sess.set_timeout(timeout.as_millis() as u32);

        if let Err(e) = sess.handshake() {
            return LoginOutcome::Failed(format!("SSH handshake failed: {}", e));
        }

        match sess.userauth_password(&credential.username, &credential.password) {
            Ok(()) if sess.authenticated() => {
                let _ = sess.disconnect(None, "audit complete", None);
                LoginOutcome::Success
            }
            Ok(()) => LoginOutcome::Rejected,
            Err(e) if e.code() == ErrorCode::Session(AUTH_FAILED) => LoginOutcome::Rejected,
            Err(e) => LoginOutcome::Failed(format!("SSH authentication error: {}", e)),
        }
    }
}
