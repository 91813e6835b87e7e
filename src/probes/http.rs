//! HTTP probes: root accessibility, sensitive-file existence, native Basic-Auth

use super::*;
use reqwest::redirect::Policy;
use reqwest::Client;
use std::time::Duration;

fn build_client(timeout: Duration, redirect: Policy) -> crate::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .redirect(redirect)
        .danger_accept_invalid_certs(true)
        .build()
        .map_err(|e| crate::ScanError::ConfigError(format!("Failed to build HTTP client: {}", e)))
}

fn describe(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_connect() {
        format!("connection failed: {}", err)
    } else {
        err.to_string()
    }
}

/// Join base URL and catalogue path without doubling the slash
pub fn join_path(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Unauthenticated probes; redirects are reported, not followed
#[derive(Clone)]
pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> crate::Result<Self> {
        Ok(Self {
            client: build_client(timeout, Policy::none())?,
        })
    }

    /// One GET to the target root
    pub async fn access(&self, url: &str) -> ProbeResult {
        match self.client.get(url).send().await {
            Ok(resp) => {
                let status = resp.status().as_u16();
                let headers = resp
                    .headers()
                    .iter()
                    .map(|(name, value)| {
                        (name.to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned())
                    })
                    .collect();

                ProbeResult::HttpAccess {
                    url: url.to_string(),
                    status_code: Some(status),
                    accessible: status < 400,
                    headers,
                    error: None,
                }
            }
            Err(e) => ProbeResult::HttpAccess {
                url: url.to_string(),
                status_code: None,
                accessible: false,
                headers: BTreeMap::new(),
                error: Some(describe(&e)),
            },
        }
    }

    /// HEAD request for one catalogued path
    pub async fn backdoor_file(&self, base_url: &str, path: &str) -> ProbeResult {
        let url = join_path(base_url, path);

        match self.client.head(&url).send().await {
            Ok(resp) => {
                let status = resp.status().as_u16();
                if status < 400 {
                    log::warn!("Sensitive path reachable: {} (HTTP {})", url, status);
                }
                ProbeResult::BackdoorFile {
                    path: path.to_string(),
                    url,
                    status_code: Some(status),
                    found: status < 400,
                    error: None,
                }
            }
            Err(e) => ProbeResult::BackdoorFile {
                path: path.to_string(),
                url,
                status_code: None,
                found: false,
                error: Some(describe(&e)),
            },
        }
    }
}

/// Basic-Auth through the in-process client (redirects followed)
#[derive(Clone)]
pub struct ReqwestBasicAuth {
    client: Client,
}

impl ReqwestBasicAuth {
    pub fn new(timeout: Duration) -> crate::Result<Self> {
        Ok(Self {
            client: build_client(timeout, Policy::default())?,
        })
    }
}

#[async_trait::async_trait]
impl BasicAuthStrategy for ReqwestBasicAuth {
    fn transport(&self) -> AuthTransport {
        AuthTransport::Native
    }

    async fn attempt(&self, url: &str, credential: &Credential) -> ProbeResult {
        let response = self
            .client
            .get(url)
            .basic_auth(&credential.username, Some(&credential.password))
            .send()
            .await;

        match response {
            Ok(resp) => {
                let status = resp.status().as_u16();
                ProbeResult::BasicAuth {
                    transport: AuthTransport::Native,
                    url: url.to_string(),
                    credential: credential.clone(),
                    status_code: Some(status),
                    success: status < 400,
                    error: None,
                }
            }
            Err(e) => ProbeResult::BasicAuth {
                transport: AuthTransport::Native,
                url: url.to_string(),
                credential: credential.clone(),
                status_code: None,
                success: false,
                error: Some(describe(&e)),
            },
        }
    }
}
