//! Network tests against local HTTP and FTP responders

use futures::StreamExt;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use gatecheck::{
    config::ScanConfig,
    findings::Severity,
    probes::{
        AuthTransport, BasicAuthStrategy, Credential, CurlBasicAuth, FtpProbe, HttpProbe, LoginOutcome, NetworkProbes,
        ProbeResult, ReqwestBasicAuth, SshCapability,
    },
    scanner::{ExposurePipeline, ScanTarget},
};

// base64("admin:admin")
const ADMIN_AUTH: &str = "Basic YWRtaW46YWRtaW4=";

/// Minimal HTTP/1.1 responder: /.env exists, / needs admin:admin
async fn spawn_http_server() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        loop {
            let (stream, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => return,
            };
            tokio::spawn(async move {
                let (read_half, mut write_half) = stream.into_split();
                let mut reader = BufReader::new(read_half);
                let mut request_line = String::new();
                if reader.read_line(&mut request_line).await.unwrap_or(0) == 0 {
                    return;
                }

                let mut authorized = false;
                loop {
                    let mut line = String::new();
                    if reader.read_line(&mut line).await.unwrap_or(0) == 0 || line == "\r\n" {
                        break;
                    }
                    if let Some((name, value)) = line.split_once(':') {
                        if name.eq_ignore_ascii_case("authorization") && value.trim() == ADMIN_AUTH {
                            authorized = true;
                        }
                    }
                }

                let path = request_line.split_whitespace().nth(1).unwrap_or("/");
                let status = match path {
                    "/.env" => "200 OK",
                    "/" if authorized => "200 OK",
                    "/" => "401 Unauthorized",
                    _ => "404 Not Found",
                };
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Length: 0\r\nWWW-Authenticate: Basic realm=\"lab\"\r\nConnection: close\r\n\r\n",
                    status
                );
                let _ = write_half.write_all(response.as_bytes()).await;
                let _ = write_half.shutdown().await;
            });
        }
    });

    port
}

/// Minimal FTP responder accepting only the given credential
async fn spawn_ftp_server(accepted: Credential) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        loop {
            let (stream, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => return,
            };
            let accepted = accepted.clone();
            tokio::spawn(async move {
                let (read_half, mut write_half) = stream.into_split();
                let mut reader = BufReader::new(read_half);
                let _ = write_half.write_all(b"220-lab ftp\r\n220 ready\r\n").await;

                let mut user = String::new();
                loop {
                    let mut line = String::new();
                    if reader.read_line(&mut line).await.unwrap_or(0) == 0 {
                        return;
                    }
                    let line = line.trim_end();
                    let reply = if let Some(name) = line.strip_prefix("USER ") {
                        user = name.to_string();
                        "331 password required\r\n"
                    } else if let Some(pass) = line.strip_prefix("PASS ") {
                        if user == accepted.username && pass == accepted.password {
                            "230 logged in\r\n"
                        } else {
                            "530 login incorrect\r\n"
                        }
                    } else if line == "QUIT" {
                        let _ = write_half.write_all(b"221 bye\r\n").await;
                        return;
                    } else {
                        "502 not implemented\r\n"
                    };
                    if write_half.write_all(reply.as_bytes()).await.is_err() {
                        return;
                    }
                }
            });
        }
    });

    port
}

async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

#[tokio::test]
async fn test_ftp_probe_against_local_server() {
    let port = spawn_ftp_server(Credential::new("anonymous", "anonymous")).await;
    let probe = FtpProbe::new(port, Duration::from_secs(3));

    let hit = probe.attempt("127.0.0.1", &Credential::new("anonymous", "anonymous")).await;
    let miss = probe.attempt("127.0.0.1", &Credential::new("root", "root")).await;

    assert!(matches!(hit, ProbeResult::FtpAccess { outcome: LoginOutcome::Success, port: p, .. } if p == port));
    assert!(matches!(miss, ProbeResult::FtpAccess { outcome: LoginOutcome::Rejected, .. }));
}

#[tokio::test]
async fn test_ftp_probe_closed_port_fails() {
    let probe = FtpProbe::new(closed_port().await, Duration::from_secs(2));
    let result = probe.attempt("127.0.0.1", &Credential::new("guest", "guest")).await;

    assert!(matches!(result, ProbeResult::FtpAccess { outcome: LoginOutcome::Failed(_), .. }));
    assert!(result.error().is_some());
}

#[tokio::test]
async fn test_http_probes_against_local_server() {
    let port = spawn_http_server().await;
    let base = format!("http://127.0.0.1:{}", port);
    let http = HttpProbe::new(Duration::from_secs(3)).unwrap();

    match http.access(&base).await {
        ProbeResult::HttpAccess { status_code, accessible, headers, .. } => {
            assert_eq!(status_code, Some(401));
            assert!(!accessible);
            assert!(headers.contains_key("www-authenticate"));
        }
        other => panic!("unexpected result {:?}", other),
    }

    assert!(matches!(http.backdoor_file(&base, "/.env").await, ProbeResult::BackdoorFile { found: true, .. }));
    assert!(matches!(http.backdoor_file(&base, "/cmd.php").await, ProbeResult::BackdoorFile { found: false, status_code: Some(404), .. }));
}

#[tokio::test]
async fn test_native_basic_auth_against_local_server() {
    let port = spawn_http_server().await;
    let base = format!("http://127.0.0.1:{}", port);
    let auth = ReqwestBasicAuth::new(Duration::from_secs(3)).unwrap();

    let good = auth.attempt(&base, &Credential::new("admin", "admin")).await;
    let bad = auth.attempt(&base, &Credential::new("guest", "guest")).await;

    assert!(matches!(good, ProbeResult::BasicAuth { success: true, status_code: Some(200), transport: AuthTransport::Native, .. }));
    assert!(matches!(bad, ProbeResult::BasicAuth { success: false, status_code: Some(401), .. }));
}

#[cfg(unix)]
#[tokio::test]
async fn test_unusable_curl_falls_back_to_native() {
    let port = spawn_http_server().await;
    let base = format!("http://127.0.0.1:{}", port);
    let native = std::sync::Arc::new(ReqwestBasicAuth::new(Duration::from_secs(3)).unwrap());
    // `false` runs fine but prints nothing
    let curl = CurlBasicAuth::new("false", Duration::from_secs(3)).with_fallback(native);

    let result = curl.attempt(&base, &Credential::new("admin", "admin")).await;

    assert!(matches!(
        result,
        ProbeResult::BasicAuth { transport: AuthTransport::ExternalFallback, success: true, .. }
    ));
}

#[cfg(unix)]
#[tokio::test]
async fn test_system_curl_basic_auth() {
    let installed = std::process::Command::new("curl")
        .arg("--version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false);
    if !installed {
        eprintln!("curl not installed, skipping");
        return;
    }

    let port = spawn_http_server().await;
    let base = format!("http://127.0.0.1:{}", port);
    let curl = CurlBasicAuth::new("curl", Duration::from_secs(5));

    let good = curl.attempt(&base, &Credential::new("admin", "admin")).await;
    let bad = curl.attempt(&base, &Credential::new("guest", "guest")).await;

    assert!(matches!(
        good,
        ProbeResult::BasicAuth { transport: AuthTransport::External, status_code: Some(200), success: true, error: None, .. }
    ));
    assert!(matches!(
        bad,
        ProbeResult::BasicAuth { transport: AuthTransport::External, status_code: Some(401), success: false, .. }
    ));
}

#[tokio::test]
async fn test_full_pipeline_against_local_services() {
    let http_port = spawn_http_server().await;
    let ftp_port = spawn_ftp_server(Credential::new("root", "root")).await;

    let config = ScanConfig::default()
        .with_http_timeout(3000)
        .with_ftp_port(ftp_port)
        .with_ssh_port(closed_port().await)
        .with_curl_path("gatecheck-test-missing-curl")
        .with_ssh_capability(SshCapability::Unavailable);

    let pipeline = ExposurePipeline::new(NetworkProbes::new(&config).unwrap())
        .with_credentials(vec![Credential::new("admin", "admin"), Credential::new("root", "root")])
        .with_backdoor_paths(vec!["/.env".to_string(), "/shell.php".to_string()]);
    let target = ScanTarget::parse(&format!("127.0.0.1:{}", http_port)).unwrap();

    let steps: Vec<_> = pipeline.run(&target).collect().await;
    assert_eq!(steps.len(), 11);

    let severity_of = |description: &str| {
        steps
            .iter()
            .find(|s| s.description == description)
            .map(|s| s.finding.severity)
            .unwrap()
    };

    assert_eq!(severity_of("Testing HTTP Basic Auth (native): admin/admin"), Severity::High);
    assert_eq!(severity_of("Testing HTTP Basic Auth (native): root/root"), Severity::Info);
    assert_eq!(severity_of("Testing HTTP Basic Auth (curl): admin/admin"), Severity::Warning);
    assert_eq!(severity_of("Checking file: /.env"), Severity::Critical);
    assert_eq!(severity_of("Checking file: /shell.php"), Severity::Info);
    assert_eq!(severity_of("Testing FTP: root/root"), Severity::Critical);
    assert_eq!(severity_of("Testing FTP: admin/admin"), Severity::Info);

    let ssh = steps.iter().find(|s| s.description == "Testing SSH: admin/admin").unwrap();
    assert!(ssh.finding.summary.contains("skipped"));
}
