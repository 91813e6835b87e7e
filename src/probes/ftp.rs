//! FTP credential probe: connect, USER/PASS, QUIT over the control channel

use super::*;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;

const MAX_REPLY_LINES: usize = 64;

/// Final reply of an FTP command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: u16,
    pub text: String,
}

impl Reply {
    fn is_positive(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

/// Split a reply line into code and whether it ends the reply (`"230 "` vs `"230-"`)
pub fn parse_reply_line(line: &str) -> Option<(u16, bool)> {
    let code = line.get(..3)?.parse::<u16>().ok()?;
    match line.as_bytes().get(3) {
        Some(b'-') => Some((code, false)),
        Some(b' ') | None => Some((code, true)),
        Some(b'\r') | Some(b'\n') => Some((code, true)),
        _ => None,
    }
}

async fn read_reply<R: AsyncBufRead + Unpin>(reader: &mut R) -> io::Result<Reply> {
    let mut line = String::new();
    let mut first: Option<u16> = None;

    for _ in 0..MAX_REPLY_LINES {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed by server"));
        }

        // Continuation lines of a multi-line reply may carry arbitrary text
        if let Some((code, last)) = parse_reply_line(&line) {
            let opening = *first.get_or_insert(code);
            if last && code == opening {
                return Ok(Reply {
                    code,
                    text: line.trim_end().to_string(),
                });
            }
        } else if first.is_none() {
            return Err(io::Error::new(io::ErrorKind::InvalidData, format!("malformed reply {:?}", line.trim_end())));
        }
    }

    Err(io::Error::new(io::ErrorKind::InvalidData, "reply too long"))
}

async fn command<R, W>(reader: &mut R, writer: &mut W, cmd: &str) -> io::Result<Reply>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    writer.write_all(cmd.as_bytes()).await?;
    writer.write_all(b"\r\n").await?;
    writer.flush().await?;
    read_reply(reader).await
}

/// Run the login exchange on an established control connection
pub async fn login_session<R, W>(reader: &mut R, writer: &mut W, credential: &Credential) -> LoginOutcome
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let outcome = match exchange(reader, writer, credential).await {
        Ok(outcome) => outcome,
        Err(e) => return LoginOutcome::Failed(e.to_string()),
    };

    if outcome.is_success() {
        // Logout is best effort; a successful login is already established
        let _ = command(reader, writer, "QUIT").await;
    }
    outcome
}

async fn exchange<R, W>(reader: &mut R, writer: &mut W, credential: &Credential) -> io::Result<LoginOutcome>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let greeting = read_reply(reader).await?;
    if !greeting.is_positive() {
        return Ok(LoginOutcome::Failed(format!("server not ready: {}", greeting.text)));
    }

    let user = command(reader, writer, &format!("USER {}", credential.username)).await?;
    match user.code {
        230 => return Ok(LoginOutcome::Success),
        331 | 332 => {}
        530 => return Ok(LoginOutcome::Rejected),
        _ => return Ok(LoginOutcome::Failed(format!("unexpected USER reply: {}", user.text))),
    }

    let pass = command(reader, writer, &format!("PASS {}", credential.password)).await?;
    Ok(match pass.code {
        230 | 202 => LoginOutcome::Success,
        530 => LoginOutcome::Rejected,
        _ => LoginOutcome::Failed(format!("unexpected PASS reply: {}", pass.text)),
    })
}

#[derive(Debug, Clone)]
pub struct FtpProbe {
    port: u16,
    timeout: Duration,
}

impl FtpProbe {
    pub fn new(port: u16, timeout: Duration) -> Self {
        Self { port, timeout }
    }

    async fn login(&self, host: &str, credential: &Credential) -> LoginOutcome {
        let stream = match TcpStream::connect((host, self.port)).await {
            Ok(stream) => stream,
            Err(e) => return LoginOutcome::Failed(format!("connect failed: {}", e)),
        };

        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);
        login_session(&mut reader, &mut write_half, credential).await
    }

    pub async fn attempt(&self, host: &str, credential: &Credential) -> ProbeResult {
        let outcome = match timeout(self.timeout, self.login(host, credential)).await {
            Ok(outcome) => outcome,
            Err(_) => LoginOutcome::Failed(format!("timed out after {:?}", self.timeout)),
        };

        if outcome.is_success() {
            log::warn!("FTP login accepted on {}:{} for {}", host, self.port, credential);
        }

        ProbeResult::FtpAccess {
            host: host.to_string(),
            port: self.port,
            credential: credential.clone(),
            outcome,
        }
    }
}
