use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;

use crate::config::ConnectionFactoryDescriptor;
use crate::error::FtpError;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Something that can open a fresh, logged-in FTP session.
pub trait SessionFactory {
    fn open_session(&self) -> impl Future<Output = Result<FtpSession, FtpError>> + Send;

    /// Upper bound for waiting on a single reply from an open session.
    fn reply_timeout(&self) -> Duration {
        DEFAULT_CONNECT_TIMEOUT
    }
}

impl SessionFactory for ConnectionFactoryDescriptor {
    async fn open_session(&self) -> Result<FtpSession, FtpError> {
        FtpSession::connect(self, DEFAULT_CONNECT_TIMEOUT).await
    }
}

/// Descriptor paired with the agent's connect timeout.
#[derive(Debug, Clone)]
pub struct FtpConnector {
    descriptor: Arc<ConnectionFactoryDescriptor>,
    timeout: Duration,
}

impl FtpConnector {
    pub fn new(descriptor: Arc<ConnectionFactoryDescriptor>, timeout: Duration) -> Self {
        Self { descriptor, timeout }
    }
}

impl SessionFactory for FtpConnector {
    async fn open_session(&self) -> Result<FtpSession, FtpError> {
        FtpSession::connect(&self.descriptor, self.timeout).await
    }

    fn reply_timeout(&self) -> Duration {
        self.timeout
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: u16,
    pub lines: Vec<String>,
}

impl Reply {
    pub fn message(&self) -> String {
        self.lines.join("\n")
    }
}

/// An authenticated FTP control connection.
#[derive(Debug)]
pub struct FtpSession {
    stream: BufStream<TcpStream>,
    welcome: String,
}

impl FtpSession {
    /// Connects, reads the greeting and logs in. The whole exchange is bounded by `timeout`.
    pub async fn connect(
        descriptor: &ConnectionFactoryDescriptor,
        timeout: Duration,
    ) -> Result<Self, FtpError> {
        let addr = format!("{}:{}", descriptor.host(), descriptor.port());
        match tokio::time::timeout(timeout, Self::establish(descriptor)).await {
            Ok(res) => {
                if res.is_ok() {
                    log::debug!("ftp session established with {addr}");
                }
                res
            }
            Err(_) => Err(FtpError::ConnectTimeout { addr }),
        }
    }

    async fn establish(descriptor: &ConnectionFactoryDescriptor) -> Result<Self, FtpError> {
        let stream = TcpStream::connect((descriptor.host(), descriptor.port())).await?;
        let mut session = Self {
            stream: BufStream::new(stream),
            welcome: String::new(),
        };

        let greeting = loop {
            let reply = session.read_reply().await?;
            match reply.code {
                120 => continue,
                220 => break reply,
                code => {
                    return Err(FtpError::UnexpectedReply {
                        code,
                        message: reply.message(),
                    });
                }
            }
        };
        session.welcome = greeting.message();

        session
            .login(descriptor.username(), descriptor.password())
            .await?;
        Ok(session)
    }

    async fn login(&mut self, username: &str, password: &str) -> Result<(), FtpError> {
        let reply = self.command(&format!("USER {username}")).await?;
        match reply.code {
            230 => return Ok(()),
            331 => {}
            _ => return Err(login_failure(reply)),
        }

        self.send_line(&format!("PASS {password}"), "PASS ****").await?;
        let reply = self.read_reply().await?;
        match reply.code {
            230 | 202 => Ok(()),
            _ => Err(login_failure(reply)),
        }
    }

    pub fn welcome(&self) -> &str {
        &self.welcome
    }

    pub async fn noop(&mut self) -> Result<(), FtpError> {
        let reply = self.command("NOOP").await?;
        expect(reply, 200)
    }

    /// `NOOP` that gives up after `limit`. A timed-out session is left mid-reply
    /// and must not be reused.
    pub async fn noop_within(&mut self, limit: Duration) -> Result<(), FtpError> {
        match tokio::time::timeout(limit, self.noop()).await {
            Ok(res) => res,
            Err(_) => Err(FtpError::ReplyTimeout { command: "NOOP" }),
        }
    }

    pub async fn quit(mut self) -> Result<(), FtpError> {
        let reply = self.command("QUIT").await?;
        let res = expect(reply, 221);
        self.stream.get_mut().shutdown().await.ok();
        res
    }

    /// Sends one command line and reads its reply.
    pub async fn command(&mut self, cmd: &str) -> Result<Reply, FtpError> {
        self.send_line(cmd, cmd).await?;
        self.read_reply().await
    }

    async fn send_line(&mut self, line: &str, shown: &str) -> Result<(), FtpError> {
        if line.contains(['\r', '\n']) {
            return Err(FtpError::InvalidArgument("command contains a line break"));
        }
        log::debug!("ftp >> {shown}");
        self.stream.write_all(line.as_bytes()).await?;
        self.stream.write_all(b"\r\n").await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn read_line(&mut self) -> Result<String, FtpError> {
        let mut buf = String::new();
        if self.stream.read_line(&mut buf).await? == 0 {
            return Err(FtpError::ConnectionClosed);
        }
        Ok(buf.trim_end_matches(['\r', '\n']).to_owned())
    }

    async fn read_reply(&mut self) -> Result<Reply, FtpError> {
        let first = self.read_line().await?;
        let (code, multiline, text) = parse_reply_line(&first)?;
        let mut lines = vec![text.to_owned()];

        if multiline {
            loop {
                let line = self.read_line().await?;
                match parse_reply_line(&line) {
                    Ok((c, false, text)) if c == code => {
                        lines.push(text.to_owned());
                        break;
                    }
                    _ => lines.push(line),
                }
            }
        }

        log::debug!("ftp << {code} {}", lines.join(" | "));
        Ok(Reply { code, lines })
    }
}

/// Splits `NNN text` / `NNN-text` into code, continuation flag and text.
fn parse_reply_line(line: &str) -> Result<(u16, bool, &str), FtpError> {
    let bytes = line.as_bytes();
    if bytes.len() < 3 || !bytes[..3].iter().all(u8::is_ascii_digit) {
        return Err(FtpError::Malformed(line.to_owned()));
    }
    let code: u16 = line[..3]
        .parse()
        .map_err(|_| FtpError::Malformed(line.to_owned()))?;
    if !(100..600).contains(&code) {
        return Err(FtpError::Malformed(line.to_owned()));
    }
    match bytes.get(3) {
        None => Ok((code, false, "")),
        Some(b' ') => Ok((code, false, &line[4..])),
        Some(b'-') => Ok((code, true, &line[4..])),
        Some(_) => Err(FtpError::Malformed(line.to_owned())),
    }
}

fn expect(reply: Reply, code: u16) -> Result<(), FtpError> {
    if reply.code == code {
        Ok(())
    } else {
        Err(FtpError::UnexpectedReply {
            code: reply.code,
            message: reply.message(),
        })
    }
}

fn login_failure(reply: Reply) -> FtpError {
    match reply.code {
        332 => FtpError::Unsupported("ACCT login"),
        code if code >= 400 => FtpError::AuthFailed {
            code,
            message: reply.message(),
        },
        code => FtpError::UnexpectedReply {
            code,
            message: reply.message(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ftp::testing::{FakeFtpServer, descriptor_for};

    #[test]
    fn parses_reply_lines() {
        assert_eq!(parse_reply_line("220 ready").unwrap(), (220, false, "ready"));
        assert_eq!(parse_reply_line("230-Welcome").unwrap(), (230, true, "Welcome"));
        assert_eq!(parse_reply_line("200").unwrap(), (200, false, ""));
        assert!(parse_reply_line("hello").is_err());
        assert!(parse_reply_line("22").is_err());
        assert!(parse_reply_line("220x").is_err());
        assert!(parse_reply_line("700 nope").is_err());
    }

    #[tokio::test]
    async fn logs_in_with_password() {
        let server = FakeFtpServer::start("eva", "s3cret").await;
        let descriptor = descriptor_for(server.addr, "eva", "s3cret");

        let mut session = descriptor.open_session().await.unwrap();
        assert_eq!(session.welcome(), "fake ftp ready");
        session.noop().await.unwrap();
        session.quit().await.unwrap();

        let seen = server.commands();
        assert_eq!(seen, vec!["USER eva", "PASS s3cret", "NOOP", "QUIT"]);
    }

    #[tokio::test]
    async fn anonymous_login_with_empty_password() {
        let server = FakeFtpServer::start("anonymous", "").await;
        let descriptor = descriptor_for(server.addr, "anonymous", "");
        let session = descriptor.open_session().await.unwrap();
        session.quit().await.unwrap();
        assert_eq!(server.commands()[1], "PASS ");
    }

    #[tokio::test]
    async fn wrong_password_is_auth_failure() {
        let server = FakeFtpServer::start("eva", "right").await;
        let descriptor = descriptor_for(server.addr, "eva", "wrong");
        let err = descriptor.open_session().await.unwrap_err();
        assert!(matches!(err, FtpError::AuthFailed { code: 530, .. }), "{err:?}");
    }

    #[tokio::test]
    async fn skips_delay_notice_and_reads_multiline_greeting() {
        let server = FakeFtpServer::with_greeting(
            "eva",
            "pw",
            "120 wait a moment\r\n220-Welcome to\r\n extra banner\r\n220 the box\r\n",
        )
        .await;
        let descriptor = descriptor_for(server.addr, "eva", "pw");
        let connector = FtpConnector::new(Arc::new(descriptor), Duration::from_secs(5));
        let session = connector.open_session().await.unwrap();
        assert_eq!(session.welcome(), "Welcome to\n extra banner\nthe box");
    }

    #[tokio::test]
    async fn service_unavailable_greeting_is_rejected() {
        let server = FakeFtpServer::with_greeting("eva", "pw", "421 too many users\r\n").await;
        let descriptor = descriptor_for(server.addr, "eva", "pw");
        let err = descriptor.open_session().await.unwrap_err();
        assert!(matches!(err, FtpError::UnexpectedReply { code: 421, .. }));
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _hold = tokio::spawn(async move {
            let (_sock, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
        });
        let descriptor = descriptor_for(addr, "eva", "pw");
        let err = FtpSession::connect(&descriptor, Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, FtpError::ConnectTimeout { .. }));
    }

    #[tokio::test]
    async fn noop_within_gives_up_on_silent_server() {
        let server = FakeFtpServer::silent_after_login("eva", "pw").await;
        let descriptor = descriptor_for(server.addr, "eva", "pw");
        let mut session = descriptor.open_session().await.unwrap();
        let err = session
            .noop_within(Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, FtpError::ReplyTimeout { command: "NOOP" }));
    }

    #[test]
    fn connector_reports_its_timeout() {
        let addr = "127.0.0.1:21".parse().unwrap();
        let descriptor = descriptor_for(addr, "eva", "pw");
        assert_eq!(descriptor.reply_timeout(), DEFAULT_CONNECT_TIMEOUT);
        let connector = FtpConnector::new(Arc::new(descriptor), Duration::from_secs(3));
        assert_eq!(connector.reply_timeout(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn rejects_commands_with_line_breaks() {
        let server = FakeFtpServer::start("eva", "pw").await;
        let descriptor = descriptor_for(server.addr, "eva", "pw");
        let mut session = descriptor.open_session().await.unwrap();
        let err = session.command("NOOP\r\nDELE x").await.unwrap_err();
        assert!(matches!(err, FtpError::InvalidArgument(_)));
    }
}
