//! In-process FTP control-connection server for tests.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use crate::config::{ConfigBundle, ConnectionFactoryDescriptor, build};
use crate::config::bundle::{ENA_FTP_HOST, ENA_FTP_PASSWORD, ENA_FTP_PORT, ENA_FTP_USER_ID};

pub fn descriptor_for(addr: SocketAddr, user: &str, pass: &str) -> ConnectionFactoryDescriptor {
    let bundle = ConfigBundle::new()
        .with(ENA_FTP_HOST, addr.ip().to_string())
        .with(ENA_FTP_PORT, addr.port())
        .with(ENA_FTP_USER_ID, user)
        .with(ENA_FTP_PASSWORD, pass);
    build(&bundle).unwrap()
}

pub struct FakeFtpServer {
    pub addr: SocketAddr,
    connections: Arc<AtomicUsize>,
    commands: Arc<Mutex<Vec<String>>>,
}

impl FakeFtpServer {
    pub async fn start(user: &str, pass: &str) -> Self {
        Self::with_greeting(user, pass, "220 fake ftp ready\r\n").await
    }

    /// Logs clients in, then reads commands without ever answering them.
    pub async fn silent_after_login(user: &str, pass: &str) -> Self {
        Self::spawn(user, pass, "220 fake ftp ready\r\n", true).await
    }

    pub async fn with_greeting(user: &str, pass: &str, greeting: &'static str) -> Self {
        Self::spawn(user, pass, greeting, false).await
    }

    async fn spawn(user: &str, pass: &str, greeting: &'static str, mute: bool) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicUsize::new(0));
        let commands = Arc::new(Mutex::new(Vec::new()));

        let (user, pass) = (user.to_owned(), pass.to_owned());
        let (conns, cmds) = (connections.clone(), commands.clone());
        tokio::spawn(async move {
            while let Ok((sock, _)) = listener.accept().await {
                conns.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(serve(
                    sock,
                    greeting,
                    user.clone(),
                    pass.clone(),
                    mute,
                    cmds.clone(),
                ));
            }
        });

        Self {
            addr,
            connections,
            commands,
        }
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

async fn serve(
    sock: TcpStream,
    greeting: &'static str,
    user: String,
    pass: String,
    mute: bool,
    commands: Arc<Mutex<Vec<String>>>,
) {
    let (read, mut write) = sock.into_split();
    let mut lines = BufReader::new(read).lines();
    if write.write_all(greeting.as_bytes()).await.is_err() || !greeting.contains("220 ") {
        return;
    }

    let mut given_user = String::new();
    let mut logged_in = false;
    while let Ok(Some(line)) = lines.next_line().await {
        commands.lock().unwrap().push(line.clone());
        if mute && logged_in {
            continue;
        }
        let (verb, arg) = line.split_once(' ').unwrap_or((line.as_str(), ""));
        let reply = match verb {
            "USER" => {
                given_user = arg.to_owned();
                "331 password required\r\n"
            }
            "PASS" if given_user == user && arg == pass => {
                logged_in = true;
                "230 logged in\r\n"
            }
            "PASS" => "530 login incorrect\r\n",
            "NOOP" => "200 ok\r\n",
            "QUIT" => {
                let _ = write.write_all(b"221 bye\r\n").await;
                return;
            }
            _ => "502 not implemented\r\n",
        };
        if write.write_all(reply.as_bytes()).await.is_err() {
            return;
        }
    }
}
