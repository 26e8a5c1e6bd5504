//! Tor service and control port
//!
//! The control port speaks a line protocol: every command gets a reply whose
//! last line starts with a three-digit status and a space (`250 OK`).
//! Intermediate lines of a multi-line reply use `-` or `+` after the status.

use crate::command::CommandRunner;
use async_trait::async_trait;
use netveil_core::config::NetveilConfig;
use netveil_core::traits::{IdentityChannel, TorService};
use netveil_core::{Error, Result};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::net::TcpStream;
use tracing::debug;

/// Status code of a successful control-port reply
const REPLY_OK: &str = "250";

/// Starts Tor through the init system
#[derive(Debug, Clone)]
pub struct SystemTorService {
    runner: CommandRunner,
}

impl SystemTorService {
    pub fn new(runner: CommandRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl TorService for SystemTorService {
    async fn start(&self) -> Result<()> {
        self.runner.run("service", &["tor", "start"]).await
    }
}

/// Tor control-port client
#[derive(Clone)]
pub struct TorControlPort {
    addr: SocketAddr,
    password: Option<String>,
    timeout: Duration,
}

impl std::fmt::Debug for TorControlPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TorControlPort")
            .field("addr", &self.addr)
            .field("password", &self.password.as_ref().map(|_| "<REDACTED>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl TorControlPort {
    pub fn new(addr: SocketAddr, password: Option<String>, timeout: Duration) -> Self {
        Self {
            addr,
            password,
            timeout,
        }
    }

    pub fn from_config(config: &NetveilConfig) -> Result<Self> {
        Ok(Self::new(
            config.tor.control_socket_addr()?,
            config.tor.control_password.clone(),
            config.timeouts.control(),
        ))
    }

    /// `AUTHENTICATE` line; no password authenticates with an empty string
    fn authenticate_line(&self) -> String {
        let password = self.password.as_deref().unwrap_or("");
        let escaped = password.replace('\\', "\\\\").replace('"', "\\\"");
        format!("AUTHENTICATE \"{}\"", escaped)
    }

    async fn exchange(&self) -> Result<()> {
        let stream = TcpStream::connect(self.addr)
            .await
            .map_err(|e| Error::identity_channel(format!("{}: {}", self.addr, e)))?;

        let (read, mut write) = stream.into_split();
        let mut lines = BufReader::new(read).lines();

        send_command(&mut write, &mut lines, &self.authenticate_line(), "AUTHENTICATE").await?;
        send_command(&mut write, &mut lines, "SIGNAL NEWNYM", "SIGNAL NEWNYM").await?;

        // Tor closes the connection after QUIT; its reply does not matter
        let _ = write.write_all(b"QUIT\r\n").await;

        Ok(())
    }
}

#[async_trait]
impl IdentityChannel for TorControlPort {
    async fn new_identity(&self) -> Result<()> {
        debug!("Sending NEWNYM to {}", self.addr);

        tokio::time::timeout(self.timeout, self.exchange())
            .await
            .map_err(|_| {
                Error::identity_channel(format!(
                    "{}: no reply within {:?}",
                    self.addr, self.timeout
                ))
            })?
    }
}

/// Write one command and require a `250` final reply line
///
/// `label` names the command in errors so the password never ends up in a
/// message.
async fn send_command<W, R>(
    write: &mut W,
    lines: &mut Lines<BufReader<R>>,
    command: &str,
    label: &str,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
    R: AsyncRead + Unpin,
{
    write
        .write_all(format!("{}\r\n", command).as_bytes())
        .await
        .map_err(|e| Error::identity_channel(format!("{}: {}", label, e)))?;

    let reply = read_reply(lines)
        .await
        .map_err(|e| Error::identity_channel(format!("{}: {}", label, e)))?;

    if reply.starts_with(REPLY_OK) {
        Ok(())
    } else {
        Err(Error::identity_channel(format!(
            "{} rejected: {}",
            label, reply
        )))
    }
}

/// Read up to and including the final line of a reply
async fn read_reply<R>(lines: &mut Lines<BufReader<R>>) -> std::io::Result<String>
where
    R: AsyncRead + Unpin,
{
    loop {
        let Some(line) = lines.next_line().await? else {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "connection closed before reply",
            ));
        };

        if is_final_line(&line) {
            return Ok(line);
        }
    }
}

fn is_final_line(line: &str) -> bool {
    line.as_bytes().get(3) == Some(&b' ') || line.len() == 3
}
