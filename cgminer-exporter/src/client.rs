//! Client for the miner's JSON-over-TCP API.
//!
//! Every command uses its own connection: the request is the bare JSON object
//! `{"command":"<name>"}` and the response ends when the miner closes the
//! socket. Responses are frequently padded with NUL bytes.

use std::fmt;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, trace};

use crate::config::MinerConfig;

const READ_CHUNK: usize = 4096;

/// A miner API command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Command {
    Stats,
    Version,
    Pools,
    Summary,
    Devs,
}

impl Command {
    /// Every command issued per scrape, in poll order.
    pub const ALL: [Command; 5] = [
        Command::Stats,
        Command::Version,
        Command::Pools,
        Command::Summary,
        Command::Devs,
    ];

    /// The command name on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Stats => "stats",
            Command::Version => "version",
            Command::Pools => "pools",
            Command::Summary => "summary",
            Command::Devs => "devs",
        }
    }

    /// The request payload for this command.
    pub fn request(&self) -> String {
        serde_json::json!({ "command": self.as_str() }).to_string()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type for a single API exchange.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Connection failed: {0}")]
    Connect(String),
    #[error("Timed out waiting for response from {0}")]
    Timeout(String),
    #[error("Invalid response: {0}")]
    Decode(String),
    #[error("I/O error: {0}")]
    Io(String),
}

/// Client for the miner API.
#[derive(Debug, Clone)]
pub struct MinerClient {
    port: u16,
    timeout: Duration,
}

impl MinerClient {
    /// Create a client for the given API port and connect/read timeout.
    pub fn new(port: u16, timeout: Duration) -> Self {
        Self { port, timeout }
    }

    /// Create a client from the miner configuration.
    pub fn from_config(config: &MinerConfig) -> Self {
        Self::new(config.port, config.timeout())
    }

    /// The API port this client connects to.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Send one command to `host` and decode the response.
    pub async fn fetch(&self, host: &str, command: Command) -> Result<Value, ClientError> {
        let addr = socket_addr(host, self.port);

        let mut stream = match timeout(self.timeout, TcpStream::connect(addr.as_str())).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(ClientError::Connect(format!("{}: {}", addr, e))),
            Err(_) => {
                return Err(ClientError::Connect(format!(
                    "{}: connect timed out after {:?}",
                    addr, self.timeout
                )));
            }
        };

        stream
            .write_all(command.request().as_bytes())
            .await
            .map_err(|e| ClientError::Io(format!("{}: {}", addr, e)))?;

        let raw = self.read_response(&mut stream, &addr).await?;
        debug!(%addr, %command, bytes = raw.len(), "Received API response");

        decode_response(&raw)
            .map_err(|e| ClientError::Decode(format!("{} ({}): {}", addr, command, e)))
    }

    /// Read until the miner closes the connection.
    async fn read_response(
        &self,
        stream: &mut TcpStream,
        addr: &str,
    ) -> Result<Vec<u8>, ClientError> {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            let n = timeout(self.timeout, stream.read(&mut chunk))
                .await
                .map_err(|_| ClientError::Timeout(addr.to_string()))?
                .map_err(|e| ClientError::Io(format!("{}: {}", addr, e)))?;

            if n == 0 {
                return Ok(buffer);
            }
            buffer.extend_from_slice(&chunk[..n]);
        }
    }
}

/// Build a `host:port` string, bracketing bare IPv6 literals.
fn socket_addr(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{}]:{}", host, port)
    } else {
        format!("{}:{}", host, port)
    }
}

/// Strip NUL padding and parse the payload as JSON.
pub fn decode_response(raw: &[u8]) -> Result<Value, serde_json::Error> {
    let cleaned: Vec<u8> = raw.iter().copied().filter(|b| *b != 0).collect();
    trace!(raw = raw.len(), cleaned = cleaned.len(), "Stripped NUL padding");
    serde_json::from_slice(&cleaned)
}
