//! Per-target polling of the miner API.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, warn};

use crate::client::{ClientError, Command, MinerClient};

/// Decoded API responses for one scrape, keyed by command.
///
/// Iteration follows [`Command::ALL`] order.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    target: String,
    responses: BTreeMap<Command, Value>,
}

impl Snapshot {
    /// Build a snapshot from already decoded responses.
    pub fn new(
        target: impl Into<String>,
        responses: impl IntoIterator<Item = (Command, Value)>,
    ) -> Self {
        Self {
            target: target.into(),
            responses: responses.into_iter().collect(),
        }
    }

    /// The host these responses came from.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The response body for `command`, if present.
    pub fn get(&self, command: Command) -> Option<&Value> {
        self.responses.get(&command)
    }

    /// Commands present in the snapshot, in poll order.
    pub fn commands(&self) -> impl Iterator<Item = Command> + '_ {
        self.responses.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}

/// A poll that failed on one of its commands.
#[derive(Debug, thiserror::Error)]
#[error("'{command}' command to {target} failed: {source}")]
pub struct PollError {
    pub target: String,
    pub command: Command,
    pub source: ClientError,
}

impl PollError {
    /// The underlying transport failure.
    pub fn kind(&self) -> &ClientError {
        &self.source
    }
}

/// Issues the full command set against a target.
#[derive(Debug, Clone)]
pub struct Poller {
    client: MinerClient,
    concurrent: bool,
}

impl Poller {
    /// Create a poller. With `concurrent` set the commands are issued in
    /// parallel and joined; otherwise one after another.
    pub fn new(client: MinerClient, concurrent: bool) -> Self {
        Self { client, concurrent }
    }

    /// Poll every command against `target`.
    ///
    /// Any failing command fails the whole poll; no partial snapshot is
    /// returned.
    pub async fn poll(&self, target: &str) -> Result<Snapshot, PollError> {
        let responses = if self.concurrent {
            self.poll_concurrent(target).await?
        } else {
            self.poll_sequential(target).await?
        };

        debug!(host = target, commands = responses.len(), "Poll complete");

        Ok(Snapshot {
            target: target.to_string(),
            responses,
        })
    }

    async fn poll_sequential(&self, target: &str) -> Result<BTreeMap<Command, Value>, PollError> {
        let mut responses = BTreeMap::new();
        for command in Command::ALL {
            let (command, value) = self.fetch(target, command).await?;
            responses.insert(command, value);
        }
        Ok(responses)
    }

    async fn poll_concurrent(&self, target: &str) -> Result<BTreeMap<Command, Value>, PollError> {
        let (stats, version, pools, summary, devs) = tokio::try_join!(
            self.fetch(target, Command::Stats),
            self.fetch(target, Command::Version),
            self.fetch(target, Command::Pools),
            self.fetch(target, Command::Summary),
            self.fetch(target, Command::Devs),
        )?;

        Ok([stats, version, pools, summary, devs].into_iter().collect())
    }

    async fn fetch(&self, target: &str, command: Command) -> Result<(Command, Value), PollError> {
        let value = self
            .client
            .fetch(target, command)
            .await
            .map_err(|source| PollError {
                target: target.to_string(),
                command,
                source,
            })?;

        check_status(target, command, &value);
        Ok((command, value))
    }
}

/// Log miner-side errors reported in the `STATUS` block.
fn check_status(target: &str, command: Command, value: &Value) {
    let status = &value["STATUS"][0];
    if let Some(code @ ("E" | "F")) = status["STATUS"].as_str() {
        warn!(
            host = target,
            %command,
            code,
            msg = status["Msg"].as_str().unwrap_or(""),
            "Miner reported an error status"
        );
    }
}
