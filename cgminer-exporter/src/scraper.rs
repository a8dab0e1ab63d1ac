//! A scrape: poll one target and render its metrics.

use std::fmt::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::client::MinerClient;
use crate::config::{ExporterConfig, TranslateConfig};
use crate::mapping::{escape_label_value, format_value};
use crate::poller::{PollError, Poller};
use crate::translate::{self, TranslateError};

/// Errors that abort a scrape.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("Invalid target: {0:?}")]
    InvalidTarget(String),
    #[error(transparent)]
    Poll(#[from] PollError),
    #[error("Failed to translate response from {target}: {source}")]
    Translate {
        target: String,
        #[source]
        source: TranslateError,
    },
}

/// Scrape counters for the lifetime of the process.
#[derive(Debug, Clone, Default)]
pub struct ScrapeStats {
    /// Scrapes attempted.
    pub scrapes_total: u64,
    /// Scrapes that returned an error.
    pub scrape_failures_total: u64,
}

/// Runs the poll, translate and render pipeline for one target per call.
pub struct Scraper {
    poller: Poller,
    translate: TranslateConfig,
    stats: RwLock<ScrapeStats>,
}

impl Scraper {
    /// Create a new scraper.
    pub fn new(poller: Poller, translate: TranslateConfig) -> Self {
        Self {
            poller,
            translate,
            stats: RwLock::new(ScrapeStats::default()),
        }
    }

    /// Create a scraper from the exporter configuration.
    pub fn from_config(config: &ExporterConfig) -> Self {
        let client = MinerClient::from_config(&config.miner);
        Self::new(Poller::new(client, config.miner.concurrent), config.translate)
    }

    /// Scrape `target` and return the exposition body.
    ///
    /// Either the full body is returned or the scrape fails; there is no
    /// partial output.
    pub async fn scrape(&self, target: &str) -> Result<String, ScrapeError> {
        let started = Instant::now();
        let result = self.run(target).await;
        let elapsed = started.elapsed();

        let stats = {
            let mut stats = self.stats.write();
            stats.scrapes_total += 1;
            if result.is_err() {
                stats.scrape_failures_total += 1;
            }
            stats.clone()
        };

        match result {
            Ok(mut body) => {
                info!(
                    target_host = target,
                    elapsed_ms = elapsed.as_millis() as u64,
                    bytes = body.len(),
                    "Scrape complete"
                );
                write_exporter_metrics(&mut body, target, elapsed, &stats);
                Ok(body)
            }
            Err(e) => {
                warn!(
                    target_host = target,
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "Scrape failed"
                );
                Err(e)
            }
        }
    }

    /// Get scrape statistics.
    pub fn stats(&self) -> ScrapeStats {
        self.stats.read().clone()
    }

    async fn run(&self, target: &str) -> Result<String, ScrapeError> {
        validate_target(target)?;

        let snapshot = self.poller.poll(target).await?;

        translate::render(&snapshot, &self.translate).map_err(|source| ScrapeError::Translate {
            target: target.to_string(),
            source,
        })
    }
}

/// Create a shareable scraper handle.
pub type SharedScraper = Arc<Scraper>;

/// A target must be a bare host name or address.
fn validate_target(target: &str) -> Result<(), ScrapeError> {
    let invalid = target.is_empty()
        || target
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || c == '/');

    if invalid {
        return Err(ScrapeError::InvalidTarget(target.to_string()));
    }
    Ok(())
}

/// Append the exporter's own metrics to a rendered body.
fn write_exporter_metrics(out: &mut String, target: &str, elapsed: Duration, stats: &ScrapeStats) {
    out.push_str("# Exporter\n");
    writeln!(out, "# TYPE cgminer_exporter_scrape_duration_seconds gauge").ok();
    writeln!(
        out,
        "cgminer_exporter_scrape_duration_seconds{{instance=\"{}\"}} {}",
        escape_label_value(target),
        format_value(elapsed.as_secs_f64())
    )
    .ok();
    writeln!(out, "# TYPE cgminer_exporter_scrapes_total counter").ok();
    writeln!(out, "cgminer_exporter_scrapes_total {}", stats.scrapes_total).ok();
    writeln!(out, "# TYPE cgminer_exporter_scrape_failures_total counter").ok();
    writeln!(
        out,
        "cgminer_exporter_scrape_failures_total {}",
        stats.scrape_failures_total
    )
    .ok();
}
