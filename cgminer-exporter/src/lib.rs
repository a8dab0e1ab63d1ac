//! Prometheus exporter for CGMiner and BMMiner mining rigs.
//!
//! Every request to `/metrics?target=<host>` polls the miner API on that host
//! (`stats`, `version`, `pools`, `summary`, `devs`) and translates the
//! responses into Prometheus text exposition format. Nothing is cached
//! between scrapes.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │   Miner API     │────>│     Scraper     │────>│   HTTP Server   │
//! │  (tcp/4028)     │     │ poll+translate  │     │   (/metrics)    │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```bash
//! cgminer-exporter --config config.json5
//! curl 'http://localhost:9154/metrics?target=10.0.0.5'
//! ```
//!
//! # Configuration
//!
//! See [`config::ExporterConfig`] for configuration options.
//!
//! # Known differences
//!
//! Idle HTTP connections are not closed after 2 seconds. Keep-alive and
//! header-read timeouts are whatever `axum::serve` applies; there is no
//! setting for them.

pub mod client;
pub mod config;
pub mod http;
pub mod mapping;
pub mod poller;
pub mod scraper;
pub mod translate;

pub use client::{ClientError, Command, MinerClient};
pub use config::ExporterConfig;
pub use http::{HttpServer, create_router};
pub use poller::{PollError, Poller, Snapshot};
pub use scraper::{ScrapeError, Scraper, SharedScraper};
pub use translate::TranslateError;
