//! HTTP front: usage hint, on-demand `/metrics` scrapes and health.

use std::net::SocketAddr;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::Deserialize;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::client::ClientError;
use crate::scraper::{ScrapeError, SharedScraper};

/// Body of the `/` endpoint.
pub const USAGE: &str = "Use /metrics with ?target=IP\n";

/// Content type of the Prometheus text exposition format.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    scraper: SharedScraper,
}

#[derive(Debug, Deserialize)]
struct MetricsQuery {
    target: Option<String>,
}

/// Create the HTTP router.
pub fn create_router(scraper: SharedScraper) -> Router {
    let state = AppState { scraper };

    Router::new()
        .route("/", get(usage_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Handler for the / endpoint.
async fn usage_handler() -> &'static str {
    USAGE
}

/// Handler for the /metrics endpoint. Every request is a live scrape.
async fn metrics_handler(
    State(state): State<AppState>,
    Query(query): Query<MetricsQuery>,
) -> Response {
    let Some(target) = query.target.filter(|t| !t.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            "missing required query parameter 'target'\n",
        )
            .into_response();
    };

    match state.scraper.scrape(&target).await {
        Ok(body) => (StatusCode::OK, [("content-type", CONTENT_TYPE)], body).into_response(),
        Err(e) => (error_status(&e), format!("{}\n", e)).into_response(),
    }
}

/// Handler for the /health endpoint.
async fn health_handler() -> Response {
    (StatusCode::OK, "healthy\n").into_response()
}

/// HTTP status reported for a failed scrape.
pub fn error_status(error: &ScrapeError) -> StatusCode {
    match error {
        ScrapeError::InvalidTarget(_) => StatusCode::BAD_REQUEST,
        ScrapeError::Poll(e) => match e.kind() {
            ClientError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ClientError::Connect(_) | ClientError::Decode(_) | ClientError::Io(_) => {
                StatusCode::BAD_GATEWAY
            }
        },
        ScrapeError::Translate { .. } => StatusCode::BAD_GATEWAY,
    }
}

/// HTTP server configuration.
pub struct HttpServer {
    scraper: SharedScraper,
    listen_addr: SocketAddr,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(scraper: SharedScraper, listen_addr: SocketAddr) -> Self {
        Self {
            scraper,
            listen_addr,
        }
    }

    /// Run the HTTP server until the shutdown signal is received.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let router = create_router(self.scraper);

        let listener = tokio::net::TcpListener::bind(self.listen_addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", self.listen_addr, e))?;

        info!(addr = %self.listen_addr, "HTTP server listening");

        // Run server with graceful shutdown
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                loop {
                    if shutdown.changed().await.is_err() {
                        break;
                    }
                    if *shutdown.borrow() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
            .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

        info!("HTTP server stopped");
        Ok(())
    }
}
