//! Exporter configuration: command line flags with environment fallbacks.
//!
//! `main.rs` loads `.env.local` (if present) before parsing, so every
//! `GEOHASHING_*` variable can live there during development.

use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use gh_calendar::MarketCalendar;
use gh_djia::{DjiaCache, Fetcher, FetcherConfigError, DEFAULT_ENDPOINTS};
use gh_hash::GeohashEngine;

#[derive(Debug, Clone, Parser)]
#[command(name = "geohashing-exporter")]
#[command(about = "Prometheus exporter for xkcd geohashes", version)]
pub struct ExporterConfig {
    /// Listen address to be bound to
    #[arg(long, env = "GEOHASHING_LISTEN", default_value = "0.0.0.0:9426")]
    pub listen: SocketAddr,

    /// DJIA endpoint URL templates (strftime), raced against each other
    #[arg(
        long = "djia-url",
        env = "GEOHASHING_DJIA_URLS",
        value_delimiter = ',',
        default_values = DEFAULT_ENDPOINTS.iter().copied()
    )]
    pub djia_urls: Vec<String>,

    /// Deadline for one DJIA lookup across all endpoints
    #[arg(long, env = "GEOHASHING_FETCH_TIMEOUT_SECS", default_value_t = 10)]
    pub fetch_timeout_secs: u64,

    /// Deadline for answering one /metrics request
    #[arg(long, env = "GEOHASHING_REQUEST_TIMEOUT_SECS", default_value_t = 10)]
    pub request_timeout_secs: u64,

    /// Number of DJIA values kept in memory
    #[arg(long, env = "GEOHASHING_CACHE_CAPACITY", default_value = "16")]
    pub cache_capacity: NonZeroUsize,
}

impl ExporterConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// HTTP fetcher behind an LRU cache, wired into a fresh engine.
    pub fn build_engine(&self) -> Result<GeohashEngine, FetcherConfigError> {
        let fetcher = Fetcher::new(self.djia_urls.iter().cloned(), self.fetch_timeout())?;
        let cache = DjiaCache::with_capacity(Arc::new(fetcher), self.cache_capacity);
        Ok(GeohashEngine::new(
            Arc::new(MarketCalendar::new()),
            Arc::new(cache),
        ))
    }
}
